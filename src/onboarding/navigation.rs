//! Step navigation and route resolution.
//!
//! The session's current step is the only authority. Routes are derived from
//! it, and an externally supplied route is reconciled into it one way.

use std::sync::Arc;

use tracing::debug;

use super::manager::OnboardingManager;
use super::step::{StepKey, TOTAL_STEPS};

/// Standalone terms page. Visiting it does not move the wizard.
pub const TERMS_ROUTE: &str = "/terms-and-conditions";

/// Application root, which redirects into the wizard.
pub const ROOT_ROUTE: &str = "/";

/// What a route path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// A wizard step.
    Step(StepKey),
    /// The terms and conditions page.
    Terms,
    /// Anything else; the caller is sent to this step instead.
    Redirect(StepKey),
}

/// Resolve a route path without touching any state.
pub fn resolve_route(path: &str) -> RouteTarget {
    if path == TERMS_ROUTE {
        return RouteTarget::Terms;
    }
    match StepKey::from_route(path) {
        Some(step) => RouteTarget::Step(step),
        None => RouteTarget::Redirect(StepKey::BasicInfo),
    }
}

/// Forward/back transitions plus route sync over the manager's session.
pub struct NavigationController {
    manager: Arc<OnboardingManager>,
}

impl NavigationController {
    pub fn new(manager: Arc<OnboardingManager>) -> Self {
        Self { manager }
    }

    /// Route of the active step.
    pub async fn current_route(&self) -> &'static str {
        self.manager.current_step_key().await.route()
    }

    /// Advance one step. Returns the route now displayed.
    pub async fn next(&self) -> &'static str {
        let step = self.manager.next_step().await;
        route_of(step)
    }

    /// Go back one step. Returns the route now displayed.
    pub async fn prev(&self) -> &'static str {
        let step = self.manager.prev_step().await;
        route_of(step)
    }

    /// Whether a next step exists.
    pub async fn can_go_next(&self) -> bool {
        self.manager.current_step().await < TOTAL_STEPS
    }

    /// Whether a previous step exists.
    pub async fn can_go_back(&self) -> bool {
        self.manager.current_step().await > 1
    }

    /// Follow an external route. Step routes move the session to that step,
    /// the terms page leaves it alone, and anything else lands on step 1.
    /// Returns the route actually displayed.
    pub async fn navigate_to(&self, path: &str) -> &'static str {
        match resolve_route(path) {
            RouteTarget::Terms => TERMS_ROUTE,
            RouteTarget::Step(step) | RouteTarget::Redirect(step) => {
                if self.manager.current_step().await != step.number() {
                    debug!(path, step = %step, "Syncing step from route");
                    self.manager.set_current_step(step.number() as i64).await;
                }
                step.route()
            }
        }
    }

    /// Header line for the active step, e.g. `Step 2 of 9 · Location`.
    pub async fn header(&self) -> String {
        let step = self.manager.current_step_key().await;
        format!("Step {} of {} · {}", step.number(), TOTAL_STEPS, step.label())
    }
}

fn route_of(step: u8) -> &'static str {
    StepKey::from_number(step)
        .unwrap_or(StepKey::BasicInfo)
        .route()
}
