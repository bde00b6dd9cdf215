//! Tailor onboarding wizard.
//!
//! The session is the single source of truth for the active step, the step
//! records and the backend draft id. The manager owns it and persists every
//! change; navigation and autosave act through the manager.

pub mod autosave;
pub mod manager;
pub mod model;
pub mod navigation;
pub mod schema;
pub mod state;
pub mod step;
pub mod storage;

#[cfg(test)]
pub(crate) mod fixtures;

pub use autosave::{AutosaveOutcome, Autosaver};
pub use manager::{OnboardingManager, UploadFailure, UploadReport};
pub use model::{FormData, IdSide, UploadedAsset};
pub use navigation::{NavigationController, RouteTarget, resolve_route};
pub use state::OnboardingSession;
pub use step::StepKey;
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
