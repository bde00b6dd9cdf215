//! Debounced per-step autosave.
//!
//! Every edit is merged into the session at once. A save for that step is
//! then scheduled after a quiet period; edits during the quiet period push
//! the save back. Each schedule takes the next sequence number for its step,
//! and a backend result only counts if its number is still the latest.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::manager::OnboardingManager;
use super::step::{StepKey, TOTAL_STEPS};
use crate::api::SavedStep;
use crate::error::FormDataError;

/// How a scheduled save ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AutosaveOutcome {
    /// Saved and recorded in the session.
    Saved(SavedStep),
    /// A later edit to the same step replaced this save before it started.
    Superseded,
    /// The step's data does not pass its schema; nothing was sent.
    Invalid,
    /// Saved, but a later save had been scheduled meanwhile, so the result
    /// was discarded.
    Stale,
    /// The backend call failed.
    Failed(String),
}

impl AutosaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

/// Schedules debounced saves on behalf of the step views.
#[derive(Clone)]
pub struct Autosaver {
    manager: Arc<OnboardingManager>,
    quiet_period: Duration,
    issued: Arc<[AtomicU64; TOTAL_STEPS as usize]>,
}

impl Autosaver {
    pub fn new(manager: Arc<OnboardingManager>, quiet_period: Duration) -> Self {
        Self {
            manager,
            quiet_period,
            issued: Arc::new(std::array::from_fn(|_| AtomicU64::new(0))),
        }
    }

    /// Merge an edit into the session and schedule a save of its step.
    pub async fn field_changed(
        &self,
        step: StepKey,
        partial: &Value,
    ) -> Result<JoinHandle<AutosaveOutcome>, FormDataError> {
        self.manager.update_form_data(step, partial).await?;
        Ok(self.schedule(step))
    }

    /// Schedule a save of `step` after the quiet period.
    pub fn schedule(&self, step: StepKey) -> JoinHandle<AutosaveOutcome> {
        let seq = self.slot(step).fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();
        tokio::spawn(async move { this.run(step, seq).await })
    }

    /// Latest sequence number issued for `step`.
    pub fn latest(&self, step: StepKey) -> u64 {
        self.slot(step).load(Ordering::SeqCst)
    }

    fn slot(&self, step: StepKey) -> &AtomicU64 {
        &self.issued[(step.number() - 1) as usize]
    }

    async fn run(&self, step: StepKey, seq: u64) -> AutosaveOutcome {
        tokio::time::sleep(self.quiet_period).await;

        if self.latest(step) != seq {
            debug!(step = %step, seq, "Autosave superseded");
            return AutosaveOutcome::Superseded;
        }
        if !self.manager.is_step_valid(step).await {
            debug!(step = %step, seq, "Autosave skipped, step data invalid");
            return AutosaveOutcome::Invalid;
        }

        let data = self.manager.step_value(step).await;
        match self.manager.push_step(step, &data).await {
            Ok(saved) if self.latest(step) == seq => {
                self.manager.record_saved(step, saved.updated_at).await;
                debug!(step = %step, seq, "Autosaved");
                AutosaveOutcome::Saved(saved)
            }
            Ok(_) => {
                debug!(step = %step, seq, latest = self.latest(step), "Discarding stale autosave");
                AutosaveOutcome::Stale
            }
            Err(e) => {
                warn!(step = %step, seq, "Autosave failed: {}", e);
                AutosaveOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockConfig, MockDraftApi};
    use crate::onboarding::fixtures::complete_form;
    use crate::onboarding::storage::MemoryStorage;
    use serde_json::json;

    fn autosaver(quiet_ms: u64) -> (Autosaver, Arc<OnboardingManager>, Arc<MockDraftApi>) {
        let api = Arc::new(MockDraftApi::new(MockConfig::instant()));
        let manager = Arc::new(OnboardingManager::new(
            Arc::new(MemoryStorage::new()),
            api.clone(),
            "autosave-test",
        ));
        let saver = Autosaver::new(manager.clone(), Duration::from_millis(quiet_ms));
        (saver, manager, api)
    }

    #[tokio::test]
    async fn edit_is_merged_before_the_save() {
        let (saver, manager, _) = autosaver(20);
        let handle = saver
            .field_changed(StepKey::Location, &json!({ "city": "Pune" }))
            .await
            .unwrap();
        assert_eq!(manager.snapshot().await.form_data().location.city, "Pune");
        // The rest of the location step is still empty.
        assert_eq!(handle.await.unwrap(), AutosaveOutcome::Invalid);
    }

    #[tokio::test]
    async fn burst_of_edits_saves_once() {
        let (saver, manager, api) = autosaver(30);
        manager.set_form_data(complete_form()).await;

        let first = saver
            .field_changed(StepKey::Location, &json!({ "city": "Pune" }))
            .await
            .unwrap();
        let second = saver
            .field_changed(StepKey::Location, &json!({ "city": "Mumbai" }))
            .await
            .unwrap();

        assert_eq!(first.await.unwrap(), AutosaveOutcome::Superseded);
        let outcome = second.await.unwrap();
        match outcome {
            AutosaveOutcome::Saved(saved) => assert_eq!(saved.step_data["city"], "Mumbai"),
            other => panic!("expected a save, got {other:?}"),
        }
        assert_eq!(api.saves(), 1);
        assert_eq!(api.drafts_created(), 1);
    }

    #[tokio::test]
    async fn steps_are_debounced_independently() {
        let (saver, manager, api) = autosaver(10);
        manager.set_form_data(complete_form()).await;

        let location = saver.schedule(StepKey::Location);
        let review = saver.schedule(StepKey::Review);
        assert!(location.await.unwrap().is_saved());
        assert!(review.await.unwrap().is_saved());
        assert_eq!(api.saves(), 2);
        assert_eq!(api.drafts_created(), 1);
        assert_eq!(saver.latest(StepKey::Location), 1);
        assert_eq!(saver.latest(StepKey::BasicInfo), 0);
    }

    #[tokio::test]
    async fn backend_failure_is_reported() {
        let (saver, manager, api) = autosaver(5);
        manager.set_form_data(complete_form()).await;
        api.set_offline(true);

        let outcome = saver.schedule(StepKey::Review).await.unwrap();
        assert!(matches!(outcome, AutosaveOutcome::Failed(_)));
        assert!(manager.last_saved(StepKey::Review).await.is_none());
        assert!(!manager.is_saving().await);
    }
}
