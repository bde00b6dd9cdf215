//! The onboarding session, single source of truth for the wizard.
//!
//! Holds the active step, the nine step records, the backend draft id and the
//! transient busy flags. Only `currentStep`, `formData` and `draftId` are
//! serialized; the busy flags never reach durable storage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::FormData;
use super::schema;
use super::step::{MAX_STEP, MIN_STEP, StepKey, TOTAL_STEPS};
use crate::error::FormDataError;

/// Persisted wizard state plus transient busy flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingSession {
    /// Active step, always within [1, 9].
    #[serde(deserialize_with = "deserialize_step")]
    current_step: u8,
    /// Step records, keyed by step.
    #[serde(default)]
    form_data: FormData,
    /// Backend draft id, assigned on the first successful draft creation.
    #[serde(default)]
    draft_id: Option<String>,
    #[serde(skip)]
    is_saving: bool,
    #[serde(skip)]
    is_submitting: bool,
    /// When each step was last acknowledged by the backend.
    #[serde(skip)]
    last_saved: BTreeMap<StepKey, DateTime<Utc>>,
}

impl Default for OnboardingSession {
    fn default() -> Self {
        Self {
            current_step: MIN_STEP,
            form_data: FormData::default(),
            draft_id: None,
            is_saving: false,
            is_submitting: false,
            last_saved: BTreeMap::new(),
        }
    }
}

/// Accept any integer on load and clamp it, so a hand-edited or stale record
/// cannot put the session out of bounds.
fn deserialize_step<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(MIN_STEP as i64, MAX_STEP as i64) as u8)
}

impl OnboardingSession {
    /// Fresh session on step 1 with default form data.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    /// The active step as a key.
    pub fn current_step_key(&self) -> StepKey {
        // current_step is kept in bounds by every writer.
        StepKey::from_number(self.current_step).unwrap_or(StepKey::BasicInfo)
    }

    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    pub fn draft_id(&self) -> Option<&str> {
        self.draft_id.as_deref()
    }

    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// Set the active step, clamped to [1, 9]. Returns the step actually set.
    pub fn set_current_step(&mut self, step: i64) -> u8 {
        self.current_step = step.clamp(MIN_STEP as i64, MAX_STEP as i64) as u8;
        self.current_step
    }

    /// Advance one step; no-op on the last step.
    pub fn next_step(&mut self) -> u8 {
        self.set_current_step(self.current_step as i64 + 1)
    }

    /// Go back one step; no-op on the first step.
    pub fn prev_step(&mut self) -> u8 {
        self.set_current_step(self.current_step as i64 - 1)
    }

    /// Shallow-merge `partial` into the record at `step`.
    pub fn update_form_data(&mut self, step: StepKey, partial: &Value) -> Result<(), FormDataError> {
        self.form_data.merge_step(step, partial)
    }

    /// Apply a typed edit to the form data.
    pub fn edit_form_data<R>(&mut self, edit: impl FnOnce(&mut FormData) -> R) -> R {
        edit(&mut self.form_data)
    }

    /// Replace all step records at once.
    pub fn set_form_data(&mut self, data: FormData) {
        self.form_data = data;
    }

    pub fn set_draft_id(&mut self, id: impl Into<String>) {
        self.draft_id = Some(id.into());
    }

    pub fn set_saving(&mut self, saving: bool) {
        self.is_saving = saving;
    }

    pub fn set_submitting(&mut self, submitting: bool) {
        self.is_submitting = submitting;
    }

    /// Note a backend acknowledgement for `step`.
    pub fn record_saved(&mut self, step: StepKey, at: DateTime<Utc>) {
        self.last_saved.insert(step, at);
    }

    pub fn last_saved(&self, step: StepKey) -> Option<DateTime<Utc>> {
        self.last_saved.get(&step).copied()
    }

    /// Restore every field to its initial default, including the draft id.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Completion percentage: `current_step / 9 * 100`.
    pub fn progress(&self) -> f64 {
        self.current_step as f64 / TOTAL_STEPS as f64 * 100.0
    }

    /// Whether the given step's record passes its schema.
    pub fn is_step_valid(&self, step: StepKey) -> bool {
        schema::is_step_valid(step, &self.form_data)
    }
}
