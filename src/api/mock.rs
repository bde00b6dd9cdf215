//! In-process mock of the onboarding backend.
//!
//! Simulates network latency with `tokio::time::sleep` and injects transient
//! failures at a configurable rate. Drafts live in memory so `get_draft`
//! returns whatever has been saved to them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    Draft, DraftApi, DraftStatus, FileUpload, SavedStep, Submission, UploadedFile, check_upload,
};
use crate::config::{MAX_LATENCY_SCALE, WizardConfig};
use crate::error::ApiError;
use crate::onboarding::step::StepKey;

/// Base URL uploads are reported under.
pub const MOCK_BUCKET_URL: &str = "https://mock-s3-bucket.amazonaws.com";

/// Message returned with a successful submission.
pub const SUBMITTED_MESSAGE: &str = "Your onboarding application has been submitted successfully! \
     We will review it and get back to you within 2-3 business days.";

const CREATE_LATENCY: Duration = Duration::from_millis(1000);
const SAVE_LATENCY: Duration = Duration::from_millis(800);
const SUBMIT_LATENCY: Duration = Duration::from_millis(2000);
const GET_LATENCY: Duration = Duration::from_millis(500);
const UPLOAD_LATENCY: Duration = Duration::from_millis(1500);

/// Tuning knobs for the mock backend.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Multiplier applied to every simulated latency. `0.0` disables delays.
    pub latency_scale: f64,
    /// Probability in [0, 1] that any call fails with a transient error.
    pub failure_rate: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency_scale: 1.0,
            failure_rate: 0.0,
        }
    }
}

impl MockConfig {
    /// No delays, no random failures.
    pub fn instant() -> Self {
        Self {
            latency_scale: 0.0,
            failure_rate: 0.0,
        }
    }
}

impl From<&WizardConfig> for MockConfig {
    fn from(config: &WizardConfig) -> Self {
        Self {
            latency_scale: config.api_latency_scale,
            failure_rate: config.api_failure_rate,
        }
    }
}

/// Mock draft backend.
pub struct MockDraftApi {
    config: MockConfig,
    drafts: RwLock<HashMap<String, Draft>>,
    offline: AtomicBool,
    drafts_created: AtomicUsize,
    saves: AtomicUsize,
}

impl MockDraftApi {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            drafts: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
            drafts_created: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    /// While offline every call fails, regardless of the failure rate.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of drafts created so far.
    pub fn drafts_created(&self) -> usize {
        self.drafts_created.load(Ordering::SeqCst)
    }

    /// Number of successful step saves so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    async fn simulate(&self, operation: &str, latency: Duration) -> Result<(), ApiError> {
        if let Some(delay) = scaled_latency(latency, self.config.latency_scale) {
            tokio::time::sleep(delay).await;
        }

        let injected = self.config.failure_rate > 0.0
            && rand::thread_rng().gen_bool(self.config.failure_rate.min(1.0));
        if self.offline.load(Ordering::SeqCst) || injected {
            warn!(operation, "Simulated backend failure");
            return Err(ApiError::Transient {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

/// `latency` times `scale`, capped at [`MAX_LATENCY_SCALE`] times the base.
/// `None` when there is nothing to wait for.
fn scaled_latency(latency: Duration, scale: f64) -> Option<Duration> {
    if scale.is_nan() || scale <= 0.0 {
        return None;
    }
    let scale = scale.min(MAX_LATENCY_SCALE);
    Duration::try_from_secs_f64(latency.as_secs_f64() * scale).ok()
}

/// Step keys absent (or null) in the submitted payload, in wizard order.
fn missing_steps(data: &Value) -> Vec<String> {
    StepKey::ALL
        .into_iter()
        .filter(|step| data.get(step.as_str()).is_none_or(Value::is_null))
        .map(|step| step.to_string())
        .collect()
}

#[async_trait]
impl DraftApi for MockDraftApi {
    async fn create_draft(&self, initial_data: &Value) -> Result<Draft, ApiError> {
        self.simulate("createDraft", CREATE_LATENCY).await?;

        let now = Utc::now();
        let draft = Draft {
            id: format!("draft_{}", Uuid::new_v4().simple()),
            status: DraftStatus::Draft,
            created_at: now,
            updated_at: now,
            data: initial_data.clone(),
        };
        self.drafts
            .write()
            .await
            .insert(draft.id.clone(), draft.clone());
        self.drafts_created.fetch_add(1, Ordering::SeqCst);

        info!(draft_id = %draft.id, "Draft created");
        Ok(draft)
    }

    async fn save_draft(
        &self,
        draft_id: &str,
        step: StepKey,
        step_data: &Value,
    ) -> Result<SavedStep, ApiError> {
        self.simulate("saveDraft", SAVE_LATENCY).await?;

        let now = Utc::now();
        {
            let mut drafts = self.drafts.write().await;
            if let Some(draft) = drafts.get_mut(draft_id) {
                if !draft.data.is_object() {
                    draft.data = Value::Object(Map::new());
                }
                if let Some(obj) = draft.data.as_object_mut() {
                    obj.insert(step.to_string(), step_data.clone());
                }
                draft.updated_at = now;
            } else {
                debug!(draft_id, "Saving to a draft this backend has not seen");
            }
        }
        self.saves.fetch_add(1, Ordering::SeqCst);

        debug!(draft_id, step = %step, "Draft step saved");
        Ok(SavedStep {
            id: draft_id.to_string(),
            status: DraftStatus::Draft,
            updated_at: now,
            step_key: step,
            step_data: step_data.clone(),
        })
    }

    async fn submit_onboarding(
        &self,
        draft_id: Option<&str>,
        complete_data: &Value,
    ) -> Result<Submission, ApiError> {
        self.simulate("submitOnboarding", SUBMIT_LATENCY).await?;

        if !complete_data.is_object() {
            return Err(ApiError::InvalidPayload(
                "application data must be a JSON object".to_string(),
            ));
        }

        let missing = missing_steps(complete_data);
        if !missing.is_empty() {
            return Err(ApiError::MissingFields { fields: missing });
        }

        let accepted = complete_data
            .get(StepKey::Review.as_str())
            .and_then(|r| r.get("acceptTerms"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !accepted {
            return Err(ApiError::TermsNotAccepted);
        }

        let now = Utc::now();
        if let Some(id) = draft_id {
            if let Some(draft) = self.drafts.write().await.get_mut(id) {
                draft.status = DraftStatus::Submitted;
                draft.data = complete_data.clone();
                draft.updated_at = now;
            }
        }

        let submission = Submission {
            id: format!("tailor_{}", Uuid::new_v4().simple()),
            status: DraftStatus::Submitted,
            submitted_at: now,
            draft_id: draft_id.map(str::to_string),
            message: SUBMITTED_MESSAGE.to_string(),
        };
        info!(submission_id = %submission.id, draft_id = ?draft_id, "Onboarding submitted");
        Ok(submission)
    }

    async fn get_draft(&self, draft_id: &str) -> Result<Draft, ApiError> {
        self.simulate("getDraft", GET_LATENCY).await?;

        if let Some(draft) = self.drafts.read().await.get(draft_id) {
            return Ok(draft.clone());
        }

        // Unknown ids still resolve, as an empty draft started a day ago.
        let now = Utc::now();
        Ok(Draft {
            id: draft_id.to_string(),
            status: DraftStatus::Draft,
            created_at: now - chrono::Duration::days(1),
            updated_at: now,
            data: Value::Object(Map::new()),
        })
    }

    async fn upload_file(&self, file: &FileUpload) -> Result<UploadedFile, ApiError> {
        self.simulate("uploadFile", UPLOAD_LATENCY).await?;
        check_upload(file)?;

        let now = Utc::now();
        let file_name = format!("uploads/{}_{}", now.timestamp_millis(), file.name);
        let uploaded = UploadedFile {
            url: format!("{MOCK_BUCKET_URL}/{file_name}"),
            file_name,
            size: file.size(),
            mime_type: file.mime_type.clone(),
            uploaded_at: now,
        };
        debug!(file = %uploaded.file_name, size = uploaded.size, "File uploaded");
        Ok(uploaded)
    }
}
