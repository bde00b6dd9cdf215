//! OnboardingManager — owns the wizard session and coordinates durable
//! storage, draft sync, uploads and submission.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::model::{FormData, IdSide, MAX_PORTFOLIO_IMAGES, UploadedAsset};
use super::schema;
use super::state::OnboardingSession;
use super::step::StepKey;
use super::storage::SessionStorage;
use crate::api::{Draft, DraftApi, FileUpload, SavedStep, Submission, check_upload};
use crate::error::{ApiError, Error, FormDataError, UploadError, ValidationError};

/// Outcome of a portfolio batch upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    /// Assets appended to the portfolio, in the order the files were given.
    pub uploaded: Vec<UploadedAsset>,
    /// Files rejected locally before any upload was attempted.
    pub rejected: Vec<UploadError>,
    /// Files the backend failed to store.
    pub failed: Vec<UploadFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub name: String,
    pub message: String,
}

/// Coordinates the onboarding session.
///
/// Every mutation goes through here so it can be persisted. Backend calls
/// never hold the session lock.
pub struct OnboardingManager {
    session: Arc<RwLock<OnboardingSession>>,
    storage: Arc<dyn SessionStorage>,
    api: Arc<dyn DraftApi>,
    storage_key: String,
    /// Orders writes to durable storage.
    persist_lock: Mutex<()>,
    /// Held while a draft is being created.
    draft_lock: Mutex<()>,
    saves_in_flight: AtomicUsize,
    last_submission: RwLock<Option<Submission>>,
}

impl OnboardingManager {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        api: Arc<dyn DraftApi>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            session: Arc::new(RwLock::new(OnboardingSession::new())),
            storage,
            api,
            storage_key: storage_key.into(),
            persist_lock: Mutex::new(()),
            draft_lock: Mutex::new(()),
            saves_in_flight: AtomicUsize::new(0),
            last_submission: RwLock::new(None),
        }
    }

    /// Load the persisted session, if any. Returns whether one was found.
    ///
    /// An unreadable record is logged and the fresh session kept.
    pub async fn restore(&self) -> bool {
        match self.storage.load(&self.storage_key).await {
            Ok(Some(restored)) => {
                info!(
                    step = restored.current_step(),
                    draft_id = ?restored.draft_id(),
                    "Restored onboarding session"
                );
                *self.session.write().await = restored;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(key = %self.storage_key, "Failed to load onboarding session: {}", e);
                false
            }
        }
    }

    /// A copy of the current session.
    pub async fn snapshot(&self) -> OnboardingSession {
        self.session.read().await.clone()
    }

    pub async fn current_step(&self) -> u8 {
        self.session.read().await.current_step()
    }

    pub async fn current_step_key(&self) -> StepKey {
        self.session.read().await.current_step_key()
    }

    pub async fn draft_id(&self) -> Option<String> {
        self.session.read().await.draft_id().map(str::to_string)
    }

    pub async fn progress(&self) -> f64 {
        self.session.read().await.progress()
    }

    pub async fn is_saving(&self) -> bool {
        self.session.read().await.is_saving()
    }

    pub async fn is_submitting(&self) -> bool {
        self.session.read().await.is_submitting()
    }

    /// Backend acknowledgement time of the last applied save for `step`.
    pub async fn last_saved(&self, step: StepKey) -> Option<DateTime<Utc>> {
        self.session.read().await.last_saved(step)
    }

    /// The receipt of the last successful submission.
    pub async fn last_submission(&self) -> Option<Submission> {
        self.last_submission.read().await.clone()
    }

    // ── Navigation ──────────────────────────────────────────────────────

    /// Set the active step, clamped to [1, 9].
    pub async fn set_current_step(&self, step: i64) -> u8 {
        let set = self.session.write().await.set_current_step(step);
        self.persist_state().await;
        set
    }

    pub async fn next_step(&self) -> u8 {
        let step = self.session.write().await.next_step();
        self.persist_state().await;
        step
    }

    pub async fn prev_step(&self) -> u8 {
        let step = self.session.write().await.prev_step();
        self.persist_state().await;
        step
    }

    // ── Form data ───────────────────────────────────────────────────────

    /// Shallow-merge `partial` into the record at `step`.
    pub async fn update_form_data(&self, step: StepKey, partial: &Value) -> Result<(), FormDataError> {
        self.session.write().await.update_form_data(step, partial)?;
        self.persist_state().await;
        Ok(())
    }

    /// Apply a typed edit to the form data and persist it.
    pub async fn edit_form_data<R>(&self, edit: impl FnOnce(&mut FormData) -> R) -> R {
        let result = self.session.write().await.edit_form_data(edit);
        self.persist_state().await;
        result
    }

    pub async fn set_form_data(&self, data: FormData) {
        self.session.write().await.set_form_data(data);
        self.persist_state().await;
    }

    /// The record for `step` as it is sent to the backend.
    pub async fn step_value(&self, step: StepKey) -> Value {
        self.session.read().await.form_data().step_value(step)
    }

    pub async fn validate_step(&self, step: StepKey) -> Result<(), ValidationError> {
        schema::validate_step(step, self.session.read().await.form_data())
    }

    pub async fn is_step_valid(&self, step: StepKey) -> bool {
        self.session.read().await.is_step_valid(step)
    }

    // ── Draft sync ──────────────────────────────────────────────────────

    /// The draft id, creating the draft first if there is none yet.
    ///
    /// Creation is serialized, so concurrent callers share one draft.
    pub async fn ensure_draft(&self) -> Result<String, ApiError> {
        if let Some(id) = self.draft_id().await {
            return Ok(id);
        }

        let _creating = self.draft_lock.lock().await;
        // Another caller may have finished while we waited.
        if let Some(id) = self.draft_id().await {
            return Ok(id);
        }

        let seed = serde_json::to_value(self.session.read().await.form_data())
            .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
        let draft = self.api.create_draft(&seed).await?;

        self.session.write().await.set_draft_id(draft.id.clone());
        self.persist_state().await;
        info!(draft_id = %draft.id, "Onboarding draft created");
        Ok(draft.id)
    }

    /// Send one step's data to the draft. Holds the saving flag for the
    /// duration of the call but does not record the result.
    pub async fn push_step(&self, step: StepKey, step_data: &Value) -> Result<SavedStep, ApiError> {
        self.begin_save().await;
        let result = async {
            let draft_id = self.ensure_draft().await?;
            self.api.save_draft(&draft_id, step, step_data).await
        }
        .await;
        self.end_save().await;

        if let Err(ref e) = result {
            warn!(step = %step, "Draft save failed: {}", e);
        }
        result
    }

    /// Validate the current record for `step` and save it to the draft.
    pub async fn save_step(&self, step: StepKey) -> Result<SavedStep, Error> {
        self.validate_step(step).await?;
        let data = self.step_value(step).await;
        let saved = self.push_step(step, &data).await?;
        self.record_saved(step, saved.updated_at).await;
        Ok(saved)
    }

    /// Note a backend acknowledgement for `step`.
    pub async fn record_saved(&self, step: StepKey, at: DateTime<Utc>) {
        self.session.write().await.record_saved(step, at);
        debug!(step = %step, "Step save recorded");
    }

    // The counter and the flag only change together, under the session lock.
    async fn begin_save(&self) {
        let mut session = self.session.write().await;
        self.saves_in_flight.fetch_add(1, Ordering::SeqCst);
        session.set_saving(true);
    }

    async fn end_save(&self) {
        let mut session = self.session.write().await;
        let remaining = self.saves_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        session.set_saving(remaining > 0);
    }

    /// Fetch the backend copy of the current draft, if one exists.
    pub async fn fetch_draft(&self) -> Result<Option<Draft>, ApiError> {
        match self.draft_id().await {
            Some(id) => self.api.get_draft(&id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Merge the backend copy of the draft into the local form data.
    ///
    /// Returns the steps that were merged. Steps the local records cannot
    /// represent are skipped with a warning.
    pub async fn pull_draft(&self) -> Result<Vec<StepKey>, ApiError> {
        let Some(draft) = self.fetch_draft().await? else {
            return Ok(Vec::new());
        };

        let mut merged = Vec::new();
        {
            let mut session = self.session.write().await;
            for step in StepKey::ALL {
                let Some(remote) = draft.data.get(step.as_str()) else {
                    continue;
                };
                match session.update_form_data(step, remote) {
                    Ok(()) => merged.push(step),
                    Err(e) => warn!(step = %step, "Skipping remote draft data: {}", e),
                }
            }
        }
        self.persist_state().await;
        info!(draft_id = %draft.id, steps = merged.len(), "Pulled draft from backend");
        Ok(merged)
    }

    // ── Uploads ─────────────────────────────────────────────────────────

    /// Upload a batch of portfolio images.
    ///
    /// Files failing the local type/size check are reported and skipped. The
    /// batch is refused when the remaining files would take the portfolio past
    /// its limit. Each file uploads independently.
    pub async fn upload_portfolio_images(&self, files: Vec<FileUpload>) -> Result<UploadReport, Error> {
        let mut report = UploadReport::default();
        let mut valid = Vec::new();
        for file in files {
            match check_upload(&file) {
                Ok(()) => valid.push(file),
                Err(e) => report.rejected.push(e),
            }
        }

        let current = self.session.read().await.form_data().portfolio.portfolio_images.len();
        if current + valid.len() > MAX_PORTFOLIO_IMAGES {
            return Err(UploadError::TooMany {
                current,
                max: MAX_PORTFOLIO_IMAGES,
            }
            .into());
        }

        let results = join_all(valid.iter().map(|file| self.api.upload_file(file))).await;
        for (file, result) in valid.iter().zip(results) {
            match result {
                Ok(uploaded) => report.uploaded.push(UploadedAsset {
                    url: uploaded.url,
                    name: uploaded.file_name,
                }),
                Err(e) => {
                    warn!(file = %file.name, "Portfolio upload failed: {}", e);
                    report.failed.push(UploadFailure {
                        name: file.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if !report.uploaded.is_empty() {
            let added = report.uploaded.clone();
            self.edit_form_data(|data| data.portfolio.portfolio_images.extend(added))
                .await;
        }
        info!(
            uploaded = report.uploaded.len(),
            rejected = report.rejected.len(),
            failed = report.failed.len(),
            "Portfolio upload finished"
        );
        Ok(report)
    }

    /// Remove a portfolio image by value.
    pub async fn remove_portfolio_image(&self, asset: &UploadedAsset) -> bool {
        self.edit_form_data(|data| data.portfolio.remove_image(asset))
            .await
    }

    /// Upload one side of the identity document, replacing any earlier image.
    pub async fn upload_id_image(&self, side: IdSide, file: FileUpload) -> Result<UploadedAsset, Error> {
        check_upload(&file)?;
        let uploaded = self.api.upload_file(&file).await?;
        let asset = UploadedAsset {
            url: uploaded.url,
            name: uploaded.file_name,
        };

        let stored = asset.clone();
        self.edit_form_data(move |data| match side {
            IdSide::Front => data.identity.id_front = Some(stored),
            IdSide::Back => data.identity.id_back = Some(stored),
        })
        .await;
        debug!(side = ?side, file = %asset.name, "Identity image stored");
        Ok(asset)
    }

    // ── Submission ──────────────────────────────────────────────────────

    /// Validate every step and submit the application.
    ///
    /// The submitting flag is cleared whatever the outcome.
    pub async fn submit(&self) -> Result<Submission, Error> {
        let (payload, draft_id) = {
            let session = self.session.read().await;
            schema::validate_all(session.form_data())?;
            let payload = serde_json::to_value(session.form_data())
                .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
            (payload, session.draft_id().map(str::to_string))
        };

        self.session.write().await.set_submitting(true);
        let result = self
            .api
            .submit_onboarding(draft_id.as_deref(), &payload)
            .await;
        self.session.write().await.set_submitting(false);

        match result {
            Ok(submission) => {
                info!(
                    submission_id = %submission.id,
                    draft_id = ?draft_id,
                    "Onboarding application submitted"
                );
                *self.last_submission.write().await = Some(submission.clone());
                Ok(submission)
            }
            Err(e) => {
                warn!(draft_id = ?draft_id, "Submission failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Discard all progress, including the draft id.
    pub async fn start_over(&self) {
        self.session.write().await.reset();
        *self.last_submission.write().await = None;
        self.persist_state().await;
        info!("Onboarding session reset");
    }

    /// Persist the session to durable storage. Failures are logged.
    async fn persist_state(&self) {
        let _ordered = self.persist_lock.lock().await;
        let session = self.session.read().await.clone();
        if let Err(e) = self.storage.save(&self.storage_key, &session).await {
            warn!(key = %self.storage_key, "Failed to persist onboarding session: {}", e);
        }
    }
}
