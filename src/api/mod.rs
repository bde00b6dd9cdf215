//! Draft sync client: backend operations for the draft lifecycle.
//!
//! [`DraftApi`] is the seam between the wizard and whatever stores drafts.
//! The only implementation shipped is [`MockDraftApi`], an in-process stand-in
//! with simulated latency and failures.

pub mod mock;

pub use mock::{MockConfig, MockDraftApi};

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, UploadError};
use crate::onboarding::step::StepKey;

/// Largest accepted upload, in bytes (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// MIME types accepted by the upload service.
pub const ALLOWED_UPLOAD_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Lifecycle status of a backend draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Submitted,
}

/// A draft snapshot, as returned by create and get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: Value,
}

/// Acknowledgement of a single step save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedStep {
    pub id: String,
    pub status: DraftStatus,
    pub updated_at: DateTime<Utc>,
    pub step_key: StepKey,
    pub step_data: Value,
}

/// Receipt for a submitted application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub status: DraftStatus,
    pub submitted_at: DateTime<Utc>,
    pub draft_id: Option<String>,
    pub message: String,
}

/// A file picked by the user, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self {
            mime_type: mime_from_extension(path).to_string(),
            name,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Metadata of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_name: String,
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Check type and size limits for an upload.
pub fn check_upload(file: &FileUpload) -> Result<(), UploadError> {
    if !ALLOWED_UPLOAD_TYPES.contains(&file.mime_type.as_str()) {
        return Err(UploadError::InvalidType {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
        });
    }
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            name: file.name.clone(),
            size: file.size(),
        });
    }
    Ok(())
}

/// Backend operations for drafts, submission and uploads.
///
/// Every call may fail. Callers surface failures; nothing here retries.
#[async_trait]
pub trait DraftApi: Send + Sync {
    /// Create a new draft seeded with `initial_data`.
    async fn create_draft(&self, initial_data: &Value) -> Result<Draft, ApiError>;

    /// Store one step's data in a draft, overwriting any earlier save.
    async fn save_draft(
        &self,
        draft_id: &str,
        step: StepKey,
        step_data: &Value,
    ) -> Result<SavedStep, ApiError>;

    /// Submit the complete application. `complete_data` must contain all
    /// nine step keys and an accepted `review.acceptTerms`.
    async fn submit_onboarding(
        &self,
        draft_id: Option<&str>,
        complete_data: &Value,
    ) -> Result<Submission, ApiError>;

    /// Fetch a draft snapshot for resuming.
    async fn get_draft(&self, draft_id: &str) -> Result<Draft, ApiError>;

    /// Upload an image.
    async fn upload_file(&self, file: &FileUpload) -> Result<UploadedFile, ApiError>;
}
