//! Error types for the onboarding wizard.

/// Top-level error type for the wizard.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Form data error: {0}")]
    FormData(#[from] FormDataError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Durable session storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Draft sync client errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{operation} failed: API Error")]
    Transient { operation: String },

    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("Terms and conditions must be accepted")]
    TermsNotAccepted,

    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// File upload rejections, raised locally or by the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type: {name}. Only JPEG, PNG, and WebP are allowed.")]
    InvalidType { name: String, mime_type: String },

    #[error("File too large: {name}. Maximum size is 5MB.")]
    TooLarge { name: String, size: u64 },

    #[error(
        "Too many images. Maximum {max} images allowed. You currently have {current} images."
    )]
    TooMany { current: usize, max: usize },
}

/// A single field that failed its rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Schema validation failure for one step (or the whole application).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{step}: {}", summarize(.errors))]
pub struct ValidationError {
    pub step: String,
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.field))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Look up the first message reported for `field`.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

/// Rejected updates to the typed step records.
#[derive(Debug, thiserror::Error)]
pub enum FormDataError {
    #[error("Partial update for {step} must be a JSON object")]
    NotAnObject { step: String },

    #[error("Partial update for {step} does not fit the record: {source}")]
    Shape {
        step: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown step key: {0}")]
    UnknownStep(String),

    #[error("{step} has no field named {field}")]
    UnknownField { step: String, field: String },
}

/// Result type alias for the wizard.
pub type Result<T> = std::result::Result<T, Error>;
