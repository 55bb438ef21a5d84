use serde::{Deserialize, Serialize};

/// What went wrong, broadly. Drives the default severity of an [`AppError`](crate::core::error::AppError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Caller input has the wrong shape.
    ValidationError,
    PlatformError,
    ConfigurationError,
    KnowledgeError,
    /// The generative fallback could not help; translation continues without it.
    FallbackError,
    TimeoutError,
    SerializationError,
    IoError,
    InternalError,
    Unknown,
}

impl ErrorCategory {
    pub fn default_severity(self) -> ErrorSeverity {
        match self {
            ErrorCategory::FallbackError => ErrorSeverity::Warning,
            ErrorCategory::Unknown => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Debug,
    Info,
    Warning,
    Error,
}
