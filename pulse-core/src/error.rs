//! Error taxonomy shared by the core and the service layer.

use thiserror::Error;

pub type PulseResult<T> = Result<T, PulseError>;

#[derive(Debug, Error)]
pub enum PulseError {
    /// The document store needs a signed-in identity for this operation.
    #[error("not authenticated: sign in before accessing user data")]
    NotAuthenticated,

    /// The notification dispatcher rejected a call (permission, OS refusal).
    #[error("dispatcher error: {0}")]
    Dispatcher(String),

    /// A document the operation depends on does not exist.
    #[error("missing document: {path}")]
    MissingDocument { path: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid time of day '{0}' (expected HH:MM)")]
    InvalidTimeOfDay(String),

    #[error("invalid timezone: {0}")]
    InvalidTimeZone(String),

    #[error("invalid weekday {0} (expected 0-6, Sunday = 0)")]
    InvalidWeekday(u8),

    #[error("invalid reminder key '{0}': must not end in -0 through -6")]
    InvalidReminderKey(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl PulseError {
    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingDocument { path: path.into() }
    }

    /// Transient failures are logged and swallowed by scheduling callers.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Dispatcher(_) | Self::Store(_))
    }
}
