use serde::Serialize;

/// Fallback message shown when an error has no safe user-facing text.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while processing your request. Please try again.";

/// Stable error categories surfaced to the UI layer.
///
/// Consumers branch on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    Network,
    ProviderDeclined,
    NotFound,
    UnsupportedProvider,
    Unexpected,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Payment declined: {0}")]
    ProviderDeclined(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payment provider not supported: {0}")]
    UnsupportedProvider(String),

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for CheckoutError {
    fn from(err: validator::ValidationErrors) -> Self {
        CheckoutError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for CheckoutError {
    fn from(err: reqwest::Error) -> Self {
        // Body decode failures are a contract problem, not a connectivity one
        if err.is_decode() {
            CheckoutError::Unexpected(anyhow::anyhow!(err))
        } else {
            CheckoutError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Unexpected(err.into())
    }
}

impl CheckoutError {
    /// Returns the error category for this error.
    /// This is the single source of truth for error-to-kind mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Network(_) => ErrorKind::Network,
            Self::ProviderDeclined(_) => ErrorKind::ProviderDeclined,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::UnsupportedProvider(_) => ErrorKind::UnsupportedProvider,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Returns the message suitable for display.
    /// Unexpected errors return a generic message to avoid leaking internals.
    pub fn display_message(&self) -> String {
        match self {
            Self::Unexpected(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether an automatic retry may help. Only transient network
    /// failures qualify; declines and validation failures never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Converts into the display-ready pair handed to the UI.
    pub fn to_ui(&self) -> UiError {
        UiError {
            kind: self.kind(),
            message: self.display_message(),
        }
    }
}

/// Display-ready error handed across the UI boundary.
///
/// The raw `CheckoutError` never crosses that boundary; every failure
/// path ends in one of these or a navigation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl UiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
