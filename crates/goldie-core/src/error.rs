//! ============================================================================
//! Error Types - Failure taxonomy for the storefront core
//! ============================================================================
//! Every layer logs where it catches and re-raises unchanged. Nothing here is
//! retried automatically.
//! ============================================================================

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GoldieError>;

/// Errors surfaced by goldie-core
#[derive(Debug, Error)]
pub enum GoldieError {
    /// Non-2xx from the catalog API
    #[error("Discogs API error: {status} {description}")]
    Upstream { status: u16, description: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Order is missing data required to render a message
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Assistant error: {0}")]
    Assistant(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Identity provider failures, keyed by the provider's error code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Identity provider unreachable: {0}")]
    Network(String),

    #[error("Identity provider error: {0}")]
    Other(String),
}

impl AuthError {
    /// Map an Identity Toolkit error message (e.g. `EMAIL_EXISTS`,
    /// `TOO_MANY_ATTEMPTS_TRY_LATER : ...`) to a variant.
    pub fn from_provider_message(message: &str) -> Self {
        let code = message
            .split(|c: char| c == ':' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        match code {
            "EMAIL_EXISTS" => Self::EmailExists,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" => {
                Self::InvalidCredentials
            }
            "EMAIL_NOT_FOUND" | "USER_DISABLED" => Self::UserNotFound,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyAttempts,
            "WEAK_PASSWORD" => Self::WeakPassword(message.to_string()),
            _ => Self::Other(message.to_string()),
        }
    }
}

/// Wrap an embedded-store failure
pub(crate) fn store_err(e: impl std::fmt::Display) -> GoldieError {
    GoldieError::Store(e.to_string())
}
