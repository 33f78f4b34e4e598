//! Error types for credential resolution

/// Fatal errors from credential resolution.
///
/// Persistence failures are not represented here: they surface as
/// `PersistenceWarning`s on an otherwise successful resolution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
