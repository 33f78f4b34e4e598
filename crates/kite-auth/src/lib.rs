//! Kite Connect session authentication
//!
//! Resolves the single access token a process needs to talk to the Kite
//! Connect API. This crate has no dependency on the CLI binary and can be
//! tested with injected fakes for every side effect.
//!
//! Credential flow:
//! 1. Caller builds a `Credential` from configuration
//! 2. `CredentialResolver::resolve()` validates the stored access token via
//!    `session::validate_token()`; a valid token is returned as-is
//! 3. Otherwise the operator opens `login::login_url()` and pastes back the
//!    request token through a `RequestTokenSource`
//! 4. `session::exchange_request_token()` trades it for a new access token,
//!    signed with `login::checksum()`
//! 5. The new token is written to the env file via `store::persist_access_token()`

pub mod constants;
pub mod credential;
pub mod error;
pub mod login;
pub mod prompt;
pub mod resolver;
pub mod session;
pub mod store;

pub use constants::*;
pub use credential::Credential;
pub use error::{Error, Result};
pub use login::{checksum, extract_request_token, login_url};
pub use prompt::{RequestTokenSource, StdinPrompt, read_request_token};
pub use resolver::{CredentialResolver, Resolved, TokenOrigin};
pub use session::{KiteSession, SessionApi, SessionResult, exchange_request_token, validate_token};
pub use store::{EnvFileStore, MemoryStore, PersistenceWarning, TokenStore, persist_access_token};
