//! Configuration loading
//!
//! Precedence: process environment > env file > defaults. The env file is
//! parsed without touching the process environment, so it can be rewritten
//! later by the token store without surprises.
//!
//! API key and secret are optional here; `kite_auth::Credential::new`
//! rejects missing ones when credentials are resolved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use kite_auth::{
    ACCESS_TOKEN_VAR, API_KEY_VAR, API_SECRET_VAR, BASE_URL_VAR, DEFAULT_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT_MS, REQUEST_TIMEOUT_VAR, TokenOrigin,
};

/// Default env file, relative to the working directory
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Env var naming an alternative env file
pub const ENV_FILE_VAR: &str = "KITE_ENV_FILE";

#[derive(Debug)]
pub struct Config {
    /// Env file the values were read from; also where a new token is saved
    pub env_file: PathBuf,
    pub api_key: Option<String>,
    pub api_secret: Option<Secret<String>>,
    pub access_token: Option<Secret<String>>,
    /// ACCESS_TOKEN came from the process environment, not the env file
    pub access_token_from_env: bool,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from `env_file` (if it exists) and the process
    /// environment.
    pub fn load(env_file: &Path) -> common::Result<Self> {
        let file_values = read_env_file(env_file)?;
        let lookup = |key: &str| {
            std::env::var(key)
                .ok()
                .or_else(|| file_values.get(key).cloned())
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let base_url = lookup(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "{BASE_URL_VAR} must start with http:// or https://, got: {base_url}"
            )));
        }

        let timeout_ms = match lookup(REQUEST_TIMEOUT_VAR) {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                common::Error::Config(format!(
                    "{REQUEST_TIMEOUT_VAR} must be a number of milliseconds, got {raw:?}: {e}"
                ))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };
        if timeout_ms == 0 {
            return Err(common::Error::Config(format!(
                "{REQUEST_TIMEOUT_VAR} must be greater than 0"
            )));
        }

        Ok(Self {
            env_file: env_file.to_path_buf(),
            api_key: lookup(API_KEY_VAR),
            api_secret: lookup(API_SECRET_VAR).map(Secret::new),
            access_token: lookup(ACCESS_TOKEN_VAR).map(Secret::new),
            access_token_from_env: std::env::var(ACCESS_TOKEN_VAR)
                .is_ok_and(|v| !v.trim().is_empty()),
            base_url,
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// A freshly saved token is hidden on later runs when the process
    /// environment still exports ACCESS_TOKEN.
    pub fn saved_token_is_shadowed(&self, origin: TokenOrigin) -> bool {
        self.access_token_from_env && origin == TokenOrigin::Exchanged
    }

    /// Resolve the env file path from the CLI flag or KITE_ENV_FILE.
    pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
        if let Some(p) = cli_path {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var(ENV_FILE_VAR) {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_ENV_FILE)
    }
}

/// A missing file is treated as empty.
fn read_env_file(path: &Path) -> common::Result<HashMap<String, String>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };

    let mut values = HashMap::new();
    for item in dotenvy::from_read_iter(contents.as_bytes()) {
        let (key, value) = item.map_err(|e| {
            common::Error::Config(format!("failed to parse env file {}: {e}", path.display()))
        })?;
        values.insert(key, value);
    }
    Ok(values)
}
