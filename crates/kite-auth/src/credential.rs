//! Consumer credentials for a Kite Connect app

use common::Secret;

use crate::constants::{ACCESS_TOKEN_PLACEHOLDER, API_KEY_PLACEHOLDER, API_SECRET_PLACEHOLDER};
use crate::error::{Error, Result};

/// The app's consumer key/secret plus whatever access token the last run
/// left behind.
///
/// `api_key` and `api_secret` never change for the life of the process.
/// `access_token` is untrusted until validated: it may be missing, stale or
/// valid.
#[derive(Debug, Clone)]
pub struct Credential {
    pub api_key: String,
    pub api_secret: Secret<String>,
    pub access_token: Option<Secret<String>>,
}

impl Credential {
    /// Build a credential from raw configuration values.
    ///
    /// Blank or placeholder key/secret values are rejected. The access token
    /// is stored as given; the resolver decides whether it is usable.
    pub fn new(
        api_key: Option<String>,
        api_secret: Option<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        let api_key = required(api_key, "API_KEY", API_KEY_PLACEHOLDER)?;
        let api_secret = required(api_secret, "API_SECRET", API_SECRET_PLACEHOLDER)?;

        Ok(Self {
            api_key,
            api_secret: Secret::new(api_secret),
            access_token: access_token.map(Secret::new),
        })
    }

    /// The stored access token, unless it is missing, blank or the template
    /// placeholder.
    pub fn usable_access_token(&self) -> Option<&str> {
        self.access_token
            .as_ref()
            .map(|t| t.expose().trim())
            .filter(|t| !t.is_empty() && *t != ACCESS_TOKEN_PLACEHOLDER)
    }
}

fn required(value: Option<String>, name: &str, placeholder: &str) -> Result<String> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() && v != placeholder => Ok(v),
        Some(v) if v == placeholder => Err(Error::Config(format!(
            "{name} is still set to the placeholder '{placeholder}'"
        ))),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}
