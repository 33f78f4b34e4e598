//! Session endpoints: access token validation and request token exchange
//!
//! Both calls read the broker's `{status, data, message}` envelope rather
//! than the HTTP status, since error envelopes arrive with 4xx codes and the
//! `message` is what the operator needs to see.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::constants::{
    KITE_VERSION, KITE_VERSION_HEADER, VALIDATION_TIMEOUT_SECS, SESSION_TOKEN_PATH, STATUS_SUCCESS,
    USER_PROFILE_PATH, authorization_value,
};
use crate::error::{Error, Result};

/// Payload of a successful token exchange.
///
/// Only `access_token` is used past the resolver; the rest is informational.
#[derive(Clone, Deserialize)]
pub struct SessionResult {
    pub access_token: String,
    #[serde(default)]
    pub public_token: String,
    #[serde(default)]
    pub login_time: String,
}

impl fmt::Debug for SessionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionResult")
            .field("access_token", &"[REDACTED]")
            .field("public_token", &"[REDACTED]")
            .field("login_time", &self.login_time)
            .finish()
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
    message: Option<String>,
}

/// Network side of credential resolution.
///
/// Uses `Pin<Box<dyn Future>>` return types so the resolver can hold
/// `&dyn SessionApi` and tests can substitute a counting fake.
pub trait SessionApi: Send + Sync {
    /// True only if the broker currently accepts `access_token`. Never fails.
    fn check_token<'a>(
        &'a self,
        api_key: &'a str,
        access_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

    /// Trade a request token (with its checksum) for a new session.
    fn exchange<'a>(
        &'a self,
        api_key: &'a str,
        request_token: &'a str,
        checksum: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SessionResult>> + Send + 'a>>;
}

/// `SessionApi` backed by the real HTTP endpoints.
#[derive(Clone)]
pub struct KiteSession {
    client: reqwest::Client,
    base_url: String,
}

impl KiteSession {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

impl SessionApi for KiteSession {
    fn check_token<'a>(
        &'a self,
        api_key: &'a str,
        access_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(validate_token(
            &self.client,
            &self.base_url,
            api_key,
            access_token,
        ))
    }

    fn exchange<'a>(
        &'a self,
        api_key: &'a str,
        request_token: &'a str,
        checksum: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SessionResult>> + Send + 'a>> {
        Box::pin(exchange_request_token(
            &self.client,
            &self.base_url,
            api_key,
            request_token,
            checksum,
        ))
    }
}

/// Check whether an access token is accepted by fetching the user profile.
///
/// Any failure (network, timeout, non-success envelope, unparseable body)
/// yields `false`. A flaky network is therefore indistinguishable from an
/// expired token, which sends the caller down the login path.
pub async fn validate_token(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    access_token: &str,
) -> bool {
    let response = client
        .get(format!("{base_url}{USER_PROFILE_PATH}"))
        .header(KITE_VERSION_HEADER, KITE_VERSION)
        .header(
            reqwest::header::AUTHORIZATION,
            authorization_value(api_key, access_token),
        )
        .timeout(Duration::from_secs(VALIDATION_TIMEOUT_SECS))
        .send()
        .await;

    let response = match response {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "token validation request failed");
            return false;
        }
    };

    let http_status = response.status();
    match response.json::<Envelope<serde_json::Value>>().await {
        Ok(envelope) => {
            let valid = envelope.status == STATUS_SUCCESS;
            debug!(%http_status, status = %envelope.status, valid, "token validation completed");
            valid
        }
        Err(e) => {
            debug!(%http_status, error = %e, "token validation returned malformed body");
            false
        }
    }
}

/// Exchange a request token for an access token.
///
/// `checksum` must be `login::checksum(api_key, request_token, api_secret)`.
/// The form fields are sent in the order `api_key`, `request_token`,
/// `checksum`.
pub async fn exchange_request_token(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    request_token: &str,
    checksum: &str,
) -> Result<SessionResult> {
    let response = client
        .post(format!("{base_url}{SESSION_TOKEN_PATH}"))
        .header(KITE_VERSION_HEADER, KITE_VERSION)
        .form(&[
            ("api_key", api_key),
            ("request_token", request_token),
            ("checksum", checksum),
        ])
        .send()
        .await
        .map_err(|e| Error::Exchange(format!("token exchange request failed: {e}")))?;

    let http_status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Exchange(format!("reading token response failed: {e}")))?;

    let envelope: Envelope<SessionResult> = serde_json::from_str(&body).map_err(|e| {
        Error::Exchange(format!(
            "invalid token response (HTTP {http_status}): {e}"
        ))
    })?;

    if envelope.status != STATUS_SUCCESS {
        return Err(Error::Exchange(envelope.message.unwrap_or_else(|| {
            format!("token endpoint returned status '{}' (HTTP {http_status})", envelope.status)
        })));
    }

    envelope
        .data
        .ok_or_else(|| Error::Exchange("success response carried no session data".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_result_deserializes_and_ignores_extra_fields() {
        let json = r#"{
            "user_id": "AB1234",
            "user_name": "Test User",
            "access_token": "at_abc",
            "public_token": "pt_def",
            "login_time": "2024-03-01 09:15:02"
        }"#;
        let session: SessionResult = serde_json::from_str(json).unwrap();
        assert_eq!(session.access_token, "at_abc");
        assert_eq!(session.public_token, "pt_def");
        assert_eq!(session.login_time, "2024-03-01 09:15:02");
    }

    #[test]
    fn session_result_debug_is_redacted() {
        let session = SessionResult {
            access_token: "at_secret".into(),
            public_token: "pt_secret".into(),
            login_time: "2024-03-01 09:15:02".into(),
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("at_secret"));
        assert!(!debug.contains("pt_secret"));
        assert!(debug.contains("2024-03-01"));
    }

    #[test]
    fn error_envelope_parses_without_data() {
        let json = r#"{"status":"error","message":"Token is invalid or has expired.","error_type":"TokenException"}"#;
        let envelope: Envelope<SessionResult> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status, "error");
        assert!(envelope.data.is_none());
        assert_eq!(
            envelope.message.as_deref(),
            Some("Token is invalid or has expired.")
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let session = KiteSession::new(reqwest::Client::new(), "https://api.kite.trade/");
        assert_eq!(session.base_url, "https://api.kite.trade");
    }
}
