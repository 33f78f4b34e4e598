//! Login URL and request token checksum
//!
//! The broker signs a token exchange with `SHA-256(api_key + request_token +
//! api_secret)` rendered as lowercase hex. The three parts are concatenated
//! without separators and the order is fixed by the broker.

use sha2::{Digest, Sha256};

use crate::constants::LOGIN_HOST;

/// Build the interactive login URL for an app.
///
/// Pure: no network access, same key always yields the same URL.
pub fn login_url(api_key: &str) -> String {
    format!("{LOGIN_HOST}/connect/login?api_key={api_key}")
}

/// Compute the exchange checksum: hex `SHA-256(api_key + request_token + api_secret)`.
pub fn checksum(api_key: &str, request_token: &str, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(request_token.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Pull the request token out of operator input.
///
/// Accepts either the bare token or the full redirect URL the browser landed
/// on (`...?request_token=XYZ&action=login&status=success`). Returns `None`
/// when nothing usable is left after trimming.
pub fn extract_request_token(input: &str) -> Option<String> {
    let input = input.trim();
    let token = match input.find("request_token=") {
        Some(idx) => {
            let rest = &input[idx + "request_token=".len()..];
            rest.split(['&', '#']).next().unwrap_or_default()
        }
        None => input,
    };
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_owned())
}
