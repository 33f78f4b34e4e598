//! Kite Connect constants
//!
//! Endpoint paths, header values and the placeholder sentinels that the
//! generated env file template uses. None of these are secrets.

/// Default REST API root
pub const DEFAULT_BASE_URL: &str = "https://api.kite.trade";

/// Host serving the interactive login page
pub const LOGIN_HOST: &str = "https://kite.zerodha.com";

/// Token exchange endpoint, relative to the API root
pub const SESSION_TOKEN_PATH: &str = "/session/token";

/// Profile endpoint, used as the cheapest authenticated read for probing
pub const USER_PROFILE_PATH: &str = "/user/profile";

/// API version header required on every call
pub const KITE_VERSION_HEADER: &str = "X-Kite-Version";
pub const KITE_VERSION: &str = "3";

/// Literal `status` value of a successful response envelope
pub const STATUS_SUCCESS: &str = "success";

/// Upper bound for a single token validation request
pub const VALIDATION_TIMEOUT_SECS: u64 = 10;

/// Default per-call timeout for API requests, in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Env file keys
pub const API_KEY_VAR: &str = "API_KEY";
pub const API_SECRET_VAR: &str = "API_SECRET";
pub const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";
pub const BASE_URL_VAR: &str = "BASE_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "REQUEST_TIMEOUT";

/// Placeholder values written into a freshly generated env file.
/// A value equal to its placeholder is treated as unset.
pub const API_KEY_PLACEHOLDER: &str = "your_api_key";
pub const API_SECRET_PLACEHOLDER: &str = "your_api_secret";
pub const ACCESS_TOKEN_PLACEHOLDER: &str = "your_access_token";

/// Build the `Authorization` header value for an access token.
pub fn authorization_value(api_key: &str, access_token: &str) -> String {
    format!("token {api_key}:{access_token}")
}
