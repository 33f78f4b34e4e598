//! Authenticated Kite Connect API gateway
//!
//! A `Gateway` wraps one resolved access token and issues every downstream
//! call with it. Construct it only after `kite_auth::CredentialResolver`
//! has produced a token; the gateway never refreshes or re-validates.
//!
//! Each call is a single round trip bounded by the configured timeout. The
//! broker's `{status, data}` envelope is unwrapped and `data` returned as
//! JSON; error envelopes become `Error::Api`.

pub mod error;
pub mod orders;

pub use error::{Error, Result};
pub use orders::OrderParams;

use std::time::Duration;

use common::Secret;
use kite_auth::{KITE_VERSION, KITE_VERSION_HEADER, STATUS_SUCCESS, authorization_value};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

/// Client handle holding exactly one access token.
pub struct Gateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Secret<String>,
    timeout: Duration,
}

impl Gateway {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        access_token: Secret<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            access_token,
            timeout,
        }
    }

    /// GET /user/profile
    pub async fn profile(&self) -> Result<Value> {
        self.send(self.request(Method::GET, "/user/profile")).await
    }

    /// GET /user/margins, or /user/margins/{segment} for `equity`/`commodity`
    pub async fn margins(&self, segment: Option<&str>) -> Result<Value> {
        let path = match segment {
            Some(segment) => format!("/user/margins/{}", path_segment(segment)?),
            None => "/user/margins".to_owned(),
        };
        self.send(self.request(Method::GET, &path)).await
    }

    /// GET /portfolio/positions
    pub async fn positions(&self) -> Result<Value> {
        self.send(self.request(Method::GET, "/portfolio/positions"))
            .await
    }

    /// GET /portfolio/holdings
    pub async fn holdings(&self) -> Result<Value> {
        self.send(self.request(Method::GET, "/portfolio/holdings"))
            .await
    }

    /// GET /orders
    pub async fn orders(&self) -> Result<Value> {
        self.send(self.request(Method::GET, "/orders")).await
    }

    /// GET /orders/{order_id}: state transitions of one order
    pub async fn order_history(&self, order_id: &str) -> Result<Value> {
        let order_id = path_segment(order_id)?;
        self.send(self.request(Method::GET, &format!("/orders/{order_id}")))
            .await
    }

    /// GET /trades
    pub async fn trades(&self) -> Result<Value> {
        self.send(self.request(Method::GET, "/trades")).await
    }

    /// GET /orders/{order_id}/trades
    pub async fn order_trades(&self, order_id: &str) -> Result<Value> {
        let order_id = path_segment(order_id)?;
        self.send(self.request(Method::GET, &format!("/orders/{order_id}/trades")))
            .await
    }

    /// POST /orders/{variety}. Returns `{"order_id": ...}`.
    pub async fn place_order(&self, variety: &str, params: &OrderParams) -> Result<Value> {
        let variety = path_segment(variety)?;
        let request = self
            .request(Method::POST, &format!("/orders/{variety}"))
            .form(params);
        self.send(request).await
    }

    /// PUT /orders/{variety}/{order_id}
    pub async fn modify_order(
        &self,
        variety: &str,
        order_id: &str,
        params: &OrderParams,
    ) -> Result<Value> {
        let (variety, order_id) = (path_segment(variety)?, path_segment(order_id)?);
        let request = self
            .request(Method::PUT, &format!("/orders/{variety}/{order_id}"))
            .form(params);
        self.send(request).await
    }

    /// DELETE /orders/{variety}/{order_id}
    pub async fn cancel_order(&self, variety: &str, order_id: &str) -> Result<Value> {
        let (variety, order_id) = (path_segment(variety)?, path_segment(order_id)?);
        self.send(self.request(Method::DELETE, &format!("/orders/{variety}/{order_id}")))
            .await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        debug!(%method, path, "kite api call");
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header(KITE_VERSION_HEADER, KITE_VERSION)
            .header(
                reqwest::header::AUTHORIZATION,
                authorization_value(&self.api_key, self.access_token.expose()),
            )
            .timeout(self.timeout)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.timeout)
            } else {
                Error::Http(e.to_string())
            }
        })?;

        let http_status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.timeout)
            } else {
                Error::Http(format!("reading response body: {e}"))
            }
        })?;

        unwrap_envelope(http_status, &body)
    }
}

/// Percent-encode a caller-supplied path segment. Empty and dot-only values
/// are refused because URL parsing would collapse them.
fn path_segment(value: &str) -> Result<String> {
    if value.is_empty() || value.bytes().all(|b| b == b'.') {
        return Err(Error::InvalidArgument(format!(
            "{value:?} is not a valid path segment"
        )));
    }

    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    Ok(out)
}

fn unwrap_envelope(http_status: reqwest::StatusCode, body: &str) -> Result<Value> {
    let mut envelope: Value = serde_json::from_str(body).map_err(|e| {
        Error::InvalidResponse(format!("HTTP {http_status}, body is not JSON: {e}"))
    })?;

    let status = envelope.get("status").and_then(Value::as_str);
    if status == Some(STATUS_SUCCESS) {
        return Ok(envelope.get_mut("data").map(Value::take).unwrap_or(Value::Null));
    }

    let field = |name: &str| {
        envelope
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_owned)
    };
    let error_type = field("error_type").unwrap_or_else(|| "GeneralException".into());
    let message = field("message").unwrap_or_else(|| format!("request failed with HTTP {http_status}"));
    warn!(%http_status, error_type = %error_type, "kite api returned an error");
    Err(Error::Api {
        error_type,
        message,
    })
}
