//! Session endpoint tests against a mock Kite server.
//!
//! These use wiremock to stand in for api.kite.trade so token validation and the
//! token exchange can be checked without network access or real credentials.

use std::future::Future;
use std::pin::Pin;

use kite_auth::{
    Credential, CredentialResolver, Error, KiteSession, MemoryStore, RequestTokenSource,
    TokenOrigin, exchange_request_token, validate_token,
};
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ABC_TOK123_XYZ: &str = "fa80deef8ae654d844403ec6278b2ac9062e8214dc9c5a1107891b8f915cd9af";

struct Pasted(&'static str);

impl RequestTokenSource for Pasted {
    fn request_token<'a>(
        &'a self,
        _login_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = kite_auth::Result<String>> + Send + 'a>> {
        let text = self.0.to_owned();
        Box::pin(async move { Ok(text) })
    }
}

fn session_success() -> serde_json::Value {
    json!({
        "status": "success",
        "data": {
            "user_id": "AB1234",
            "access_token": "at_new",
            "public_token": "pt_new",
            "login_time": "2024-03-01 09:15:02"
        }
    })
}

// ============================================================================
// Token validation
// ============================================================================

#[tokio::test]
async fn validation_accepts_success_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "token abc:validTok"))
        .and(header("x-kite-version", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "user_id": "AB1234" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    assert!(validate_token(&client, &server.uri(), "abc", "validTok").await);
}

#[tokio::test]
async fn validation_rejects_error_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": "error",
            "message": "Incorrect `api_key` or `access_token`.",
            "error_type": "TokenException"
        })))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    assert!(!validate_token(&client, &server.uri(), "abc", "expired").await);
}

#[tokio::test]
async fn validation_rejects_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    assert!(!validate_token(&client, &server.uri(), "abc", "tok").await);
}

#[tokio::test]
async fn validation_treats_unreachable_server_as_invalid() {
    let client = reqwest::Client::new();
    assert!(!validate_token(&client, "http://127.0.0.1:1", "abc", "tok").await);
}

// ============================================================================
// Token exchange
// ============================================================================

#[tokio::test]
async fn exchange_posts_exact_form_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session/token"))
        .and(body_string(format!(
            "api_key=abc&request_token=tok123&checksum={ABC_TOK123_XYZ}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_success()))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let session = exchange_request_token(&client, &server.uri(), "abc", "tok123", ABC_TOK123_XYZ)
        .await
        .unwrap();

    assert_eq!(session.access_token, "at_new");
    assert_eq!(session.public_token, "pt_new");
    assert_eq!(session.login_time, "2024-03-01 09:15:02");
}

#[tokio::test]
async fn exchange_surfaces_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session/token"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": "error",
            "message": "Token is invalid or has expired.",
            "error_type": "TokenException"
        })))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let err = exchange_request_token(&client, &server.uri(), "abc", "used", "sum")
        .await
        .unwrap_err();

    match err {
        Error::Exchange(message) => assert_eq!(message, "Token is invalid or has expired."),
        other => panic!("expected exchange error, got {other:?}"),
    }
}

#[tokio::test]
async fn exchange_network_failure_is_exchange_error() {
    let client = reqwest::Client::new();
    let err = exchange_request_token(&client, "http://127.0.0.1:1", "abc", "tok", "sum")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Exchange(_)), "got: {err:?}");
}

#[tokio::test]
async fn exchange_rejects_non_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session/token"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let err = exchange_request_token(&client, &server.uri(), "abc", "tok", "sum")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("502"), "got: {err}");
}

// ============================================================================
// End-to-end resolution
// ============================================================================

#[tokio::test]
async fn valid_stored_token_makes_no_post() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let session = KiteSession::new(reqwest::Client::new(), server.uri());
    let store = MemoryStore::with_contents("ACCESS_TOKEN=validTok\n");
    let credential =
        Credential::new(Some("abc".into()), Some("xyz".into()), Some("validTok".into())).unwrap();

    let resolved = CredentialResolver::new(&session, &Pasted("unused"), &store)
        .resolve(&credential)
        .await
        .unwrap();

    assert_eq!(resolved.access_token.expose(), "validTok");
    assert_eq!(resolved.origin, TokenOrigin::Existing);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn expired_token_is_replaced_and_persisted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": "error",
            "message": "Incorrect `api_key` or `access_token`.",
            "error_type": "TokenException"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/token"))
        .and(body_string(format!(
            "api_key=abc&request_token=tok123&checksum={ABC_TOK123_XYZ}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_success()))
        .expect(1)
        .mount(&server)
        .await;

    let session = KiteSession::new(reqwest::Client::new(), server.uri());
    let store = MemoryStore::with_contents("API_KEY=abc\nAPI_SECRET=xyz\nACCESS_TOKEN=stale\n");
    let credential =
        Credential::new(Some("abc".into()), Some("xyz".into()), Some("stale".into())).unwrap();

    let redirect = "https://127.0.0.1/?action=login&status=success&request_token=tok123";
    let resolved = CredentialResolver::new(&session, &Pasted(redirect), &store)
        .resolve(&credential)
        .await
        .unwrap();

    assert_eq!(resolved.access_token.expose(), "at_new");
    assert_eq!(resolved.origin, TokenOrigin::Exchanged);
    assert_eq!(
        store.contents().unwrap(),
        "API_KEY=abc\nAPI_SECRET=xyz\nACCESS_TOKEN=at_new\n"
    );
}
