//! Credential resolution
//!
//! Produces the one access token the process will use, or fails. A stored
//! token is validated and kept if the broker accepts it. Anything else goes
//! through the interactive login: show the login URL, read the request
//! token, exchange it with its checksum, and persist the result.
//!
//! There is no retry. Every error returned from `resolve` is meant to stop
//! process startup; persistence problems are reported as warnings on the
//! successful result instead.

use common::Secret;
use tracing::{info, warn};

use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::login::{checksum, extract_request_token, login_url};
use crate::prompt::RequestTokenSource;
use crate::session::SessionApi;
use crate::store::{PersistenceWarning, TokenStore, persist_access_token};

/// Where the resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    /// The stored token passed validation.
    Existing,
    /// A fresh token from the login exchange.
    Exchanged,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub access_token: Secret<String>,
    pub origin: TokenOrigin,
    /// Advisory problems (e.g. the token could not be saved). Never fatal.
    pub warnings: Vec<PersistenceWarning>,
}

/// Drives token validation and the interactive login.
///
/// Every side effect is injected: network calls via `SessionApi`, operator
/// input via `RequestTokenSource`, persistence via `TokenStore`.
pub struct CredentialResolver<'a> {
    session: &'a dyn SessionApi,
    prompt: &'a dyn RequestTokenSource,
    store: &'a dyn TokenStore,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(
        session: &'a dyn SessionApi,
        prompt: &'a dyn RequestTokenSource,
        store: &'a dyn TokenStore,
    ) -> Self {
        Self {
            session,
            prompt,
            store,
        }
    }

    /// Resolve a usable access token for `credential`.
    pub async fn resolve(&self, credential: &Credential) -> Result<Resolved> {
        match credential.usable_access_token() {
            Some(existing) => {
                if self.session.check_token(&credential.api_key, existing).await {
                    info!(api_key = %credential.api_key, "stored access token accepted");
                    return Ok(Resolved {
                        access_token: Secret::from(existing),
                        origin: TokenOrigin::Existing,
                        warnings: Vec::new(),
                    });
                }
                warn!(api_key = %credential.api_key, "stored access token rejected, login required");
            }
            None => {
                info!(api_key = %credential.api_key, "no stored access token, login required");
            }
        }

        self.login(credential).await
    }

    async fn login(&self, credential: &Credential) -> Result<Resolved> {
        let url = login_url(&credential.api_key);
        let input = self.prompt.request_token(&url).await?;
        let request_token = extract_request_token(&input)
            .ok_or_else(|| Error::Input("request token is empty".into()))?;

        let signature = checksum(
            &credential.api_key,
            &request_token,
            credential.api_secret.expose(),
        );
        let session = self
            .session
            .exchange(&credential.api_key, &request_token, &signature)
            .await?;

        if session.access_token.trim().is_empty() {
            return Err(Error::Exchange(
                "token endpoint returned an empty access token".into(),
            ));
        }
        info!(login_time = %session.login_time, "access token obtained");

        let warnings = persist_access_token(self.store, &session.access_token)
            .await
            .into_iter()
            .collect();

        Ok(Resolved {
            access_token: Secret::new(session.access_token.clone()),
            origin: TokenOrigin::Exchanged,
            warnings,
        })
    }
}
