//! Access token persistence
//!
//! The access token lives next to the API key and secret in a plain
//! `KEY=value` env file so the next run can skip the browser login. Saving
//! is best effort: a failed write produces a `PersistenceWarning` carrying
//! manual-fix instructions instead of an error.
//!
//! Updates are line preserving. Only the `ACCESS_TOKEN` line is rewritten;
//! comments, ordering, blank lines and line endings of everything else are
//! left byte-for-byte as they were.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::Secret;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::constants::{
    ACCESS_TOKEN_VAR, API_KEY_PLACEHOLDER, API_KEY_VAR, API_SECRET_PLACEHOLDER, API_SECRET_VAR,
    BASE_URL_VAR, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_MS, REQUEST_TIMEOUT_VAR,
};
use crate::error::{Error, Result};

/// Key-value text store with read-all/write-all semantics.
pub trait TokenStore: Send + Sync {
    /// Human-readable location, used in warnings.
    fn location(&self) -> String;

    /// Full contents, or `None` if the store does not exist yet.
    fn read_all<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

    /// Replace the full contents.
    fn write_all<'a>(
        &'a self,
        contents: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Advisory produced when a new access token could not be saved.
///
/// The in-memory token is still valid for this run; the operator has to put
/// it into the store by hand for the next one.
#[derive(Clone)]
pub struct PersistenceWarning {
    pub location: String,
    pub reason: String,
    access_token: Secret<String>,
}

impl PersistenceWarning {
    fn new(location: String, reason: String, access_token: &str) -> Self {
        Self {
            location,
            reason,
            access_token: Secret::from(access_token),
        }
    }

    /// Instructions for setting the token manually. Contains the token.
    pub fn manual_instruction(&self) -> String {
        format!(
            "add the following line to {} (replacing any existing {ACCESS_TOKEN_VAR} line):\n{ACCESS_TOKEN_VAR}={}",
            self.location,
            self.access_token.expose()
        )
    }
}

impl fmt::Debug for PersistenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceWarning")
            .field("location", &self.location)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not save access token to {}: {}",
            self.location, self.reason
        )
    }
}

/// Save `access_token` into the store, creating it from the template if
/// needed. Returns a warning instead of failing.
pub async fn persist_access_token(
    store: &dyn TokenStore,
    access_token: &str,
) -> Option<PersistenceWarning> {
    let location = store.location();

    let existing = match store.read_all().await {
        Ok(existing) => existing,
        Err(e) => {
            warn!(location = %location, error = %e, "could not read token store");
            return Some(PersistenceWarning::new(location, e.to_string(), access_token));
        }
    };

    let created = existing.is_none();
    let contents = upsert_access_token(existing.as_deref(), access_token);

    if let Err(e) = store.write_all(&contents).await {
        warn!(location = %location, error = %e, "could not write token store");
        return Some(PersistenceWarning::new(location, e.to_string(), access_token));
    }

    if created {
        info!(location = %location, "created token store from template");
    } else {
        info!(location = %location, "updated access token in token store");
    }
    None
}

/// Return `existing` with the access token line set to `access_token`.
///
/// - `None` produces the full template with placeholder credentials.
/// - An existing `ACCESS_TOKEN=` line is replaced in place, keeping its
///   line ending. Every other line is copied verbatim.
/// - Without such a line, one is appended.
pub fn upsert_access_token(existing: Option<&str>, access_token: &str) -> String {
    let Some(existing) = existing else {
        return env_template(access_token);
    };

    let mut out = String::with_capacity(existing.len() + access_token.len());
    let mut replaced = false;

    for line in existing.split_inclusive('\n') {
        if is_access_token_line(line) {
            let ending = &line[line.trim_end_matches(['\r', '\n']).len()..];
            out.push_str(ACCESS_TOKEN_VAR);
            out.push('=');
            out.push_str(access_token);
            out.push_str(ending);
            replaced = true;
        } else {
            out.push_str(line);
        }
    }

    if !replaced {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{ACCESS_TOKEN_VAR}={access_token}\n"));
    }

    out
}

fn is_access_token_line(line: &str) -> bool {
    line.split_once('=')
        .is_some_and(|(key, _)| key.trim() == ACCESS_TOKEN_VAR)
}

fn env_template(access_token: &str) -> String {
    format!(
        "{API_KEY_VAR}={API_KEY_PLACEHOLDER}\n\
         {API_SECRET_VAR}={API_SECRET_PLACEHOLDER}\n\
         {ACCESS_TOKEN_VAR}={access_token}\n\
         {BASE_URL_VAR}={DEFAULT_BASE_URL}\n\
         {REQUEST_TIMEOUT_VAR}={DEFAULT_REQUEST_TIMEOUT_MS}\n"
    )
}

/// Env file on disk.
///
/// Writes go to a temp file in the same directory which is then renamed
/// over the target, so a crash never leaves a half-written file. The file
/// holds the API secret, so on unix the temp file is created with mode 0600
/// and never exists with wider permissions.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".env".into());
        dir.join(format!(".{}.tmp.{}", name.trim_start_matches('.'), std::process::id()))
    }
}

/// Open a new file for writing. Fails if anything, including a dangling
/// symlink, already exists at `path`.
async fn create_private(path: &Path) -> std::io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

impl TokenStore for EnvFileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read_all<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            match tokio::fs::read_to_string(&self.path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(Error::Io(format!("reading {}: {e}", self.path.display()))),
            }
        })
    }

    fn write_all<'a>(
        &'a self,
        contents: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let tmp_path = self.temp_path();
            let mut file = create_private(&tmp_path).await.map_err(|e| {
                Error::Io(format!("creating temp env file {}: {e}", tmp_path.display()))
            })?;

            let written: std::io::Result<()> = async {
                file.write_all(contents.as_bytes()).await?;
                file.sync_all().await
            }
            .await;
            drop(file);
            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(Error::Io(format!("writing temp env file: {e}")));
            }

            if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(Error::Io(format!("renaming temp env file: {e}")));
            }

            debug!(path = %self.path.display(), "wrote env file");
            Ok(())
        })
    }
}

/// In-memory store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: Mutex<Option<String>>,
    writes: AtomicUsize,
    read_only: bool,
}

impl MemoryStore {
    /// A store that does not exist yet.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            ..Self::default()
        }
    }

    /// A store that rejects every write.
    pub fn read_only(contents: Option<String>) -> Self {
        Self {
            contents: Mutex::new(contents),
            writes: AtomicUsize::new(0),
            read_only: true,
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl TokenStore for MemoryStore {
    fn location(&self) -> String {
        "in-memory store".into()
    }

    fn read_all<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        let contents = self.contents();
        Box::pin(async move { Ok(contents) })
    }

    fn write_all<'a>(
        &'a self,
        contents: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let result = if self.read_only {
            Err(Error::Io("store is read-only".into()))
        } else {
            *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = Some(contents.to_owned());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        Box::pin(async move { result })
    }
}
