//! Operator input for the request token
//!
//! After logging in through the browser the broker redirects to the app's
//! redirect URL with `request_token=...` in the query string. Someone has to
//! copy that back into the process; `RequestTokenSource` is that step.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};

/// Supplies the raw text the operator pasted after visiting `login_url`.
///
/// Implementations may block indefinitely; there is no timeout on this step.
pub trait RequestTokenSource: Send + Sync {
    fn request_token<'a>(
        &'a self,
        login_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

/// Prompts on stderr and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl RequestTokenSource for StdinPrompt {
    fn request_token<'a>(
        &'a self,
        login_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let mut stderr = tokio::io::stderr();
            let prompt = format!(
                "\nOpen this URL in a browser and log in:\n\n  {login_url}\n\n\
                 Paste the request_token (or the full redirect URL) and press Enter:\n> "
            );
            stderr
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| Error::Io(format!("writing login prompt: {e}")))?;
            stderr
                .flush()
                .await
                .map_err(|e| Error::Io(format!("writing login prompt: {e}")))?;

            read_request_token(&mut BufReader::new(tokio::io::stdin())).await
        })
    }
}

/// Read one line of operator input. End of input before any line is an
/// input error.
pub async fn read_request_token<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|e| Error::Input(format!("reading request token: {e}")))?;
    if read == 0 {
        return Err(Error::Input(
            "input closed before a request token was entered".into(),
        ));
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_input_is_an_input_error() {
        let mut input = BufReader::new(&b""[..]);
        let err = read_request_token(&mut input).await.unwrap_err();
        assert!(matches!(err, Error::Input(_)), "got: {err:?}");
        assert!(err.to_string().contains("input closed"));
    }

    #[tokio::test]
    async fn returns_the_first_pasted_line() {
        let mut input = BufReader::new(&b"tok123\nignored\n"[..]);
        let line = read_request_token(&mut input).await.unwrap();
        assert_eq!(line, "tok123\n");
    }

    #[tokio::test]
    async fn blank_line_is_returned_for_the_caller_to_reject() {
        let mut input = BufReader::new(&b"\n"[..]);
        assert_eq!(read_request_token(&mut input).await.unwrap(), "\n");
    }
}
