use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

pub const MB: usize = 1024 * 1024;

pub async fn wait_for_server(url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let health_url = format!("{}/health", url);

    println!("Waiting for server to be ready...");
    for i in 0..30 {
        match client.get(&health_url).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    println!("Server is ready!");
                    return Ok(());
                }
            }
            Err(_) => {
                if i < 29 {
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    anyhow::bail!("Server did not become ready within 30 seconds");
}

/// A file part filled with `len` filler bytes
pub fn file_part(name: &str, content_type: &str, len: usize) -> Result<Part> {
    Part::bytes(vec![b'x'; len])
        .file_name(name.to_string())
        .mime_str(content_type)
        .with_context(|| format!("Invalid content type: {}", content_type))
}

/// Post a multipart form and return the status with the parsed JSON body
pub async fn post_form(
    client: &reqwest::Client,
    url: &str,
    form: Form,
) -> Result<(reqwest::StatusCode, serde_json::Value)> {
    let response = client
        .post(url)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", url))?;
    let status = response.status();
    debug!(url, %status, "Response received");
    let body = response
        .json::<serde_json::Value>()
        .await
        .context("Response body is not JSON")?;
    Ok((status, body))
}

pub fn expect_status(
    got: reqwest::StatusCode,
    expected: u16,
    body: &serde_json::Value,
) -> Result<()> {
    if got.as_u16() != expected {
        anyhow::bail!("Expected status {}, got {}: {}", expected, got, body);
    }
    Ok(())
}

pub fn expect_error_code(body: &serde_json::Value, code: &str) -> Result<()> {
    let got = body.get("error").and_then(|v| v.as_str());
    if got != Some(code) {
        anyhow::bail!("Expected error code {}, got {:?}", code, got);
    }
    if body.get("success").and_then(|v| v.as_bool()) != Some(false) {
        anyhow::bail!("Error response must carry success=false: {}", body);
    }
    Ok(())
}

/// True when the server dropped an established connection, e.g. after
/// rejecting a request before reading its whole body. Connect failures and
/// timeouts do not count.
pub fn closed_by_server(err: &anyhow::Error) -> bool {
    let mut closed = false;
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            if e.is_connect() || e.is_timeout() {
                return false;
            }
        }
        if let Some(e) = cause.downcast_ref::<std::io::Error>() {
            closed |= matches!(
                e.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
            );
        }
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_counts_as_closed() {
        let err = anyhow::Error::new(std::io::Error::new(ErrorKind::ConnectionReset, "reset"))
            .context("Failed to send request");
        assert!(closed_by_server(&err));
    }

    #[test]
    fn test_other_failures_are_not_closed() {
        let refused =
            anyhow::Error::new(std::io::Error::new(ErrorKind::ConnectionRefused, "refused"));
        assert!(!closed_by_server(&refused));
        assert!(!closed_by_server(&anyhow::anyhow!("Response body is not JSON")));
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_closed() {
        // Port 9 on localhost is not expected to accept connections
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/")
            .send()
            .await
            .unwrap_err();
        assert!(err.is_connect());
        assert!(!closed_by_server(&anyhow::Error::new(err)));
    }
}
