//! Shared HTTP plumbing for the embedding and generation backends.
//!
//! Both backends speak JSON over HTTP and share the same failure policy,
//! controlled per backend by `max_retries` and `timeout_secs`:
//!
//! - HTTP 429 and 5xx → retryable
//! - other non-2xx → fail immediately
//! - network errors → retryable
//! - backoff: 1s, 2s, 4s, … (capped at 2^5)
//!
//! With the default `max_retries = 0` every call is attempted exactly once.

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Build a `reqwest::Client`, with a request timeout only when one is set.
pub fn build_client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// POST `body` to `url` and return the parsed JSON response.
///
/// `service` names the backend in error messages (e.g. `"Ollama"`).
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
    service: &str,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::warn!(service, attempt, ?delay, "retrying backend call");
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .with_context(|| format!("{} returned a non-JSON body", service))?;
                    return Ok(json);
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = anyhow::anyhow!("{} API error {}: {}", service, status, body_text);

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }

                return Err(err);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!(
                    "{} connection error (is it reachable at {}?): {}",
                    service,
                    url,
                    e
                ));
                continue;
            }
        }
    }

    match last_err {
        Some(e) => Err(e),
        None => bail!("{} request failed", service),
    }
}

/// Join a base URL and a path without doubling the slash.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        assert_eq!(
            endpoint("http://localhost:11434/", "/api/embed"),
            "http://localhost:11434/api/embed"
        );
        assert_eq!(
            endpoint("http://localhost:11434", "/api/chat"),
            "http://localhost:11434/api/chat"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_error() {
        let client = build_client(Some(2)).unwrap();
        let err = post_json(
            &client,
            "http://127.0.0.1:9/api/embed",
            None,
            &serde_json::json!({}),
            0,
            "Ollama",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Ollama connection error"));
    }

    #[tokio::test]
    async fn test_non_json_success_names_service() {
        let app = axum::Router::new().route(
            "/api/chat",
            axum::routing::post(|| async { "<html>proxy login</html>" }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = build_client(Some(5)).unwrap();
        let err = post_json(
            &client,
            &format!("http://{}/api/chat", addr),
            None,
            &serde_json::json!({}),
            0,
            "Ollama",
        )
        .await
        .unwrap_err();
        assert!(
            err.to_string().contains("Ollama returned a non-JSON body"),
            "{:#}",
            err
        );
    }
}
