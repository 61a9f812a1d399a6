//! Shared HTTP plumbing for provider backends.

use crate::{ProviderError, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// A reqwest client with the configured request timeout.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    timeout_secs: u64,
}

impl Transport {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// POST a JSON body and return the raw response text.
    ///
    /// Non-success statuses become errors carrying the response body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<String> {
        debug!("POST {}", url);

        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            let code = status.as_u16();
            return Err(match code {
                429 => ProviderError::RateLimited { retry_after: None },
                401 | 403 => ProviderError::AuthError(text),
                _ => ProviderError::ApiError {
                    status: code,
                    message: text,
                },
            });
        }

        debug!(
            "Response ({} bytes): {}",
            text.len(),
            text.chars().take(100).collect::<String>()
        );
        Ok(text)
    }

    fn map_send_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else {
            ProviderError::HttpError(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn test_post_json_returns_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/echo")
            .match_header("x-test", "1")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let transport = Transport::new(5).unwrap();
        let body = transport
            .post_json(
                &format!("{}/echo", server.url()),
                &[("x-test", "1")],
                &json!({"a": 1}),
            )
            .await
            .unwrap();

        assert_eq!(body, r#"{"ok":true}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = Server::new_async().await;
        let _limited = server
            .mock("POST", "/limited")
            .with_status(429)
            .create_async()
            .await;
        let _denied = server
            .mock("POST", "/denied")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;
        let _broken = server
            .mock("POST", "/broken")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let transport = Transport::new(5).unwrap();
        let post = |path: &'static str| {
            let url = format!("{}{}", server.url(), path);
            let transport = transport.clone();
            async move { transport.post_json(&url, &[], &json!({})).await }
        };

        assert!(matches!(
            post("/limited").await,
            Err(ProviderError::RateLimited { .. })
        ));
        assert!(matches!(post("/denied").await, Err(ProviderError::AuthError(m)) if m == "bad key"));
        assert!(matches!(
            post("/broken").await,
            Err(ProviderError::ApiError { status: 500, message }) if message == "boom"
        ));
    }
}
