//! Paygate HTTP Client
//!
//! Fetches the active paywall rule set and the viewer's entitlement
//! document over HTTP. [`PaywallClient`] implements both
//! [`RuleFetcher`] and [`EntitlementFetcher`], so it can be handed straight
//! to the manager builder.
//!
//! ```no_run
//! use paygate_client::PaywallClient;
//! use paygate_core::RuleFetcher;
//!
//! # async fn example() -> Result<(), paygate_core::FetchError> {
//! let client = PaywallClient::new("https://api.example.com");
//! let rules = client.fetch_rules().await?;
//! println!("{} active rules", rules.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, instrument};

use paygate_core::{EntitlementFetcher, Entitlements, FetchError, RuleFetcher, RuleSet};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the active rule set endpoint.
pub const RULES_PATH: &str = "/retail/public/v1/paywall/active";

/// Path of the entitlements endpoint.
pub const ENTITLEMENTS_PATH: &str = "/sales/public/v1/entitlements";

/// HTTP client for the rule and entitlement services.
#[derive(Debug, Clone)]
pub struct PaywallClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

/// Builder for configuring a [`PaywallClient`].
#[derive(Debug)]
pub struct PaywallClientBuilder {
    base_url: String,
    timeout: Duration,
    access_token: Option<String>,
    client: Option<Client>,
}

impl PaywallClientBuilder {
    /// Create a new builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            access_token: None,
            client: None,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the viewer's access token, sent with entitlement requests.
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Use a custom reqwest Client.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<PaywallClient, FetchError> {
        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| FetchError::Configuration(e.to_string()))?,
        };

        Ok(PaywallClient {
            client,
            base_url: self.base_url,
            access_token: self.access_token,
        })
    }
}

/// Error body returned by the services on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

impl PaywallClient {
    /// Create a new client with default configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        PaywallClientBuilder::new(base_url)
            .build()
            .expect("default client configuration should not fail")
    }

    /// Create a builder for advanced configuration.
    pub fn builder(base_url: impl Into<String>) -> PaywallClientBuilder {
        PaywallClientBuilder::new(base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a GET and return the response if it succeeded.
    async fn get(&self, path: &str, authenticated: bool) -> Result<Response, FetchError> {
        let mut req = self.client.get(self.url(path));
        if authenticated {
            let token = self.access_token.as_ref().ok_or_else(|| {
                FetchError::Configuration("access token is required for entitlements".into())
            })?;
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let response = req
            .send()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, path, "fetch succeeded");
            Ok(response)
        } else {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_owned());
            Err(FetchError::Http {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl RuleFetcher for PaywallClient {
    #[instrument(name = "client.fetch_rules", skip(self), fields(base_url = %self.base_url))]
    async fn fetch_rules(&self) -> Result<RuleSet, FetchError> {
        let body = self
            .get(RULES_PATH, false)
            .await?
            .text()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;
        RuleSet::from_document(body).map_err(|e| FetchError::Deserialization(e.to_string()))
    }
}

#[async_trait]
impl EntitlementFetcher for PaywallClient {
    #[instrument(name = "client.fetch_entitlements", skip(self), fields(base_url = %self.base_url))]
    async fn fetch_entitlements(&self) -> Result<Entitlements, FetchError> {
        self.get(ENTITLEMENTS_PATH, true)
            .await?
            .json::<Entitlements>()
            .await
            .map_err(|e| FetchError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve one canned HTTP response and return the raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0_u8; 8192];
            let mut read = 0;
            loop {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                read += n;
                if n == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf[..read]).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let client = PaywallClient::builder("https://api.example.com/")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(
            client.url(RULES_PATH),
            "https://api.example.com/retail/public/v1/paywall/active"
        );
    }

    #[tokio::test]
    async fn fetch_rules_parses_rule_set() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[{"id":1,"ruleType":"HideOnMatch","budget":{"type":"calendar","calendarPeriod":"monthly"}}]"#,
        )
        .await;
        let client = PaywallClient::new(base);
        let rules = client.fetch_rules().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules.to_document().unwrap(),
            r#"[{"id":1,"ruleType":"HideOnMatch","budget":{"type":"calendar","calendarPeriod":"monthly"}}]"#
        );
        let request = server.await.unwrap();
        assert!(request.starts_with(&format!("GET {RULES_PATH} ")));
        assert!(!request.to_lowercase().contains("authorization"));
    }

    #[tokio::test]
    async fn fetch_entitlements_sends_bearer_token() {
        let (base, server) = serve_once("200 OK", r#"{"skus":[{"id":"premium"}]}"#).await;
        let client = PaywallClient::builder(base)
            .access_token("tok-123")
            .build()
            .unwrap();
        let ent = client.fetch_entitlements().await.unwrap();
        assert!(ent.has_sku("premium"));
        let request = server.await.unwrap().to_lowercase();
        assert!(request.contains("authorization: bearer tok-123"));
    }

    #[tokio::test]
    async fn entitlements_without_token_is_configuration_error() {
        let client = PaywallClient::new("http://127.0.0.1:9");
        let err = client.fetch_entitlements().await.unwrap_err();
        assert!(matches!(err, FetchError::Configuration(_)));
    }

    #[tokio::test]
    async fn server_error_maps_to_http_error() {
        let (base, _server) =
            serve_once("503 Service Unavailable", r#"{"message":"maintenance"}"#).await;
        let client = PaywallClient::new(base);
        let err = client.fetch_rules().await.unwrap_err();
        match err {
            FetchError::Http { status, ref message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn malformed_body_is_deserialization_error() {
        let (base, _server) = serve_once("200 OK", r#"{"not":"a rule set"}"#).await;
        let client = PaywallClient::new(base);
        let err = client.fetch_rules().await.unwrap_err();
        assert!(matches!(err, FetchError::Deserialization(_)));
    }
}
