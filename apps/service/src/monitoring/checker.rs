use std::error::Error as _;
use std::time::Instant;

use reqwest::{Client, Method, redirect};
use tokio::time::timeout;
use tracing::debug;

use super::types::Outcome;
use crate::models::{CheckRecord, HttpMethod};

/// Performs the network probe for a check
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Make exactly one attempt against the check's target.
    ///
    /// Never fails: transport errors and deadline expiry are outcomes.
    async fn probe(&self, check: &CheckRecord) -> Outcome;
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// HTTP/HTTPS checker
pub struct HttpChecker {
    client: Client,
}

impl HttpChecker {
    /// Redirects are reported as-is rather than followed, so a 301 is only
    /// healthy when the check lists it.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("pingwatch/", env!("CARGO_PKG_VERSION")))
            .redirect(redirect::Policy::none())
            .no_proxy()
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn probe(&self, check: &CheckRecord) -> Outcome {
        let target = match check.target_url() {
            Ok(target) => target,
            Err(e) => return Outcome::NetworkError { message: format!("invalid target: {e}") },
        };

        let start = Instant::now();
        let request = self.client.request(check.http_method.into(), target).send();

        // The outer deadline covers connect, TLS and waiting for the status line.
        let outcome = match timeout(check.timeout(), request).await {
            Ok(Ok(response)) => Outcome::Response { status_code: response.status().as_u16() },
            Ok(Err(e)) if e.is_timeout() => Outcome::Timeout,
            Ok(Err(e)) => Outcome::NetworkError { message: error_chain(&e) },
            Err(_) => Outcome::Timeout,
        };

        debug!(
            check_id = %check.id,
            latency_ms = start.elapsed().as_millis() as u64,
            %outcome,
            "Probe finished"
        );
        outcome
    }
}

/// reqwest's top-level message hides the cause ("error sending request"),
/// so the source chain is flattened into the outcome.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckState, Protocol};
    use crate::test_support::{closed_port, spawn_http_target, spawn_silent_target};
    use std::net::SocketAddr;
    use std::time::Duration;

    fn check_for(addr: SocketAddr, path: &str, method: HttpMethod) -> CheckRecord {
        CheckRecord {
            id: "abcdefghij0123456789".into(),
            owner_phone: "5551234567".into(),
            protocol: Protocol::Http,
            url: format!("{addr}{path}"),
            http_method: method,
            success_codes: vec![200],
            timeout_seconds: 1,
            state: CheckState::Down,
            last_checked_at: None,
        }
    }

    #[tokio::test]
    async fn test_response_status_is_reported() {
        let (addr, mut requests) = spawn_http_target(503).await;
        let checker = HttpChecker::new().unwrap();

        let outcome = checker.probe(&check_for(addr, "/health?verbose=1", HttpMethod::Get)).await;

        assert_eq!(outcome, Outcome::Response { status_code: 503 });
        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("GET /health?verbose=1 HTTP/1.1"), "{request}");
    }

    #[tokio::test]
    async fn test_method_is_forwarded() {
        let (addr, mut requests) = spawn_http_target(200).await;
        let checker = HttpChecker::new().unwrap();

        let outcome = checker.probe(&check_for(addr, "/items", HttpMethod::Delete)).await;

        assert_eq!(outcome.response_code(), Some(200));
        assert!(requests.recv().await.unwrap().starts_with("DELETE /items "));
    }

    #[tokio::test]
    async fn test_redirect_is_not_followed() {
        let (addr, _requests) = spawn_http_target(301).await;
        let checker = HttpChecker::new().unwrap();

        let outcome = checker.probe(&check_for(addr, "/", HttpMethod::Get)).await;
        assert_eq!(outcome, Outcome::Response { status_code: 301 });
    }

    #[tokio::test]
    async fn test_unresponsive_target_times_out() {
        let addr = spawn_silent_target().await;
        let checker = HttpChecker::new().unwrap();

        let started = Instant::now();
        let outcome = checker.probe(&check_for(addr, "/", HttpMethod::Get)).await;

        assert_eq!(outcome, Outcome::Timeout);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        let addr = closed_port().await;
        let checker = HttpChecker::new().unwrap();

        let outcome = checker.probe(&check_for(addr, "/", HttpMethod::Post)).await;
        assert!(matches!(outcome, Outcome::NetworkError { .. }), "{outcome:?}");
    }
}
