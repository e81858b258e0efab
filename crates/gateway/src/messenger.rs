//! Outbound delivery to the messaging gateway.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use timeclock_core::config::GatewayConfig;
use timeclock_core::messaging::Messenger;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("could not build gateway client: {0}")]
    Client(String),
    #[error("gateway request failed: {0}")]
    Request(String),
    #[error("gateway rejected request with status {status}: {body}")]
    Status { status: u16, body: String },
}

impl GatewayError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Client(_) => false,
            Self::Request(_) => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay_ms: 250, max_delay_ms: 2_000 }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Picks the HTTP messenger when an endpoint is configured, otherwise one
/// that only logs what would have been sent.
pub fn messenger_from_config(config: &GatewayConfig) -> Result<Arc<dyn Messenger>, GatewayError> {
    match &config.api_base_url {
        Some(base_url) => Ok(Arc::new(HttpMessenger::new(
            base_url,
            config.channel_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(TracingMessenger)),
    }
}

#[derive(Clone)]
pub struct HttpMessenger {
    client: Client,
    base_url: String,
    channel_token: SecretString,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for HttpMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMessenger")
            .field("base_url", &self.base_url)
            .field("channel_token", &"[REDACTED]")
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl HttpMessenger {
    pub fn new(
        base_url: &str,
        channel_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GatewayError::Client(error.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            channel_token,
            retry_policy: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    async fn post_with_retry(&self, path: &str, body: &Value) -> Result<(), GatewayError> {
        let mut attempt = 0;
        loop {
            match self.post(path, body).await {
                Ok(()) => return Ok(()),
                Err(error) if error.is_retryable() && attempt < self.retry_policy.max_retries => {
                    debug!(
                        event_name = "egress.gateway.retry",
                        path,
                        attempt,
                        error = %error,
                        "retrying gateway delivery"
                    );
                    let delay = self.retry_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(self.channel_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| GatewayError::Request(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status { status: status.as_u16(), body })
    }

    async fn deliver(&self, kind: &'static str, target: &str, path: &str, body: Value) {
        match self.post_with_retry(path, &body).await {
            Ok(()) => debug!(event_name = "egress.gateway.delivered", kind, target, "delivered"),
            Err(error) => warn!(
                event_name = "egress.gateway.delivery_failed",
                kind,
                target,
                error = %error,
                "gateway delivery failed; message dropped"
            ),
        }
    }
}

#[async_trait]
impl Messenger for HttpMessenger {
    async fn reply_message(&self, reply_token: &str, text: &str) {
        self.deliver("reply", reply_token, "/message/reply", reply_payload(reply_token, text))
            .await;
    }

    async fn push_message(&self, identity: &str, text: &str) {
        self.deliver("push", identity, "/message/push", push_payload(identity, text)).await;
    }

    async fn push_buttons(&self, identity: &str, title: &str, labels: &[String]) {
        self.deliver("buttons", identity, "/message/push", buttons_payload(identity, title, labels))
            .await;
    }
}

/// Stand-in used when no gateway endpoint is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingMessenger;

#[async_trait]
impl Messenger for TracingMessenger {
    async fn reply_message(&self, reply_token: &str, text: &str) {
        info!(event_name = "egress.gateway.reply", reply_token, text, "reply (not delivered)");
    }

    async fn push_message(&self, identity: &str, text: &str) {
        info!(event_name = "egress.gateway.push", identity, text, "push (not delivered)");
    }

    async fn push_buttons(&self, identity: &str, title: &str, labels: &[String]) {
        info!(
            event_name = "egress.gateway.buttons",
            identity,
            title,
            labels = ?labels,
            "buttons (not delivered)"
        );
    }
}

fn text_message(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

fn reply_payload(reply_token: &str, text: &str) -> Value {
    json!({ "replyToken": reply_token, "messages": [text_message(text)] })
}

fn push_payload(identity: &str, text: &str) -> Value {
    json!({ "to": identity, "messages": [text_message(text)] })
}

/// Each button posts its own label back, so the conversation receives the
/// label as text.
fn buttons_payload(identity: &str, title: &str, labels: &[String]) -> Value {
    let actions: Vec<Value> = labels
        .iter()
        .map(|label| json!({ "type": "postback", "label": label, "data": label }))
        .collect();

    json!({
        "to": identity,
        "messages": [{
            "type": "template",
            "altText": title,
            "template": { "type": "buttons", "text": title, "actions": actions },
        }],
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use timeclock_core::config::GatewayConfig;
    use timeclock_core::messaging::Messenger;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::{
        buttons_payload, messenger_from_config, GatewayError, HttpMessenger, RetryPolicy,
    };

    #[test]
    fn backoff_is_exponential_and_capped() {
        let policy = RetryPolicy { max_retries: 5, base_delay_ms: 100, max_delay_ms: 500 };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(500));
    }

    #[test]
    fn only_transient_failures_are_retried() {
        assert!(GatewayError::Request("reset".to_owned()).is_retryable());
        assert!(GatewayError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(GatewayError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!GatewayError::Status { status: 400, body: String::new() }.is_retryable());
    }

    #[test]
    fn buttons_post_back_their_labels() {
        let payload = buttons_payload("U1", "Pick one", &["Arrival".to_owned()]);
        let action = &payload["messages"][0]["template"]["actions"][0];
        assert_eq!(action["label"], "Arrival");
        assert_eq!(action["data"], "Arrival");
        assert_eq!(payload["to"], "U1");
    }

    #[test]
    fn debug_output_redacts_channel_token() {
        let messenger = HttpMessenger::new(
            "https://gateway.example.com/",
            SecretString::from("very-secret-token".to_owned()),
            Duration::from_secs(5),
        )
        .expect("client");

        let debug = format!("{messenger:?}");
        assert!(!debug.contains("very-secret-token"));
        assert!(debug.contains("https://gateway.example.com\""));
    }

    #[test]
    fn missing_endpoint_selects_tracing_messenger() {
        let config = GatewayConfig {
            api_base_url: None,
            channel_token: SecretString::from(String::new()),
            timeout_secs: 5,
        };
        assert!(messenger_from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn reply_is_posted_with_bearer_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .expect("write response");
            request
        });

        let messenger = HttpMessenger::new(
            &format!("http://{address}"),
            SecretString::from("tok-123".to_owned()),
            Duration::from_secs(5),
        )
        .expect("client")
        .with_retry_policy(RetryPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 });

        messenger.reply_message("rt-9", "Punched in at 09:01").await;

        let request = server.await.expect("server task");
        assert!(request.starts_with("POST /message/reply "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer tok-123"));
        assert!(request.contains("\"replyToken\":\"rt-9\""));
        assert!(request.contains("Punched in at 09:01"));
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.expect("read");
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buffer).to_string()
    }
}
