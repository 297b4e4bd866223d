//! Report delivery.
//!
//! Two modes with different guarantees:
//!
//! - [`Transport::Compose`] only produces a `mailto:` draft for the user to
//!   open. Nothing reports whether the mail was actually sent, so callers
//!   treat an opened draft as handled and mark the period sent right away.
//!   A dismissed draft therefore still counts as reported; that is accepted.
//! - [`Transport::Webhook`] POSTs the message and reports success only on a
//!   2xx response. Callers mark the period sent only after that.

use crate::report::Report;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingMessage {
    pub fn for_report(report: &Report, recipients: &[String]) -> Self {
        Self {
            to: recipients.to_vec(),
            subject: report.subject.clone(),
            body: report.body.clone(),
        }
    }
}

/// What the transport could observe about a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Delivery {
    /// A compose draft was produced; no completion signal exists.
    Drafted { url: String },
    /// The remote endpoint accepted the message.
    Delivered,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("delivery request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("delivery endpoint answered {0}")]
    Status(u16),
}

#[derive(Debug, Clone)]
pub enum Transport {
    Compose(ComposeTransport),
    Webhook(WebhookTransport),
}

impl Transport {
    /// Whether a successful send means the message really went out.
    pub fn is_confirmable(&self) -> bool {
        matches!(self, Transport::Webhook(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transport::Compose(_) => "compose",
            Transport::Webhook(_) => "webhook",
        }
    }

    pub async fn send(&self, message: &OutgoingMessage) -> Result<Delivery, TransportError> {
        match self {
            Transport::Compose(compose) => Ok(Delivery::Drafted {
                url: compose.draft_url(message),
            }),
            Transport::Webhook(webhook) => webhook.deliver(message).await,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComposeTransport;

impl ComposeTransport {
    pub fn draft_url(&self, message: &OutgoingMessage) -> String {
        mailto_url(message)
    }
}

#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: Client,
    url: String,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn deliver(&self, message: &OutgoingMessage) -> Result<Delivery, TransportError> {
        let response = self.client.post(&self.url).json(message).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(Delivery::Delivered)
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }
}

pub fn mailto_url(message: &OutgoingMessage) -> String {
    let to = message
        .to
        .iter()
        .map(|address| percent_encode(address.trim(), b"@.-_~+"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "mailto:{}?subject={}&body={}",
        to,
        percent_encode(&message.subject, b"-_.~"),
        percent_encode(&message.body, b"-_.~")
    )
}

fn percent_encode(value: &str, keep: &[u8]) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || keep.contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            to: vec!["me@example.com".into(), " coach@example.org ".into()],
            subject: "Weekly ratings report: 2024-01-01 to 2024-01-07".into(),
            body: "Averages\n- Focus: 4.00 & rising".into(),
        }
    }

    #[test]
    fn mailto_encodes_subject_and_body() {
        let url = mailto_url(&message());
        assert_eq!(
            url,
            "mailto:me@example.com,coach@example.org\
             ?subject=Weekly%20ratings%20report%3A%202024-01-01%20to%202024-01-07\
             &body=Averages%0A-%20Focus%3A%204.00%20%26%20rising"
        );
    }

    #[test]
    fn mailto_encodes_non_ascii_as_utf8() {
        let url = mailto_url(&OutgoingMessage {
            to: Vec::new(),
            subject: "é".into(),
            body: String::new(),
        });
        assert_eq!(url, "mailto:?subject=%C3%A9&body=");
    }

    #[tokio::test]
    async fn compose_mode_drafts_without_confirmation() {
        let transport = Transport::Compose(ComposeTransport);
        assert!(!transport.is_confirmable());
        let delivery = transport.send(&message()).await.unwrap();
        assert!(matches!(delivery, Delivery::Drafted { url } if url.starts_with("mailto:")));
    }
}
