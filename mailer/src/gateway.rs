use crate::relay::{Relay, RelayError};
use codequest_core::{Digest, MAX_DIGEST_BYTES};
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::Message;
use serde::Serialize;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

const MAILER_NAME: &str = "CodeQuest Mailer";
const NORMAL_PRIORITY: &str = "3";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Please enter a valid email address: '{0}'")]
    InvalidRecipient(String),
    #[error("No results to send")]
    EmptyDigest,
    #[error(
        "Email content too large ({size} bytes, limit {limit}). \
         Please reduce the number of results."
    )]
    DigestTooLarge { size: usize, limit: usize },
    #[error("mail relay unavailable: {0}")]
    RelayUnavailable(String),
    #[error("mail relay rejected the message: {0}")]
    Rejected(String),
    #[error("could not build message: {0}")]
    Message(String),
}

impl DeliveryError {
    /// True when the caller must fix their input rather than retry.
    pub fn is_validation(&self) -> bool {
        matches!(self, DeliveryError::InvalidRecipient(_) | DeliveryError::EmptyDigest)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub message_id: String,
    /// Rendered HTML size in KiB, two decimals.
    pub size_kb: f64,
}

#[derive(Clone)]
struct XMailer(String);

impl Header for XMailer {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Mailer")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[derive(Clone)]
struct XPriority(String);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// Sends rendered digests through a [`Relay`] shared for the life of the process.
#[derive(Clone)]
pub struct DeliveryGateway {
    relay: Arc<dyn Relay>,
    from: Mailbox,
}

impl DeliveryGateway {
    pub fn new(relay: Arc<dyn Relay>, from: Mailbox) -> Self {
        Self { relay, from }
    }

    /// Validate, verify the relay, then submit exactly once. Nothing is retried.
    pub async fn send(&self, to: &str, digest: &Digest) -> Result<DeliveryReceipt, DeliveryError> {
        let to_mailbox = parse_recipient(to)?;
        if digest.rows.is_empty() {
            return Err(DeliveryError::EmptyDigest);
        }
        // Measured here rather than trusting `byte_size`; the digest's fields are public.
        let size = digest.html_body.len();
        if size > MAX_DIGEST_BYTES {
            return Err(DeliveryError::DigestTooLarge { size, limit: MAX_DIGEST_BYTES });
        }

        self.relay.verify().await.map_err(|e| {
            tracing::warn!(error = %e, "smtp connection verification failed");
            DeliveryError::RelayUnavailable(e.to_string())
        })?;

        let message = self.build_message(to_mailbox, digest)?;
        let header_id = message.headers().get_raw("Message-ID").map(|id| id.trim().to_string());
        let ack = self.relay.submit(message).await.map_err(|e| match e {
            RelayError::Unreachable(detail) | RelayError::Init { detail, .. } => {
                DeliveryError::RelayUnavailable(detail)
            }
            RelayError::Rejected(detail) => DeliveryError::Rejected(detail),
        })?;

        let receipt = DeliveryReceipt {
            message_id: header_id.filter(|id| !id.is_empty()).unwrap_or(ack),
            size_kb: size_kb(size),
        };
        tracing::info!(
            message_id = %receipt.message_id,
            size_kb = receipt.size_kb,
            rows = digest.rows.len(),
            "digest sent"
        );
        Ok(receipt)
    }

    fn build_message(&self, to: Mailbox, digest: &Digest) -> Result<Message, DeliveryError> {
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(digest.subject.clone())
            .message_id(None)
            .header(XPriority(NORMAL_PRIORITY.to_string()))
            .header(XMailer(MAILER_NAME.to_string()))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(digest.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(digest.html_body.clone()),
                    ),
            )
            .map_err(|e| DeliveryError::Message(e.to_string()))
    }
}

fn parse_recipient(to: &str) -> Result<Mailbox, DeliveryError> {
    let to = to.trim();
    if !to.contains('@') {
        return Err(DeliveryError::InvalidRecipient(to.to_string()));
    }
    to.parse().map_err(|_| DeliveryError::InvalidRecipient(to.to_string()))
}

fn size_kb(bytes: usize) -> f64 {
    (bytes as f64 / 1024.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codequest_core::{render_digest, EmailRow, ResultItem, ResultSet, Source};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingRelay {
        reachable: bool,
        /// Returned from `submit` after the attempt is recorded.
        submit_error: Option<RelayError>,
        verifies: Mutex<usize>,
        sent: Mutex<Vec<String>>,
    }

    impl RecordingRelay {
        fn up() -> Arc<Self> {
            Arc::new(Self { reachable: true, ..Self::default() })
        }
        fn down() -> Arc<Self> {
            Arc::new(Self::default())
        }
        fn failing_submit(err: RelayError) -> Arc<Self> {
            Arc::new(Self { reachable: true, submit_error: Some(err), ..Self::default() })
        }
        fn calls(&self) -> (usize, usize) {
            (*self.verifies.lock(), self.sent.lock().len())
        }
    }

    #[async_trait]
    impl Relay for RecordingRelay {
        async fn verify(&self) -> Result<(), RelayError> {
            *self.verifies.lock() += 1;
            if self.reachable {
                Ok(())
            } else {
                Err(RelayError::Unreachable("connection refused".into()))
            }
        }

        async fn submit(&self, message: Message) -> Result<String, RelayError> {
            self.sent.lock().push(String::from_utf8_lossy(&message.formatted()).into_owned());
            match &self.submit_error {
                Some(err) => Err(err.clone()),
                None => Ok("2.0.0".into()),
            }
        }
    }

    fn from() -> Mailbox {
        "CodeQuest Search <digest@codequest.test>".parse().unwrap()
    }

    fn digest() -> Digest {
        let item = ResultItem {
            source: Source::Reddit,
            title: "Pinning explained".into(),
            body: "Pin<&mut T> guarantees...".into(),
            score: 10,
            secondary_metric: 4,
            created_at: 1_700_000_000,
            link: "https://reddit.com/r/rust/1".into(),
        };
        render_digest(&ResultSet::new(vec![item], vec![]), "pin").unwrap()
    }

    #[tokio::test]
    async fn rejects_address_without_at_before_relay() {
        let relay = RecordingRelay::up();
        let gateway = DeliveryGateway::new(relay.clone(), from());
        let err = gateway.send("not-an-email", &digest()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidRecipient(_)));
        assert!(err.is_validation());
        assert_eq!(relay.calls(), (0, 0));
    }

    #[tokio::test]
    async fn rejects_oversize_digest_before_relay() {
        let relay = RecordingRelay::up();
        let gateway = DeliveryGateway::new(relay.clone(), from());
        let mut big = digest();
        big.html_body = "x".repeat(MAX_DIGEST_BYTES + 1);
        big.byte_size = big.html_body.len();
        let err = gateway.send("user@example.com", &big).await.unwrap_err();
        let expected =
            DeliveryError::DigestTooLarge { size: MAX_DIGEST_BYTES + 1, limit: MAX_DIGEST_BYTES };
        assert_eq!(err, expected);
        assert_eq!(relay.calls(), (0, 0));
    }

    #[tokio::test]
    async fn measures_html_instead_of_trusting_byte_size() {
        let relay = RecordingRelay::up();
        let gateway = DeliveryGateway::new(relay.clone(), from());
        let mut big = digest();
        let stale = big.byte_size;
        big.html_body = "x".repeat(MAX_DIGEST_BYTES + 10_000);
        assert_eq!(big.byte_size, stale);

        let err = gateway.send("user@example.com", &big).await.unwrap_err();
        let expected = DeliveryError::DigestTooLarge {
            size: MAX_DIGEST_BYTES + 10_000,
            limit: MAX_DIGEST_BYTES,
        };
        assert_eq!(err, expected);
        assert_eq!(relay.calls(), (0, 0));
    }

    #[tokio::test]
    async fn receipt_size_comes_from_html_body() {
        let relay = RecordingRelay::up();
        let gateway = DeliveryGateway::new(relay.clone(), from());
        let mut d = digest();
        d.html_body = "y".repeat(2048);
        d.byte_size = 0;
        let receipt = gateway.send("user@example.com", &d).await.unwrap();
        assert_eq!(receipt.size_kb, 2.0);
    }

    #[tokio::test]
    async fn relay_rejection_is_reported_without_retry() {
        let relay =
            RecordingRelay::failing_submit(RelayError::Rejected("550 mailbox unavailable".into()));
        let gateway = DeliveryGateway::new(relay.clone(), from());
        let err = gateway.send("user@example.com", &digest()).await.unwrap_err();
        assert_eq!(err, DeliveryError::Rejected("550 mailbox unavailable".into()));
        assert!(!err.is_validation());
        assert_eq!(relay.calls(), (1, 1));
    }

    #[tokio::test]
    async fn connection_lost_during_submit_is_relay_unavailable() {
        let relay =
            RecordingRelay::failing_submit(RelayError::Unreachable("connection reset".into()));
        let gateway = DeliveryGateway::new(relay.clone(), from());
        let err = gateway.send("user@example.com", &digest()).await.unwrap_err();
        assert_eq!(err, DeliveryError::RelayUnavailable("connection reset".into()));
        assert_eq!(relay.calls(), (1, 1));
    }

    #[tokio::test]
    async fn rejects_empty_digest() {
        let relay = RecordingRelay::up();
        let gateway = DeliveryGateway::new(relay.clone(), from());
        let mut empty = digest();
        empty.rows = Vec::<EmailRow>::new();
        let err = gateway.send("user@example.com", &empty).await.unwrap_err();
        assert_eq!(err, DeliveryError::EmptyDigest);
        assert_eq!(relay.calls(), (0, 0));
    }

    #[tokio::test]
    async fn unreachable_relay_aborts_send() {
        let relay = RecordingRelay::down();
        let gateway = DeliveryGateway::new(relay.clone(), from());
        let err = gateway.send("user@example.com", &digest()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::RelayUnavailable(_)));
        assert_eq!(relay.calls(), (1, 0));
    }

    #[tokio::test]
    async fn sends_multipart_message_and_reports_size() {
        let relay = RecordingRelay::up();
        let gateway = DeliveryGateway::new(relay.clone(), from());
        let d = digest();
        let receipt = gateway.send("user@example.com", &d).await.unwrap();

        assert_eq!(relay.calls(), (1, 1));
        assert!(receipt.message_id.starts_with('<') && receipt.message_id.ends_with('>'));
        assert_eq!(receipt.size_kb, size_kb(d.html_body.len()));

        let raw = relay.sent.lock()[0].clone();
        assert!(raw.contains("To: user@example.com"));
        assert!(raw.contains("Subject: Search Results for: pin"));
        assert!(raw.contains("X-Mailer: CodeQuest Mailer"));
        assert!(raw.contains("X-Priority: 3"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains(&format!("Message-ID: {}", receipt.message_id)));
    }

    #[test]
    fn size_rounds_to_two_decimals() {
        assert_eq!(size_kb(1024), 1.0);
        assert_eq!(size_kb(1536), 1.5);
        assert_eq!(size_kb(12_345), 12.06);
    }
}
