use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("smtp relay init failed for '{host}': {detail}")]
    Init { host: String, detail: String },
    #[error("smtp relay unreachable: {0}")]
    Unreachable(String),
    #[error("smtp send failed: {0}")]
    Rejected(String),
}

/// A mail submission service. Implementations own their connection handling.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Check the relay accepts connections and credentials.
    async fn verify(&self) -> Result<(), RelayError>;

    /// Submit one message; returns the relay's acknowledgement text.
    async fn submit(&self, message: Message) -> Result<String, RelayError>;
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Upper bound on pooled SMTP connections.
    pub pool_size: u32,
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            username: String::new(),
            password: String::new(),
            pool_size: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Implicit-TLS SMTP submission with a bounded connection pool.
///
/// Build one per process and share it; connections are reused across sends and
/// closed when the last handle is dropped.
#[derive(Clone)]
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpRelay {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| RelayError::Init { host: config.host.clone(), detail: e.to_string() })?;
        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .timeout(Some(config.timeout))
            .pool_config(PoolConfig::new().max_size(config.pool_size))
            .build();
        tracing::info!(
            host = %config.host,
            port = config.port,
            pool_size = config.pool_size,
            "smtp relay configured"
        );
        Ok(Self { transport, host: config.host.clone() })
    }
}

#[async_trait]
impl Relay for SmtpRelay {
    async fn verify(&self) -> Result<(), RelayError> {
        match self.transport.test_connection().await {
            Ok(true) => {
                tracing::debug!(host = %self.host, "smtp connection verified");
                Ok(())
            }
            Ok(false) => Err(RelayError::Unreachable(format!(
                "'{}' did not accept the connection",
                self.host
            ))),
            Err(e) => Err(RelayError::Unreachable(format!("'{}': {}", self.host, e))),
        }
    }

    async fn submit(&self, message: Message) -> Result<String, RelayError> {
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| RelayError::Rejected(e.to_string()))?;
        Ok(response
            .first_word()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| "smtp-ack".to_string()))
    }
}
