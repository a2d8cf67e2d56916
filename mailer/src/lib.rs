//! Digest delivery over an authenticated SMTP relay.

pub mod gateway;
pub mod relay;

pub use gateway::{DeliveryError, DeliveryGateway, DeliveryReceipt};
pub use relay::{Relay, RelayConfig, RelayError, SmtpRelay};

pub use lettre::message::Mailbox;
pub use lettre::{Address, Message};
