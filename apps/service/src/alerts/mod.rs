//! Outbound alert transports.
//!
//! The monitoring engine only needs "send this text to that phone"; which
//! provider carries the message is chosen from configuration.

pub mod log;
pub mod twilio;

pub use log::LogTransport;
pub use twilio::TwilioTransport;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AlertProvider, AlertsConfig};

/// Upper bound (exclusive) on the length of an alert message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1600;

/// Number of digits in a destination phone number.
pub const PHONE_DIGITS: usize = 10;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid destination phone number: {0:?}")]
    InvalidDestination(String),

    #[error("message must be non-empty and under {max} characters, got {len}", max = MAX_MESSAGE_CHARS)]
    InvalidMessage { len: usize },

    #[error("alert provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to set up alert transport: {0}")]
    Setup(String),

    #[error("network error while sending alert: {0}")]
    Network(#[from] reqwest::Error),
}

/// Delivers a text message to a phone identifier.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn send(&self, destination: &str, message: &str) -> Result<(), AlertError>;
}

/// Trimmed destination, if it is exactly ten digits.
pub fn validate_destination(destination: &str) -> Result<&str, AlertError> {
    let trimmed = destination.trim();
    if trimmed.len() == PHONE_DIGITS && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        Ok(trimmed)
    } else {
        Err(AlertError::InvalidDestination(destination.to_string()))
    }
}

/// Trimmed message, if it is non-empty and shorter than the SMS limit.
pub fn validate_message(message: &str) -> Result<&str, AlertError> {
    let trimmed = message.trim();
    let len = trimmed.chars().count();
    if (1..MAX_MESSAGE_CHARS).contains(&len) {
        Ok(trimmed)
    } else {
        Err(AlertError::InvalidMessage { len })
    }
}

/// Build the transport selected by `[alerts] provider`.
pub fn build_transport(config: &AlertsConfig) -> Result<Arc<dyn AlertTransport>, AlertError> {
    Ok(match config.provider {
        AlertProvider::Log => Arc::new(LogTransport),
        AlertProvider::Twilio => Arc::new(TwilioTransport::new(&config.twilio)?),
    })
}
