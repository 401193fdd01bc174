use async_trait::async_trait;
use tracing::info;

use super::{AlertError, AlertTransport, validate_message};

/// Writes alerts to the log instead of delivering them.
///
/// Used when no SMS provider is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl AlertTransport for LogTransport {
    async fn send(&self, destination: &str, message: &str) -> Result<(), AlertError> {
        let message = validate_message(message)?;
        info!(destination, message, "Alert (log transport)");
        Ok(())
    }
}
