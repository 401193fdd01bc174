use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{AlertError, AlertTransport, validate_destination, validate_message};
use crate::config::TwilioConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends alerts as SMS through the Twilio Messages API.
pub struct TwilioTransport {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_phone: String,
    api_base: String,
}

impl TwilioTransport {
    pub fn new(config: &TwilioConfig) -> Result<Self, AlertError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AlertError::Setup(format!("failed to build HTTP client: {e}")))?;

        Self::with_client(config, client)
    }

    fn with_client(config: &TwilioConfig, client: Client) -> Result<Self, AlertError> {
        Url::parse(&config.api_base).map_err(|e| {
            AlertError::Setup(format!("invalid Twilio api_base {:?}: {e}", config.api_base))
        })?;

        Ok(Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_phone: config.from_phone.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Messages.json", self.api_base, self.account_sid)
    }

    /// Form body of a Messages request. Destinations are North American
    /// numbers without the country code.
    fn form(&self, destination: &str, message: &str) -> [(&'static str, String); 3] {
        [
            ("From", self.from_phone.clone()),
            ("To", format!("+1{destination}")),
            ("Body", message.to_string()),
        ]
    }
}

#[async_trait]
impl AlertTransport for TwilioTransport {
    async fn send(&self, destination: &str, message: &str) -> Result<(), AlertError> {
        let destination = validate_destination(destination)?;
        let message = validate_message(message)?;

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&self.form(destination, message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::Rejected { status: status.as_u16(), body });
        }

        debug!(destination, status = status.as_u16(), "Twilio accepted message");
        Ok(())
    }
}
