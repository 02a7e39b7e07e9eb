//! Outbound transactional email through the Resend HTTP API.
//!
//! Email is an optional integration: without an API key the mailer is
//! constructed disabled and every send becomes a logged no-op, so local
//! and test environments run without credentials.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use utleie_config::EmailConfig;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("email provider rejected the request: status {status}, {body}")]
    Api { status: u16, body: String },
}

/// An email ready for dispatch
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Clone)]
pub struct Mailer {
    client: Option<ResendClient>,
    from_address: String,
}

#[derive(Clone)]
struct ResendClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Mailer {
    pub fn from_config(config: &EmailConfig) -> Self {
        let client = config.api_key.as_ref().map(|api_key| {
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_seconds))
                .user_agent("enkel-utleie-backend")
                .build()
                .expect("failed to build email http client");

            ResendClient {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: api_key.clone(),
            }
        });

        if client.is_none() {
            info!("no email api key configured, outbound email disabled");
        }

        Self {
            client,
            from_address: config.from_address.clone(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Send one email. A disabled mailer logs and succeeds.
    pub async fn send(&self, email: &OutboundEmail) -> Result<(), MailerError> {
        let Some(client) = self.client.as_ref() else {
            debug!(to = %email.to, subject = %email.subject, "email disabled, skipping send");
            return Ok(());
        };

        let request = ResendRequest {
            from: &self.from_address,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let response = client
            .http
            .post(format!("{}/emails", client.base_url))
            .bearer_auth(&client.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api { status, body });
        }

        debug!(to = %email.to, subject = %email.subject, "email dispatched");
        Ok(())
    }

    /// Send an email as a side effect of another mutation.
    ///
    /// Delivery problems are logged and swallowed so the triggering
    /// operation still succeeds.
    pub async fn dispatch(&self, email: OutboundEmail) {
        if let Err(error) = self.send(&email).await {
            warn!(to = %email.to, %error, "failed to send email");
        }
    }
}
