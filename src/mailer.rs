// src/mailer.rs

use crate::config::BrevoConfig;
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("Brevo API error {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("no recipients")]
    NoRecipients,
}

pub struct BrevoMailer {
    api_key: String,
    sender_email: String,
    sender_name: String,
    client: Client,
}

#[derive(Serialize)]
struct BrevoSender<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct BrevoRecipient<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoPayload<'a> {
    sender: BrevoSender<'a>,
    to: Vec<BrevoRecipient<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

impl BrevoMailer {
    pub fn new(cfg: &BrevoConfig) -> Result<Self, MailerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MailerError::RequestFailed(e.to_string()))?;
        Ok(Self {
            api_key: cfg.api_key.clone(),
            sender_email: cfg.sender_email.clone(),
            sender_name: cfg.sender_name.clone(),
            client,
        })
    }

    /// Send one transactional email to every address in `recipients`.
    pub fn send_html(
        &self,
        recipients: &[String],
        subject: &str,
        html_content: &str,
    ) -> Result<(), MailerError> {
        if recipients.is_empty() {
            return Err(MailerError::NoRecipients);
        }

        let payload = BrevoPayload {
            sender: BrevoSender {
                name: &self.sender_name,
                email: &self.sender_email,
            },
            to: recipients
                .iter()
                .map(|email| BrevoRecipient { email })
                .collect(),
            subject,
            html_content,
        };

        let resp = self
            .client
            .post(BREVO_SEND_URL)
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .map_err(|e| MailerError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(MailerError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(recipients = recipients.len(), subject, "email sent");
        Ok(())
    }
}
