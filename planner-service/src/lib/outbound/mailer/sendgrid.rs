use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::templates::RenderedEmail;
use super::templates::WelcomeTemplate;
use crate::config::MailConfig;
use crate::domain::user::models::WelcomeEmail;
use crate::domain::user::ports::Mailer;
use crate::user::errors::MailerError;

/// Mailer backed by the SendGrid v3 mail-send API.
///
/// Sandbox mode asks SendGrid to validate without delivering. Transport
/// failures and 5xx answers are retried with linear backoff; 4xx answers are
/// not.
pub struct SendGridMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
    sandbox: bool,
    max_retries: u32,
    timeout: Duration,
    backoff: Duration,
    template: WelcomeTemplate,
}

impl SendGridMailer {
    /// # Errors
    /// * `Template` - The welcome template failed to compile
    /// * `Transport` - The HTTP client could not be built
    pub fn new(config: &MailConfig, sandbox: bool, timeout: Duration) -> Result<Self, MailerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
            sandbox,
            max_retries: config.max_retries,
            timeout,
            backoff: Duration::from_secs(1),
            template: WelcomeTemplate::new(config.invitation_expiry_hours)?,
        })
    }

    /// Override the backoff step between attempts.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Worst-case time for one delivery: every attempt timing out plus every
    /// backoff sleep between them.
    pub fn delivery_budget(&self) -> Duration {
        let attempts = self.max_retries + 1;
        let backoff_steps = self.max_retries * (self.max_retries + 1) / 2;
        self.timeout * attempts + self.backoff * backoff_steps
    }

    fn payload<'a>(&'a self, recipient: &'a str, rendered: &'a RenderedEmail) -> MailPayload<'a> {
        MailPayload {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: recipient,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            subject: &rendered.subject,
            content: vec![Content {
                kind: "text/html",
                value: &rendered.html,
            }],
            mail_settings: MailSettings {
                sandbox_mode: SandboxMode {
                    enable: self.sandbox,
                },
            },
        }
    }

    async fn send_once(&self, payload: &MailPayload<'_>) -> Result<(), MailerError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(MailerError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

fn is_retryable(error: &MailerError) -> bool {
    match error {
        MailerError::Transport(_) => true,
        MailerError::Rejected { status } => *status >= 500 || *status == 429,
        MailerError::Template(_) => false,
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send_welcome(&self, email: &WelcomeEmail) -> Result<(), MailerError> {
        let rendered = self.template.render(email)?;
        let payload = self.payload(&email.recipient, &rendered);

        let mut attempt = 0;
        loop {
            match self.send_once(&payload).await {
                Ok(()) => {
                    tracing::info!(sandbox = self.sandbox, attempt, "Welcome email sent");
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(error = %e, attempt, "Welcome email failed, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct MailPayload<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    mail_settings: MailSettings,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct MailSettings {
    sandbox_mode: SandboxMode,
}

#[derive(Debug, Serialize)]
struct SandboxMode {
    enable: bool,
}
