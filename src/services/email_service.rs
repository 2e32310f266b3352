use reqwest::Client;
use serde::Serialize;

use crate::{config::Config, error::Result};

#[derive(Debug, Clone)]
pub struct EmailService {
    client: Client,
    api_key: Option<String>,
    from_email: String,
}

#[derive(Debug, Serialize)]
struct SendGridEmail {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    subject: String,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    email: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

impl EmailService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.sendgrid_api_key.clone(),
            from_email: config
                .sendgrid_from_email
                .clone()
                .unwrap_or_else(|| "no-reply@linkboard.local".to_string()),
        }
    }

    pub async fn send_password_reset(&self, to_email: &str, reset_link: &str) -> Result<()> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!("Mail disabled, password reset link for {}: {}", to_email, reset_link);
            return Ok(());
        };

        tracing::info!("Sending password reset email to {}", to_email);

        let email = SendGridEmail {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: to_email.to_string(),
                }],
            }],
            from: EmailAddress {
                email: self.from_email.clone(),
            },
            subject: "Reset your password".to_string(),
            content: vec![Content {
                content_type: "text/html".to_string(),
                value: format!(r#"<a href="{}">Reset your password</a>"#, reset_link),
            }],
        };

        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(api_key)
            .json(&email)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::error!("SendGrid returned {} for {}", response.status(), to_email);
        }

        Ok(())
    }
}
