use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::models::link::Answer;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Outbound email capability. Delivery is best-effort: callers log failures
/// and never surface them as request failures.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

pub struct Notification {
    pub subject: String,
    pub html_body: String,
}

/// Builds the message sent to the requester once the recipient has answered.
/// Content branches on the answer and interpolates the display name when one
/// was given.
pub fn compose_notification(answer: Answer, name: Option<&str>) -> Notification {
    let subject = match name {
        Some(name) => format!("{name} responded 💌"),
        None => "They responded 💌".to_string(),
    };

    let html_body = match answer {
        Answer::Yes => {
            let name_line = match name {
                Some(name) => {
                    format!("{name} said <strong style=\"color: #10b981;\">YES</strong> ❤️")
                }
                None => "They said <strong style=\"color: #10b981;\">YES</strong>!".to_string(),
            };
            format!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #ec4899;">Great news! 🎉</h2>
  <p style="font-size: 16px; line-height: 1.6; color: #333;">
    {name_line}
  </p>
  <p style="font-size: 16px; line-height: 1.6; color: #333;">
    Time to plan that perfect date! 💕
  </p>
  <div style="margin-top: 30px; padding-top: 20px; border-top: 1px solid #e5e7eb; color: #6b7280; font-size: 14px;">
    <p>This link will expire in 7 days.</p>
  </div>
</div>"#
            )
        }
        Answer::No => {
            let name_line = match name {
                Some(name) => format!("{name} said <strong style=\"color: #ef4444;\">NO</strong>."),
                None => "They said <strong style=\"color: #ef4444;\">NO</strong>.".to_string(),
            };
            format!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #6366f1;">They responded</h2>
  <p style="font-size: 16px; line-height: 1.6; color: #333;">
    Unfortunately, {name_line}
  </p>
  <p style="font-size: 16px; line-height: 1.6; color: #333;">
    Don't worry, there are plenty of fish in the sea! 🌊
  </p>
  <div style="margin-top: 30px; padding-top: 20px; border-top: 1px solid #e5e7eb; color: #6b7280; font-size: 14px;">
    <p>This link will expire in 7 days.</p>
  </div>
</div>"#
            )
        }
    };

    Notification { subject, html_body }
}

/// Resend HTTP API client.
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: SecretString,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: SecretString, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl NotificationSender for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .post(RESEND_ENDPOINT)
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html_body,
            }))
            .send()
            .await?;

        response.error_for_status()?;
        Ok(())
    }
}
