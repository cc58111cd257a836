// src/notify/brevo.rs

use reqwest::blocking::Client;
use serde::Serialize;

use super::{Notification, Notifier, NotifyError};

const BREVO_SMTP_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Sends every notification as a transactional e-mail to a fixed inbox
/// (the sales desk), through Brevo's v3 API.
pub struct BrevoNotifier {
    api_key: String,
    sender_email: String,
    sender_name: String,
    recipient_email: String,
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
    html_content: String,
}

impl BrevoNotifier {
    pub fn new(
        api_key: String,
        sender_email: String,
        sender_name: String,
        recipient_email: String,
    ) -> Self {
        Self {
            api_key,
            sender_email,
            sender_name,
            recipient_email,
            client: Client::new(),
        }
    }

    fn render(notification: &Notification) -> String {
        format!(
            r#"
            <html>
                <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
                    <h2>{subject}</h2>
                    <p>{summary}</p>
                </body>
            </html>
            "#,
            subject = notification.subject(),
            summary = notification.summary()
        )
    }
}

impl Notifier for BrevoNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let subject = notification.subject();
        let payload = BrevoPayload {
            sender: BrevoSender {
                name: &self.sender_name,
                email: &self.sender_email,
            },
            to: vec![BrevoRecipient {
                email: &self.recipient_email,
            }],
            subject: &subject,
            html_content: Self::render(notification),
        };

        let resp = self
            .client
            .post(BREVO_SMTP_URL)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(NotifyError::ApiError(format!("{status} - {body}")));
        }

        Ok(())
    }
}
