use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::repository::CodeMailer;
use crate::domain::types::CHALLENGE_TTL_SECS;
use crate::error::MfaServiceError;

/// Transactional email API client (`POST {api_url}` with a bearer key).
#[derive(Clone)]
pub struct HttpCodeMailer {
    pub client: reqwest::Client,
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    text: String,
    html: String,
}

/// Subject, plain-text and HTML bodies for a code email.
pub fn render_code_email(code: &str, expires_at: DateTime<Utc>) -> (String, String, String) {
    let minutes = CHALLENGE_TTL_SECS / 60;
    let until = expires_at.format("%H:%M UTC");
    let subject = format!("Your sign-in code: {code}");
    let text = format!(
        "Your verification code is {code}.\n\n\
         It expires in {minutes} minutes (at {until}). \
         If you did not try to sign in, you can ignore this email."
    );
    let html = format!(
        "<p>Your verification code is</p>\
         <p style=\"font-size:28px;letter-spacing:6px;font-weight:bold\">{code}</p>\
         <p>It expires in {minutes} minutes (at {until}).</p>\
         <p>If you did not try to sign in, you can ignore this email.</p>"
    );
    (subject, text, html)
}

impl CodeMailer for HttpCodeMailer {
    async fn send_code(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), MfaServiceError> {
        let (subject, text, html) = render_code_email(code, expires_at);
        let request = SendEmailRequest {
            from: &self.from,
            to: [email],
            subject,
            text,
            html,
        };
        self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("email API unreachable")
            .and_then(|resp| resp.error_for_status().context("email API rejected request"))
            .map_err(MfaServiceError::DeliveryError)?;
        Ok(())
    }
}
