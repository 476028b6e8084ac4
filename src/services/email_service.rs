use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};

const BRAND: &str = "BuildTrust Africa";

/// Delivers one HTML message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    email: &'a str,
    subject: &'a str,
    message: &'a str,
    is_html: bool,
    content_type: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct RelayResponse {
    status: Option<String>,
    message: Option<String>,
}

impl RelayResponse {
    fn delivered(&self) -> bool {
        self.status.as_deref() == Some("success")
            || self
                .message
                .as_deref()
                .is_some_and(|m| m.contains("sent successfully"))
    }
}

/// Posts messages to an HTTP mail relay.
#[derive(Clone)]
pub struct HttpEmailSender {
    client: Client,
    api_url: String,
}

impl HttpEmailSender {
    pub fn new(api_url: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, api_url })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .header("X-Email-Format", "html")
            .json(&RelayRequest {
                email: to,
                subject,
                message: html,
                is_html: true,
                content_type: "text/html; charset=UTF-8",
            })
            .send()
            .await?;

        let body: RelayResponse = response.json().await.unwrap_or_default();
        if body.delivered() {
            tracing::info!(subject, "email sent");
            Ok(())
        } else {
            tracing::error!(subject, relay_message = ?body.message, "mail relay refused message");
            Err(Error::Internal("Failed to send email".into()))
        }
    }
}

/// Used when no relay is configured; messages only reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyEmailSender;

#[async_trait]
impl EmailSender for LogOnlyEmailSender {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<()> {
        tracing::info!(to, subject, "email relay not configured; skipping delivery");
        Ok(())
    }
}

/// Account emails rendered with links back to the front end.
#[derive(Clone)]
pub struct EmailService {
    sender: Arc<dyn EmailSender>,
    frontend_url: String,
}

impl EmailService {
    pub fn new(sender: Arc<dyn EmailSender>, frontend_url: String) -> Self {
        Self {
            sender,
            frontend_url,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let sender: Arc<dyn EmailSender> = match &config.email_api_url {
            Some(url) => Arc::new(HttpEmailSender::new(url.clone())?),
            None => Arc::new(LogOnlyEmailSender),
        };
        Ok(Self::new(sender, config.frontend_url.clone()))
    }

    pub async fn send_verification(&self, to: &str, token: &str) -> Result<()> {
        let link = action_link(&self.frontend_url, "verify-email", token);
        let html = render(
            "Verify Your Email",
            "Thank you for signing up. Please confirm your email address to get started.",
            "Verify Email Address",
            &link,
            token,
            "This link expires in 24 hours. If you didn't request this, please ignore this email.",
        );
        self.sender
            .send(to, &format!("Verify Your Email - {}", BRAND), &html)
            .await
    }

    pub async fn send_password_reset(&self, to: &str, token: &str) -> Result<()> {
        let link = action_link(&self.frontend_url, "reset-password", token);
        let html = render(
            "Reset Your Password",
            "We received a request to reset your password. If this was not you, ignore this email and do not share the link.",
            "Reset Password",
            &link,
            token,
            "This link expires in 1 hour.",
        );
        self.sender
            .send(to, &format!("Reset Your Password - {}", BRAND), &html)
            .await
    }
}

/// `{frontend}/{page}?token=...`, with the token query-encoded.
pub fn action_link(frontend_url: &str, page: &str, token: &str) -> String {
    let base = format!("{}/{}", frontend_url.trim_end_matches('/'), page);
    match Url::parse(&base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("token", token);
            url.to_string()
        }
        Err(_) => format!("{}?token={}", base, token),
    }
}

fn render(title: &str, intro: &str, button: &str, link: &str, token: &str, footer: &str) -> String {
    format!(
        r#"<div style="max-width:600px;margin:0 auto;padding:20px;font-family:Arial,sans-serif;">
  <div style="background:#226F75;color:#fff;padding:32px 20px;text-align:center;border-radius:8px 8px 0 0;">
    <h1 style="margin:0 0 8px 0;font-size:26px;">{title}</h1>
    <p style="margin:0;font-size:14px;">{brand}</p>
  </div>
  <div style="background:#f8f9fa;padding:32px 20px;color:#555;font-size:15px;">
    <p>{intro}</p>
    <p style="text-align:center;">
      <a href="{link}" style="display:inline-block;background:#226F75;color:#fff;padding:14px 40px;text-decoration:none;border-radius:6px;font-weight:600;">{button}</a>
    </p>
    <p style="text-align:center;font-size:12px;word-break:break-all;color:#226F75;">{link}</p>
    <p style="font-size:13px;">Or enter this code manually:</p>
    <div style="background:#f0f0f0;padding:10px;border-radius:4px;font-family:monospace;word-break:break-all;">{token}</div>
  </div>
  <div style="padding:24px 20px;text-align:center;font-size:13px;color:#888;">
    <p>{footer}</p>
    <p><strong>{brand}</strong></p>
  </div>
</div>"#,
        title = title,
        brand = BRAND,
        intro = intro,
        link = link,
        button = button,
        token = token,
        footer = footer,
    )
}
