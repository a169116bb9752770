use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::MailConfig;
use crate::error::SendError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Outbound email dispatch. One attempt per call; no queue, no retry.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), SendError>;
}

/// Posts `{to, subject, text}` as JSON to a mail relay endpoint.
pub struct HttpMailer {
    client: Client,
    endpoint: url::Url,
    token: Option<String>,
}

impl HttpMailer {
    pub fn new(cfg: &MailConfig) -> Result<Self, SendError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, endpoint: cfg.endpoint.clone(), token: cfg.token.clone() })
    }
}

#[async_trait]
impl EmailSender for HttpMailer {
    async fn send(&self, email: &Email) -> Result<(), SendError> {
        let mut req = self.client.post(self.endpoint.clone()).json(email);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.map_err(|e| {
            error!("Error sending email: {e}");
            SendError::Transport(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(%status, "mail relay rejected message");
            return Err(SendError::Rejected { status: status.as_u16(), body });
        }
        info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Stand-in when no relay is configured: logs and reports failure so the
/// user is told the request did not go out.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), SendError> {
        warn!(to = %email.to, subject = %email.subject, text = %email.text, "no mail relay configured, dropping email");
        Err(SendError::NotConfigured)
    }
}

pub fn mailer_from(cfg: Option<&MailConfig>) -> Result<Box<dyn EmailSender>, SendError> {
    Ok(match cfg {
        Some(cfg) => Box::new(HttpMailer::new(cfg)?),
        None => Box::new(LogMailer),
    })
}
