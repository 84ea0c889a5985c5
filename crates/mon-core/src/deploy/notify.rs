//! Outcome notifications
//!
//! Delivery is best-effort: a failing channel is logged and reported, and
//! never changes the outcome being announced.

use crate::config::NotificationConfig;
use crate::transport::process::{self, Invocation};
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub success: bool,
    pub environment: String,
}

/// A delivery channel.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, notification: &Notification) -> std::result::Result<(), String>;
}

/// POSTs the notification as JSON.
pub struct WebhookNotifier {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::HttpClient {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    fn send(&self, notification: &Notification) -> std::result::Result<(), String> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("webhook answered HTTP {}", response.status().as_u16()))
        }
    }
}

/// Pipes an RFC 822 message into a local mail command.
pub struct MailNotifier {
    command: String,
    recipients: Vec<String>,
    timeout: Duration,
}

impl MailNotifier {
    pub fn new(command: impl Into<String>, recipients: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            recipients,
            timeout,
        }
    }

    pub fn message(&self, notification: &Notification) -> String {
        format!(
            "From: monforge\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.recipients.join(", "),
            notification.subject,
            Utc::now().to_rfc2822(),
            notification.body.replace('\n', "\r\n"),
        )
    }
}

impl Notifier for MailNotifier {
    fn name(&self) -> &str {
        "mail"
    }

    fn send(&self, notification: &Notification) -> std::result::Result<(), String> {
        let output = process::run(
            Invocation {
                host: "localhost",
                program: "sh",
                args: vec!["-c".into(), self.command.clone()],
                cwd: None,
                stdin: Some(self.message(notification).into_bytes()),
                display: &self.command,
            },
            self.timeout,
        )
        .map_err(|e| e.to_string())?;
        if output.success() {
            Ok(())
        } else {
            Err(format!("'{}' exited with {:?}: {}", self.command, output.code, output.summary()))
        }
    }
}

/// Every configured channel.
#[derive(Default)]
pub struct NotifierSet {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Webhook when `webhook_url` is set, mail when recipients are listed.
    pub fn from_config(config: &NotificationConfig, timeout: Duration) -> Result<Self> {
        let mut set = Self::new();
        if let Some(url) = &config.webhook_url {
            let url = url.resolve("notifications.webhook_url")?;
            set = set.with(Box::new(WebhookNotifier::new(url, timeout)?));
        }
        if !config.email_recipients.is_empty() {
            set = set.with(Box::new(MailNotifier::new(
                config.mail_command.clone(),
                config.email_recipients.clone(),
                timeout,
            )));
        }
        Ok(set)
    }

    pub fn with(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Send through every channel. Returns one message per failed channel.
    pub fn notify(&self, notification: &Notification) -> Vec<String> {
        let mut errors = Vec::new();
        for notifier in &self.notifiers {
            match notifier.send(notification) {
                Ok(()) => tracing::info!(channel = notifier.name(), stage = "notify", "notification sent"),
                Err(message) => {
                    tracing::warn!(channel = notifier.name(), stage = "notify", "notification failed: {}", message);
                    errors.push(format!("{}: {}", notifier.name(), message));
                }
            }
        }
        errors
    }
}
