//! Provider traits and the fully composed payloads they deliver.

use serde::Serialize;

use crate::error::ProviderError;

/// A mail ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailEnvelope {
    pub to: String,
    pub from: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// An SMS ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmsEnvelope {
    pub to: String,
    pub body: String,
}

/// A push notification addressed to one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushEnvelope {
    pub device_token: String,
    pub title: String,
    pub body: String,
}

/// Mail delivery back end.
#[async_trait::async_trait]
pub trait MailProvider: Send + Sync {
    async fn send(&self, mail: &MailEnvelope) -> Result<(), ProviderError>;

    /// Human-readable name (e.g. `"smtp"`).
    fn name(&self) -> &str;
}

/// SMS delivery back end.
#[async_trait::async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send(&self, sms: &SmsEnvelope) -> Result<(), ProviderError>;

    fn name(&self) -> &str;
}

/// Push delivery back end for a single platform.
#[async_trait::async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, push: &PushEnvelope) -> Result<(), ProviderError>;

    fn name(&self) -> &str;
}
