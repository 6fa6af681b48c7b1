//! Provider that logs payloads instead of delivering them.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ProviderError;
use crate::traits::{MailEnvelope, MailProvider, PushEnvelope, PushProvider, SmsEnvelope, SmsProvider};

/// Accepts every payload and logs it at `info`. Usable for any channel.
#[derive(Debug, Default)]
pub struct DryRunProvider {
    accepted: AtomicUsize,
}

impl DryRunProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MailProvider for DryRunProvider {
    async fn send(&self, mail: &MailEnvelope) -> Result<(), ProviderError> {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            channel = "mail",
            to = %mail.to,
            from = %mail.from,
            subject = %mail.subject,
            html_bytes = mail.html.len(),
            text_bytes = mail.text.len(),
            "dry run: mail not sent"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[async_trait::async_trait]
impl SmsProvider for DryRunProvider {
    async fn send(&self, sms: &SmsEnvelope) -> Result<(), ProviderError> {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        tracing::info!(channel = "sms", to = %sms.to, body = %sms.body, "dry run: sms not sent");
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[async_trait::async_trait]
impl PushProvider for DryRunProvider {
    async fn send(&self, push: &PushEnvelope) -> Result<(), ProviderError> {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            channel = "push",
            device = %push.device_token,
            title = %push.title,
            "dry run: push not sent"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
