//! Routes a send request to every channel it asks for.
//!
//! Each requested channel composes and delivers independently; the three
//! pipelines run concurrently and are joined before returning. A failure
//! in one channel never prevents another channel's attempt, so a single
//! send can partially succeed. Failures come back as one
//! [`DeliveryErrors`] listing each failed channel in mail, sms, push order.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use courier_core::{Channel, MessageData};

use crate::error::{ChannelFailure, DeliveryErrors, MsgrError, ProviderError, Result};
use crate::message::Message;
use crate::messenger::{Messenger, DEFAULT_FROM};
use crate::push::PushDevice;
use crate::traits::{MailEnvelope, SmsEnvelope};

/// Request-level mail overrides; each beats every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailOverrides {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub reply_to: Option<String>,
}

/// One logical send. A channel is requested by filling its recipient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendRequest {
    pub message: String,
    pub mail_to: Option<String>,
    pub sms_to: Option<String>,
    #[serde(default)]
    pub push_to: Vec<PushDevice>,
    #[serde(default)]
    pub data: MessageData,
    pub locale: Option<String>,
    #[serde(default)]
    pub mail: MailOverrides,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl SendRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn mail_to(mut self, to: impl Into<String>) -> Self {
        self.mail_to = Some(to.into());
        self
    }

    pub fn sms_to(mut self, to: impl Into<String>) -> Self {
        self.sms_to = Some(to.into());
        self
    }

    pub fn push_to(mut self, devices: Vec<PushDevice>) -> Self {
        self.push_to = devices;
        self
    }

    pub fn data(mut self, data: MessageData) -> Self {
        self.data = data;
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.mail.subject = Some(subject.into());
        self
    }

    /// Channels this request targets, in dispatch order.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = Vec::with_capacity(3);
        if non_blank(&self.mail_to).is_some() {
            channels.push(Channel::Mail);
        }
        if non_blank(&self.sms_to).is_some() {
            channels.push(Channel::Sms);
        }
        if !self.push_to.is_empty() {
            channels.push(Channel::Push);
        }
        channels
    }
}

/// Await one channel pipeline, returning its outcome and elapsed milliseconds.
async fn timed<F>(pipeline: F) -> (Result<()>, u64)
where
    F: Future<Output = Result<()>>,
{
    let start = Instant::now();
    let outcome = pipeline.await;
    (outcome, start.elapsed().as_millis() as u64)
}

impl Messenger {
    /// Compose and deliver `request` on every channel it targets.
    ///
    /// An unknown message or malformed locale fails the whole call before
    /// any channel is attempted. Otherwise every requested channel is
    /// attempted and failures are returned together as
    /// [`MsgrError::Delivery`].
    pub async fn send(&self, request: &SendRequest) -> Result<()> {
        let message = self.message(&request.message)?;
        let locale = self.resolve_locale(request.locale.as_deref())?;

        let channels = request.channels();
        if channels.is_empty() {
            tracing::debug!(message_name = %request.message, "send request targets no channel");
            return Ok(());
        }

        let mail = async {
            match non_blank(&request.mail_to) {
                Some(to) => Some(timed(self.send_mail(&message, &locale, to, request)).await),
                None => None,
            }
        };
        let sms = async {
            match non_blank(&request.sms_to) {
                Some(to) => Some(timed(self.send_sms(&message, &locale, to, &request.data)).await),
                None => None,
            }
        };
        let push = async {
            if request.push_to.is_empty() {
                None
            } else {
                Some(timed(self.send_push(&message, &locale, request)).await)
            }
        };

        let (mail, sms, push) = tokio::join!(mail, sms, push);

        let mut failures = Vec::new();
        for (channel, outcome) in [(Channel::Mail, mail), (Channel::Sms, sms), (Channel::Push, push)] {
            match outcome {
                Some((Ok(()), duration_ms)) => {
                    tracing::info!(
                        message_name = %request.message,
                        %channel,
                        %locale,
                        duration_ms,
                        "notification delivered"
                    );
                }
                Some((Err(error), duration_ms)) => {
                    tracing::warn!(
                        message_name = %request.message,
                        %channel,
                        %locale,
                        error = %error,
                        duration_ms,
                        "notification delivery failed"
                    );
                    failures.push(ChannelFailure { channel, error });
                }
                None => {}
            }
        }

        DeliveryErrors::new(failures).into_result()?;
        Ok(())
    }

    async fn send_mail(&self, message: &Message, locale: &str, to: &str, request: &SendRequest) -> Result<()> {
        let provider = self
            .providers
            .mail
            .as_ref()
            .ok_or(MsgrError::NoProviderConfigured(Channel::Mail))?;

        let content = self.composer().compose_mail(message, locale, &request.data)?;

        let defaults = &self.config.mail;
        let from = request
            .mail
            .from
            .clone()
            .or_else(|| message.mail_options().from.clone())
            .or_else(|| defaults.from.clone())
            .unwrap_or_else(|| DEFAULT_FROM.to_string());
        let reply_to = request
            .mail
            .reply_to
            .clone()
            .or_else(|| message.mail_options().reply_to.clone())
            .or_else(|| defaults.reply_to.clone());

        let envelope = MailEnvelope {
            to: to.to_string(),
            from,
            reply_to,
            subject: request.mail.subject.clone().unwrap_or(content.subject),
            html: content.html,
            text: content.text,
        };

        self.deliver(provider.send(&envelope)).await
    }

    async fn send_sms(&self, message: &Message, locale: &str, to: &str, data: &MessageData) -> Result<()> {
        let provider = self
            .providers
            .sms
            .as_ref()
            .ok_or(MsgrError::NoProviderConfigured(Channel::Sms))?;

        let content = self.composer().compose_sms(message, locale, data)?;
        let envelope = SmsEnvelope {
            to: to.to_string(),
            body: content.body,
        };

        self.deliver(provider.send(&envelope)).await
    }

    async fn send_push(&self, message: &Message, locale: &str, request: &SendRequest) -> Result<()> {
        let providers = self
            .providers
            .push
            .as_ref()
            .filter(|p| !p.is_empty())
            .ok_or(MsgrError::NoProviderConfigured(Channel::Push))?;

        let content = self.composer().compose_push(message, locale, &request.data)?;

        // Deadlines apply per device inside the fan-out.
        providers
            .send(&request.push_to, &content.title, &content.body)
            .await?;
        Ok(())
    }

    /// Run one provider call under the configured deadline.
    async fn deliver<F>(&self, call: F) -> Result<()>
    where
        F: Future<Output = std::result::Result<(), ProviderError>>,
    {
        let limit = self.config.provider_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| ProviderError::Timeout(limit))??;
        Ok(())
    }
}
