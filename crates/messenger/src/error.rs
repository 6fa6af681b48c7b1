//! Error taxonomy for composition and delivery.
//!
//! Fan-out operations never collapse their failures into one opaque value:
//! [`DeliveryErrors`] keeps one entry per failed channel and [`PushErrors`]
//! one entry per failed device, in attempt order.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use courier_core::{Channel, CourierError};

use crate::push::PushPlatform;

/// Failures raised by a delivery back end.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("unsupported platform: {0:?}")]
    UnsupportedPlatform(String),

    #[error("no push provider configured for platform {0}")]
    NoPlatformProvider(PushPlatform),
}

/// Errors surfaced by the messenger.
#[derive(Debug, thiserror::Error)]
pub enum MsgrError {
    #[error("no providers found")]
    NoProviders,

    #[error("no provider configured for channel {0}")]
    NoProviderConfigured(Channel),

    #[error("unknown message: {0}")]
    UnknownMessage(String),

    #[error("invalid message name: {0:?}")]
    InvalidMessageName(String),

    #[error(transparent)]
    Courier(#[from] CourierError),

    #[error("invalid locale tag: {0:?}")]
    InvalidLocale(String),

    #[error("missing translation for {key:?} in locale {locale:?}")]
    MissingTranslation { key: String, locale: String },

    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Template rendering failed: {0}")]
    Render(String),

    #[error("failed to load locale file {}: {reason}", path.display())]
    LocaleFile { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Push(#[from] PushErrors),

    #[error(transparent)]
    Delivery(#[from] DeliveryErrors),
}

pub type Result<T> = std::result::Result<T, MsgrError>;

/// One channel's failure inside a send.
#[derive(Debug)]
pub struct ChannelFailure {
    pub channel: Channel,
    pub error: MsgrError,
}

/// Per-channel failures collected from one send, in channel order.
#[derive(Debug, Default)]
pub struct DeliveryErrors {
    failures: Vec<ChannelFailure>,
}

impl DeliveryErrors {
    pub fn new(failures: Vec<ChannelFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[ChannelFailure] {
        &self.failures
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.failures.iter().map(|f| f.channel).collect()
    }

    /// Error recorded for `channel`, if that channel failed.
    pub fn get(&self, channel: Channel) -> Option<&MsgrError> {
        self.failures
            .iter()
            .find(|f| f.channel == channel)
            .map(|f| &f.error)
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for DeliveryErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delivery failed on {} channel(s)", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", failure.channel, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for DeliveryErrors {}

/// One device's failure inside a push fan-out.
#[derive(Debug)]
pub struct DeviceFailure {
    pub device_token: String,
    pub error: ProviderError,
}

/// Per-device failures collected from one push fan-out, in device order.
#[derive(Debug, Default)]
pub struct PushErrors {
    failures: Vec<DeviceFailure>,
}

impl PushErrors {
    pub fn new(failures: Vec<DeviceFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[DeviceFailure] {
        &self.failures
    }

    pub fn device_tokens(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.device_token.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for PushErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "push send failed for {} device(s)", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", failure.device_token, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for PushErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_delivery_errors_are_ok() {
        assert!(DeliveryErrors::default().into_result().is_ok());
    }

    #[test]
    fn delivery_errors_display_every_channel() {
        let errors = DeliveryErrors::new(vec![
            ChannelFailure {
                channel: Channel::Mail,
                error: MsgrError::NoProviderConfigured(Channel::Mail),
            },
            ChannelFailure {
                channel: Channel::Sms,
                error: MsgrError::Provider(ProviderError::Smtp("refused".into())),
            },
        ]);
        let msg = errors.to_string();
        assert!(msg.starts_with("delivery failed on 2 channel(s): mail:"), "got: {msg}");
        assert!(msg.contains("; sms: SMTP delivery failed: refused"), "got: {msg}");
        assert_eq!(errors.channels(), vec![Channel::Mail, Channel::Sms]);
        assert!(errors.get(Channel::Push).is_none());
    }

    #[test]
    fn push_errors_carry_device_tokens() {
        let errors = PushErrors::new(vec![DeviceFailure {
            device_token: "tok-1".into(),
            error: ProviderError::UnsupportedPlatform("windows".into()),
        }]);
        assert_eq!(errors.device_tokens(), vec!["tok-1"]);
        assert!(errors.to_string().contains("tok-1: unsupported platform"));
    }
}
