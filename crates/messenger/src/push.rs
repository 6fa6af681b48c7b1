//! Push fan-out: one composed title/body to many devices.
//!
//! Each device is routed by its platform tag to that platform's provider.
//! All devices are attempted; an unknown tag, a platform without a
//! provider, a provider error or a timeout only fails that device.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::{DeviceFailure, ProviderError, PushErrors};
use crate::traits::{PushEnvelope, PushProvider};

/// Platforms with a dedicated push provider slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushPlatform {
    Apple,
    Google,
}

impl PushPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushPlatform::Apple => "apple",
            PushPlatform::Google => "google",
        }
    }
}

impl fmt::Display for PushPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PushPlatform {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apple" => Ok(PushPlatform::Apple),
            "google" => Ok(PushPlatform::Google),
            _ => Err(ProviderError::UnsupportedPlatform(s.to_string())),
        }
    }
}

/// A push target. The platform stays a raw tag so callers can pass
/// through whatever their device registry stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushDevice {
    pub token: String,
    pub platform: String,
}

impl PushDevice {
    pub fn new(token: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            platform: platform.into(),
        }
    }

    pub fn apple(token: impl Into<String>) -> Self {
        Self::new(token, PushPlatform::Apple.as_str())
    }

    pub fn google(token: impl Into<String>) -> Self {
        Self::new(token, PushPlatform::Google.as_str())
    }
}

/// Per-platform push providers.
#[derive(Clone, Default)]
pub struct PushProviders {
    apple: Option<Arc<dyn PushProvider>>,
    google: Option<Arc<dyn PushProvider>>,
    timeout: Option<Duration>,
}

impl fmt::Debug for PushProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushProviders")
            .field("apple", &self.apple.as_ref().map(|p| p.name().to_string()))
            .field("google", &self.google.as_ref().map(|p| p.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PushProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apple(mut self, provider: Arc<dyn PushProvider>) -> Self {
        self.apple = Some(provider);
        self
    }

    pub fn with_google(mut self, provider: Arc<dyn PushProvider>) -> Self {
        self.google = Some(provider);
        self
    }

    /// Deadline for each device send.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn provider(&self, platform: PushPlatform) -> Option<&Arc<dyn PushProvider>> {
        match platform {
            PushPlatform::Apple => self.apple.as_ref(),
            PushPlatform::Google => self.google.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.apple.is_none() && self.google.is_none()
    }

    /// Send `title`/`body` to every device concurrently.
    ///
    /// Failures are returned in device order, each tagged with its token.
    pub async fn send(&self, devices: &[PushDevice], title: &str, body: &str) -> Result<(), PushErrors> {
        let outcomes = join_all(devices.iter().map(|device| self.send_one(device, title, body))).await;

        let failures: Vec<DeviceFailure> = devices
            .iter()
            .zip(outcomes)
            .filter_map(|(device, outcome)| {
                outcome.err().map(|error| {
                    tracing::warn!(
                        device = %device.token,
                        platform = %device.platform,
                        error = %error,
                        "push delivery failed"
                    );
                    DeviceFailure {
                        device_token: device.token.clone(),
                        error,
                    }
                })
            })
            .collect();

        tracing::debug!(
            devices = devices.len(),
            failed = failures.len(),
            "push fan-out finished"
        );

        PushErrors::new(failures).into_result()
    }

    async fn send_one(&self, device: &PushDevice, title: &str, body: &str) -> Result<(), ProviderError> {
        let platform: PushPlatform = device.platform.parse()?;
        let provider = self
            .provider(platform)
            .ok_or(ProviderError::NoPlatformProvider(platform))?;

        let envelope = PushEnvelope {
            device_token: device.token.clone(),
            title: title.to_string(),
            body: body.to_string(),
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, provider.send(&envelope))
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => provider.send(&envelope).await,
        }
    }
}
