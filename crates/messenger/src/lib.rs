//! Notification composition and dispatch.
//!
//! This crate provides:
//! - `Messenger` holding configuration, providers and the message registry
//! - Locale bundles and template-set resolution for layered minijinja templates
//! - A compose engine producing mail, SMS and push content
//! - `Messenger::send`, which delivers across channels concurrently and
//!   reports per-channel failures
//! - Push fan-out with per-device failures
//! - SMTP and HTTP relay providers, plus a dry-run provider
//! - Preview export of composed content to HTML files

pub mod compose;
pub mod dispatcher;
pub mod dry_run;
pub mod email;
pub mod error;
pub mod locale;
pub mod message;
pub mod messenger;
pub mod preview;
pub mod push;
pub mod template_set;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use compose::{ComposedContent, MailContent, PushContent, SmsContent};
pub use courier_core::{Channel, MessageData, RenderFormat};
pub use dispatcher::{MailOverrides, SendRequest};
pub use dry_run::DryRunProvider;
pub use email::SmtpMailProvider;
pub use error::{ChannelFailure, DeliveryErrors, DeviceFailure, MsgrError, ProviderError, PushErrors, Result};
pub use locale::LocaleBundle;
pub use message::{MailOptions, Message, MessageRegistry};
pub use messenger::{AddMessageOptions, Messenger, MessengerConfig, Providers, DEFAULT_FROM};
pub use preview::{preview_message, PreviewOptions};
pub use push::{PushDevice, PushPlatform, PushProviders};
pub use traits::{MailEnvelope, MailProvider, PushEnvelope, PushProvider, SmsEnvelope, SmsProvider};
pub use webhook::WebhookProvider;
