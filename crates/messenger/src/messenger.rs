//! The messenger: configuration, providers, registry and layout bundle.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use courier_core::config::{Config, MessengerSettings};
use courier_core::MessageData;

use crate::compose::{Composer, MailContent, PushContent, SmsContent};
use crate::email::SmtpMailProvider;
use crate::error::{MsgrError, Result};
use crate::locale::{normalize_locale, LocaleBundle};
use crate::message::{MailOptions, Message, MessageRegistry};
use crate::push::PushProviders;
use crate::templating::{Inliner, PassthroughInliner, Renderer, TemplateRenderer};
use crate::traits::{MailProvider, SmsProvider};
use crate::webhook::WebhookProvider;

/// Sender used when neither the request, the message nor the messenger set one.
pub const DEFAULT_FROM: &str = "noreply@localhost";

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable messenger configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct MessengerConfig {
    pub templates_root: PathBuf,
    pub default_locale: String,
    /// Messenger-wide mail defaults, below per-message options.
    pub mail: MailOptions,
    /// Data merged under every send's data.
    pub layout_data: MessageData,
    pub provider_timeout: Duration,
}

impl MessengerConfig {
    pub fn new(templates_root: impl Into<PathBuf>) -> Self {
        Self {
            templates_root: templates_root.into(),
            default_locale: "en".to_string(),
            mail: MailOptions::default(),
            layout_data: MessageData::new(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn from_settings(settings: &MessengerSettings) -> Self {
        Self {
            templates_root: settings.templates_root.clone(),
            default_locale: settings.default_locale.clone(),
            mail: MailOptions {
                from: settings.mail_from.clone(),
                reply_to: settings.mail_reply_to.clone(),
            },
            layout_data: MessageData::new(),
            provider_timeout: Duration::from_secs(settings.provider_timeout_secs),
        }
    }

    pub fn default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    pub fn mail(mut self, mail: MailOptions) -> Self {
        self.mail = mail;
        self
    }

    pub fn layout_data(mut self, data: MessageData) -> Self {
        self.layout_data = data;
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }
}

/// Delivery back ends, shared with the caller.
#[derive(Clone, Default)]
pub struct Providers {
    pub mail: Option<Arc<dyn MailProvider>>,
    pub sms: Option<Arc<dyn SmsProvider>>,
    pub push: Option<PushProviders>,
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Providers")
            .field("mail", &self.mail.as_ref().map(|p| p.name().to_string()))
            .field("sms", &self.sms.as_ref().map(|p| p.name().to_string()))
            .field("push", &self.push)
            .finish()
    }
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mail(mut self, provider: Arc<dyn MailProvider>) -> Self {
        self.mail = Some(provider);
        self
    }

    pub fn with_sms(mut self, provider: Arc<dyn SmsProvider>) -> Self {
        self.sms = Some(provider);
        self
    }

    pub fn with_push(mut self, providers: PushProviders) -> Self {
        self.push = Some(providers);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mail.is_none() && self.sms.is_none() && self.push.as_ref().map_or(true, PushProviders::is_empty)
    }

    /// Build the SMTP mailer and webhook relays the config describes.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut providers = Self::new();

        if let Some(host) = &config.smtp.host {
            providers.mail = Some(Arc::new(SmtpMailProvider::from_config(
                host,
                config.smtp.port,
                config.smtp.tls,
            )?));
        }

        if let Some(url) = &config.sms.webhook_url {
            providers.sms = Some(Arc::new(WebhookProvider::from_config("sms", url.clone(), None, None, None)?));
        }

        let mut push = PushProviders::new();
        if let Some(url) = &config.push.apple_webhook_url {
            push = push.with_apple(Arc::new(WebhookProvider::from_config(
                "apple", url.clone(), None, None, None,
            )?));
        }
        if let Some(url) = &config.push.google_webhook_url {
            push = push.with_google(Arc::new(WebhookProvider::from_config(
                "google", url.clone(), None, None, None,
            )?));
        }
        if !push.is_empty() {
            providers.push = Some(push);
        }

        Ok(providers)
    }
}

/// Options for [`Messenger::add_message`].
#[derive(Debug, Clone, Default)]
pub struct AddMessageOptions {
    /// Unique name; also the template sub-directory.
    pub name: String,
    pub mail: MailOptions,
}

impl AddMessageOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mail: MailOptions::default(),
        }
    }

    pub fn mail(mut self, mail: MailOptions) -> Self {
        self.mail = mail;
        self
    }
}

/// Composes registered messages and delivers them through its providers.
pub struct Messenger {
    pub(crate) config: MessengerConfig,
    pub(crate) registry: MessageRegistry,
    pub(crate) layout_bundle: Arc<LocaleBundle>,
    pub(crate) providers: Providers,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) inliner: Arc<dyn Inliner>,
}

impl fmt::Debug for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("config", &self.config)
            .field("messages", &self.registry.names())
            .field("providers", &self.providers)
            .finish()
    }
}

impl Messenger {
    /// Create a messenger, loading the layout locale bundle from the
    /// templates root.
    ///
    /// Fails with [`MsgrError::NoProviders`] when no provider is supplied
    /// and [`MsgrError::InvalidLocale`] for a malformed default locale.
    pub fn new(config: MessengerConfig, providers: Providers) -> Result<Self> {
        if providers.is_empty() {
            return Err(MsgrError::NoProviders);
        }

        let mut config = config;
        config.default_locale = normalize_locale(&config.default_locale)?;

        let layout_bundle = LocaleBundle::load_dir(&config.templates_root, &config.default_locale)?;

        let mut providers = providers;
        providers.push = providers.push.map(|push| match push.timeout() {
            Some(_) => push,
            None => push.with_timeout(config.provider_timeout),
        });

        info!(
            templates_root = %config.templates_root.display(),
            default_locale = %config.default_locale,
            layout_locales = ?layout_bundle.locales(),
            "messenger ready"
        );

        Ok(Self {
            config,
            registry: MessageRegistry::new(),
            layout_bundle: Arc::new(layout_bundle),
            providers,
            renderer: Arc::new(TemplateRenderer::new()),
            inliner: Arc::new(PassthroughInliner),
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_inliner(mut self, inliner: Arc<dyn Inliner>) -> Self {
        self.inliner = inliner;
        self
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    pub fn layout_bundle(&self) -> &Arc<LocaleBundle> {
        &self.layout_bundle
    }

    /// Register (or replace) a message, loading its locale files from
    /// `{templates_root}/{name}`.
    pub fn add_message(&self, opts: AddMessageOptions) -> Result<()> {
        let message = Message::load(
            &opts.name,
            &self.config.templates_root,
            opts.mail,
            &self.config.default_locale,
        )?;
        self.registry.insert(message);
        Ok(())
    }

    /// Register an already built message.
    pub fn insert_message(&self, message: Message) {
        self.registry.insert(message);
    }

    pub fn message(&self, name: &str) -> Result<Arc<Message>> {
        self.registry.get(name)
    }

    pub fn message_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Requested locale, normalized, or the default when unset or blank.
    pub fn resolve_locale(&self, requested: Option<&str>) -> Result<String> {
        match requested.map(str::trim).filter(|l| !l.is_empty()) {
            Some(locale) => normalize_locale(locale),
            None => Ok(self.config.default_locale.clone()),
        }
    }

    pub fn composer(&self) -> Composer<'_> {
        Composer {
            templates_root: &self.config.templates_root,
            layout_data: &self.config.layout_data,
            layout_bundle: &self.layout_bundle,
            renderer: self.renderer.as_ref(),
            inliner: self.inliner.as_ref(),
        }
    }

    pub fn compose_mail(&self, name: &str, locale: Option<&str>, data: &MessageData) -> Result<MailContent> {
        let message = self.message(name)?;
        let locale = self.resolve_locale(locale)?;
        self.composer().compose_mail(&message, &locale, data)
    }

    pub fn compose_sms(&self, name: &str, locale: Option<&str>, data: &MessageData) -> Result<SmsContent> {
        let message = self.message(name)?;
        let locale = self.resolve_locale(locale)?;
        self.composer().compose_sms(&message, &locale, data)
    }

    pub fn compose_push(&self, name: &str, locale: Option<&str>, data: &MessageData) -> Result<PushContent> {
        let message = self.message(name)?;
        let locale = self.resolve_locale(locale)?;
        self.composer().compose_push(&message, &locale, data)
    }
}
