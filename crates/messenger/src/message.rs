//! Registered messages and the registry that owns them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use courier_core::{Channel, RenderFormat};

use crate::error::{MsgrError, Result};
use crate::locale::LocaleBundle;
use crate::template_set::{template_file_name, MESSAGE_PURPOSE};

/// Localization key of the mail subject.
pub const MAIL_SUBJECT_KEY: &str = "mail_subject";
/// Older key still honoured when `mail_subject` is absent.
pub const LEGACY_SUBJECT_KEY: &str = "subject";
/// Localization key of the push title.
pub const PUSH_TITLE_KEY: &str = "push_title";

/// Mail envelope fields a message or the messenger may pin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailOptions {
    pub from: Option<String>,
    pub reply_to: Option<String>,
}

impl MailOptions {
    pub fn from_address(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}

/// A named notification: its template directory, mail overrides and
/// message-scoped locale bundle. Immutable once registered.
#[derive(Debug)]
pub struct Message {
    name: String,
    template_path: PathBuf,
    mail_options: MailOptions,
    bundle: Arc<LocaleBundle>,
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(MsgrError::InvalidMessageName(name.to_string()))
    }
}

impl Message {
    /// Build a message whose templates and locales live in
    /// `{templates_root}/{name}`, loading its locale files from disk.
    pub fn load(
        name: &str,
        templates_root: &Path,
        mail_options: MailOptions,
        default_locale: &str,
    ) -> Result<Self> {
        validate_name(name)?;
        let template_path = templates_root.join(name);
        let bundle = LocaleBundle::load_dir(&template_path, default_locale)?;
        Ok(Self {
            name: name.to_string(),
            template_path,
            mail_options,
            bundle: Arc::new(bundle),
        })
    }

    /// Build a message with an empty bundle without touching the filesystem.
    pub fn from_parts(
        name: &str,
        templates_root: &Path,
        mail_options: MailOptions,
        default_locale: &str,
    ) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            template_path: templates_root.join(name),
            mail_options,
            bundle: Arc::new(LocaleBundle::new(default_locale)?),
        })
    }

    /// Replace the message bundle.
    pub fn with_bundle(mut self, bundle: LocaleBundle) -> Self {
        self.bundle = Arc::new(bundle);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn mail_options(&self) -> &MailOptions {
        &self.mail_options
    }

    pub fn bundle(&self) -> &Arc<LocaleBundle> {
        &self.bundle
    }

    pub fn template_file(&self, channel: Channel, format: RenderFormat) -> PathBuf {
        self.template_path
            .join(template_file_name(MESSAGE_PURPOSE, channel, format))
    }

    /// Localized mail subject: `mail_subject`, else `subject`.
    pub fn mail_subject<S: Serialize>(&self, locale: &str, data: &S) -> Result<String> {
        if self.bundle.contains(locale, MAIL_SUBJECT_KEY) {
            return self.bundle.resolve(locale, MAIL_SUBJECT_KEY, data);
        }
        self.bundle
            .resolve(locale, LEGACY_SUBJECT_KEY, data)
            .map_err(|e| match e {
                MsgrError::MissingTranslation { locale, .. } => MsgrError::MissingTranslation {
                    key: MAIL_SUBJECT_KEY.to_string(),
                    locale,
                },
                other => other,
            })
    }

    pub fn push_title<S: Serialize>(&self, locale: &str, data: &S) -> Result<String> {
        self.bundle.resolve(locale, PUSH_TITLE_KEY, data)
    }
}

/// Name → message map. Registration replaces any message of the same name.
///
/// Readers take an `Arc<Message>` snapshot, so registering while sends are
/// in flight never changes a message mid-send.
#[derive(Debug, Default)]
pub struct MessageRegistry {
    messages: RwLock<HashMap<String, Arc<Message>>>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the replaced message, if any.
    pub fn insert(&self, message: Message) -> Option<Arc<Message>> {
        let name = message.name().to_string();
        let replaced = self
            .messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(message));

        if replaced.is_some() {
            warn!(message_name = %name, "message re-registered, previous definition replaced");
        } else {
            info!(message_name = %name, "message registered");
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Result<Arc<Message>> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| MsgrError::UnknownMessage(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.messages.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
