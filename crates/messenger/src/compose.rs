//! Compose engine: merged data + template sets + locale bundles → channel content.
//!
//! Bodies come from template files; the mail subject and push title are
//! plain localization lookups against the message bundle. The composer
//! only borrows read-only messenger state and may be used concurrently.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use courier_core::{Channel, MessageData, RenderFormat};

use crate::error::Result;
use crate::locale::LocaleBundle;
use crate::message::Message;
use crate::template_set::TemplateSet;
use crate::templating::{Inliner, RenderRequest, Renderer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmsContent {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushContent {
    pub title: String,
    pub body: String,
}

/// Channel-shaped output of one composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum ComposedContent {
    Mail(MailContent),
    Sms(SmsContent),
    Push(PushContent),
}

impl ComposedContent {
    pub fn channel(&self) -> Channel {
        match self {
            ComposedContent::Mail(_) => Channel::Mail,
            ComposedContent::Sms(_) => Channel::Sms,
            ComposedContent::Push(_) => Channel::Push,
        }
    }
}

/// Layout data overlaid with request data; request keys win.
pub fn merge_data(layout: &MessageData, data: &MessageData) -> MessageData {
    let mut merged = layout.clone();
    merged.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Borrowed view of the messenger state composition needs.
pub struct Composer<'a> {
    pub(crate) templates_root: &'a Path,
    pub(crate) layout_data: &'a MessageData,
    pub(crate) layout_bundle: &'a Arc<LocaleBundle>,
    pub(crate) renderer: &'a dyn Renderer,
    pub(crate) inliner: &'a dyn Inliner,
}

impl<'a> Composer<'a> {
    pub fn compose(
        &self,
        message: &Message,
        channel: Channel,
        locale: &str,
        data: &MessageData,
    ) -> Result<ComposedContent> {
        Ok(match channel {
            Channel::Mail => ComposedContent::Mail(self.compose_mail(message, locale, data)?),
            Channel::Sms => ComposedContent::Sms(self.compose_sms(message, locale, data)?),
            Channel::Push => ComposedContent::Push(self.compose_push(message, locale, data)?),
        })
    }

    pub fn compose_mail(&self, message: &Message, locale: &str, data: &MessageData) -> Result<MailContent> {
        let merged = merge_data(self.layout_data, data);

        let subject = message.mail_subject(locale, &merged)?;
        let html = self.render(message, Channel::Mail, RenderFormat::Html, locale, &merged)?;
        let html = self.inliner.inline(html)?;
        let text = self.render(message, Channel::Mail, RenderFormat::Text, locale, &merged)?;

        Ok(MailContent { subject, html, text })
    }

    pub fn compose_sms(&self, message: &Message, locale: &str, data: &MessageData) -> Result<SmsContent> {
        let merged = merge_data(self.layout_data, data);
        let body = self.render(message, Channel::Sms, RenderFormat::Text, locale, &merged)?;
        Ok(SmsContent { body })
    }

    pub fn compose_push(&self, message: &Message, locale: &str, data: &MessageData) -> Result<PushContent> {
        let merged = merge_data(self.layout_data, data);
        let title = message.push_title(locale, &merged)?;
        let body = self.render(message, Channel::Push, RenderFormat::Text, locale, &merged)?;
        Ok(PushContent { title, body })
    }

    /// Render one body from already merged data.
    pub fn render(
        &self,
        message: &Message,
        channel: Channel,
        format: RenderFormat,
        locale: &str,
        merged: &MessageData,
    ) -> Result<String> {
        let templates = TemplateSet::resolve(self.templates_root, channel, format, message);
        self.renderer.render(&RenderRequest {
            templates: &templates,
            format,
            data: merged,
            locale,
            layout_bundle: self.layout_bundle,
            message_bundle: message.bundle(),
        })
    }
}
