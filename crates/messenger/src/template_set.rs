//! Resolution of the ordered template files behind one channel body.
//!
//! Every (channel, format) pair maps to exactly two files: the shared
//! layout under the templates root, then the message's own template.
//!
//! ```text
//! {templates_root}/layout_{channel}.{format}.tmpl
//! {templates_root}/{message}/index_{channel}.{format}.tmpl
//! ```
//!
//! Existence is not checked here; a missing file surfaces as
//! [`MsgrError::TemplateNotFound`](crate::MsgrError::TemplateNotFound)
//! when the set is rendered.

use std::path::{Path, PathBuf};

use courier_core::{Channel, RenderFormat};

use crate::message::Message;

pub const LAYOUT_PURPOSE: &str = "layout";
pub const MESSAGE_PURPOSE: &str = "index";

/// `{purpose}_{channel}.{format}.tmpl`
pub fn template_file_name(purpose: &str, channel: Channel, format: RenderFormat) -> String {
    format!("{purpose}_{channel}.{format}.tmpl")
}

pub fn layout_template(templates_root: &Path, channel: Channel, format: RenderFormat) -> PathBuf {
    templates_root.join(template_file_name(LAYOUT_PURPOSE, channel, format))
}

/// Ordered template files, outermost (layout) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    paths: Vec<PathBuf>,
}

impl TemplateSet {
    pub fn resolve(
        templates_root: &Path,
        channel: Channel,
        format: RenderFormat,
        message: &Message,
    ) -> Self {
        Self {
            paths: vec![
                layout_template(templates_root, channel, format),
                message.template_file(channel, format),
            ],
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn layout(&self) -> &Path {
        &self.paths[0]
    }

    pub fn message(&self) -> &Path {
        &self.paths[self.paths.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MailOptions;

    fn message() -> Message {
        Message::from_parts("welcome", Path::new("/tpl"), MailOptions::default(), "en").unwrap()
    }

    #[test]
    fn every_channel_and_format_yields_layout_then_message() {
        let msg = message();
        for channel in Channel::ALL {
            for &format in channel.formats() {
                let set = TemplateSet::resolve(Path::new("/tpl"), channel, format, &msg);
                assert_eq!(set.len(), 2);
                assert_eq!(set.layout(), layout_template(Path::new("/tpl"), channel, format));
                assert_eq!(set.message(), msg.template_file(channel, format));
            }
        }
    }

    #[test]
    fn file_names_follow_purpose_channel_format() {
        let set = TemplateSet::resolve(Path::new("/tpl"), Channel::Mail, RenderFormat::Html, &message());
        assert_eq!(
            set.paths(),
            &[
                PathBuf::from("/tpl/layout_mail.html.tmpl"),
                PathBuf::from("/tpl/welcome/index_mail.html.tmpl"),
            ]
        );
    }

    #[test]
    fn sms_uses_its_own_templates() {
        let set = TemplateSet::resolve(Path::new("/tpl"), Channel::Sms, RenderFormat::Text, &message());
        assert_eq!(set.message(), Path::new("/tpl/welcome/index_sms.text.tmpl"));
    }
}
