//! Minijinja rendering of layered template files.
//!
//! A [`TemplateSet`] is rendered innermost first: the message template is
//! rendered, then handed to the layout as `content`. In HTML format the
//! inner result is marked safe so the layout does not escape it twice.
//!
//! Two helper functions reach the locale bundles, each bound to its own
//! namespace:
//!
//! - `t(key, data?)` looks up the message bundle
//! - `tl(key, data?)` looks up the layout bundle
//!
//! When `data` is omitted the merged send data is used.
//!
//! Template sources are read from disk per render; a fresh
//! [`minijinja::Environment`] is built for each call.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, ErrorKind as TemplateErrorKind, Value};

use courier_core::{MessageData, RenderFormat};

use crate::error::{MsgrError, Result};
use crate::locale::LocaleBundle;
use crate::template_set::TemplateSet;

/// Everything the rendering collaborator needs for one body.
#[derive(Debug)]
pub struct RenderRequest<'a> {
    pub templates: &'a TemplateSet,
    pub format: RenderFormat,
    pub data: &'a MessageData,
    pub locale: &'a str,
    pub layout_bundle: &'a Arc<LocaleBundle>,
    pub message_bundle: &'a Arc<LocaleBundle>,
}

/// Expands a template set against merged data.
pub trait Renderer: Send + Sync {
    fn render(&self, request: &RenderRequest<'_>) -> Result<String>;
}

/// Post-processes rendered HTML mail bodies (e.g. CSS inlining).
pub trait Inliner: Send + Sync {
    fn inline(&self, html: String) -> Result<String>;
}

/// Returns HTML unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughInliner;

impl Inliner for PassthroughInliner {
    fn inline(&self, html: String) -> Result<String> {
        Ok(html)
    }
}

/// File-backed minijinja renderer.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build an environment with the `t`/`tl` lookup helpers.
    fn build_env<'source>(request: &RenderRequest<'_>, context: &Value) -> Environment<'source> {
        let mut env = Environment::new();

        let html = request.format == RenderFormat::Html;
        env.set_auto_escape_callback(move |_| if html { AutoEscape::Html } else { AutoEscape::None });

        env.add_function(
            "t",
            lookup_function(request.message_bundle.clone(), request.locale, context.clone()),
        );
        env.add_function(
            "tl",
            lookup_function(request.layout_bundle.clone(), request.locale, context.clone()),
        );

        env
    }
}

/// A `(key, data?)` template function resolving against one bundle.
fn lookup_function(
    bundle: Arc<LocaleBundle>,
    locale: &str,
    context: Value,
) -> impl Fn(String, Option<Value>) -> std::result::Result<String, minijinja::Error> + Send + Sync + 'static
{
    let locale = locale.to_string();
    move |key: String, data: Option<Value>| {
        let data = data.unwrap_or_else(|| context.clone());
        bundle.resolve(&locale, &key, &data).map_err(|e| {
            minijinja::Error::new(TemplateErrorKind::InvalidOperation, e.to_string()).with_source(e)
        })
    }
}

/// Recover typed errors raised inside template helpers.
fn from_template_error(err: minijinja::Error) -> MsgrError {
    let mut source = std::error::Error::source(&err);
    while let Some(e) = source {
        if let Some(MsgrError::MissingTranslation { key, locale }) = e.downcast_ref::<MsgrError>() {
            return MsgrError::MissingTranslation {
                key: key.clone(),
                locale: locale.clone(),
            };
        }
        source = e.source();
    }
    MsgrError::Render(format!("{err:#}"))
}

fn read_template(path: &std::path::Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => MsgrError::TemplateNotFound(path.to_path_buf()),
        _ => MsgrError::Io(e),
    })
}

impl Renderer for TemplateRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<String> {
        let sources = request
            .templates
            .paths()
            .iter()
            .map(|path| Ok((path.display().to_string(), read_template(path)?)))
            .collect::<Result<Vec<(String, String)>>>()?;

        let base: BTreeMap<String, Value> = request
            .data
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_serialize(v)))
            .collect();
        let context = Value::from(base.clone());

        let mut env = Self::build_env(request, &context);
        for (name, source) in &sources {
            env.add_template(name, source).map_err(from_template_error)?;
        }

        let html = request.format == RenderFormat::Html;
        let mut content: Option<String> = None;
        for (name, _) in sources.iter().rev() {
            let mut layer = base.clone();
            if let Some(inner) = content.take() {
                let inner = if html {
                    Value::from_safe_string(inner)
                } else {
                    Value::from(inner)
                };
                layer.insert("content".to_string(), inner);
            }

            let rendered = env
                .get_template(name)
                .and_then(|tmpl| tmpl.render(Value::from(layer)))
                .map_err(from_template_error)?;
            content = Some(rendered);
        }

        Ok(content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use serde_json::json;
    use tempfile::TempDir;

    use crate::message::{MailOptions, Message};
    use courier_core::Channel;

    struct Fixture {
        dir: TempDir,
        message: Message,
        layout: Arc<LocaleBundle>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().expect("create tempdir");
        fs::create_dir_all(dir.path().join("welcome")).unwrap();

        let mut layout = LocaleBundle::new("en").unwrap();
        layout.insert("en", "footer", "Sent by Acme").unwrap();
        let mut scoped = LocaleBundle::new("en").unwrap();
        scoped.insert("en", "greeting", "Hi {{ Name }}").unwrap();

        let message = Message::from_parts("welcome", dir.path(), MailOptions::default(), "en")
            .unwrap()
            .with_bundle(scoped);
        Fixture {
            dir,
            message,
            layout: Arc::new(layout),
        }
    }

    fn write(root: &Path, rel: &str, body: &str) {
        fs::write(root.join(rel), body).unwrap();
    }

    fn render(fx: &Fixture, channel: Channel, format: RenderFormat, data: &MessageData) -> Result<String> {
        let set = TemplateSet::resolve(fx.dir.path(), channel, format, &fx.message);
        TemplateRenderer::new().render(&RenderRequest {
            templates: &set,
            format,
            data,
            locale: "en",
            layout_bundle: &fx.layout,
            message_bundle: fx.message.bundle(),
        })
    }

    fn data(value: serde_json::Value) -> MessageData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn layout_wraps_message_content() {
        let fx = fixture();
        write(fx.dir.path(), "layout_sms.text.tmpl", "[{{ content }}] {{ tl('footer') }}");
        write(fx.dir.path(), "welcome/index_sms.text.tmpl", "{{ t('greeting') }}!");

        let out = render(&fx, Channel::Sms, RenderFormat::Text, &data(json!({"Name": "Bob"}))).unwrap();
        assert_eq!(out, "[Hi Bob!] Sent by Acme");
    }

    #[test]
    fn html_escapes_data_but_not_inner_content() {
        let fx = fixture();
        write(fx.dir.path(), "layout_mail.html.tmpl", "<body>{{ content }}</body>");
        write(fx.dir.path(), "welcome/index_mail.html.tmpl", "<p>{{ Name }}</p>");

        let out = render(&fx, Channel::Mail, RenderFormat::Html, &data(json!({"Name": "<b>Bob</b>"}))).unwrap();
        assert_eq!(out, "<body><p>&lt;b&gt;Bob&lt;&#x2f;b&gt;</p></body>");
    }

    #[test]
    fn text_format_does_not_escape() {
        let fx = fixture();
        write(fx.dir.path(), "layout_mail.text.tmpl", "{{ content }}");
        write(fx.dir.path(), "welcome/index_mail.text.tmpl", "{{ Name }}");

        let out = render(&fx, Channel::Mail, RenderFormat::Text, &data(json!({"Name": "<b>Bob</b>"}))).unwrap();
        assert_eq!(out, "<b>Bob</b>");
    }

    #[test]
    fn helper_accepts_explicit_data() {
        let fx = fixture();
        write(fx.dir.path(), "layout_push.text.tmpl", "{{ content }}");
        write(fx.dir.path(), "welcome/index_push.text.tmpl", "{{ t('greeting', {'Name': 'Ann'}) }}");

        let out = render(&fx, Channel::Push, RenderFormat::Text, &data(json!({"Name": "Bob"}))).unwrap();
        assert_eq!(out, "Hi Ann");
    }

    #[test]
    fn layout_key_is_not_visible_through_t() {
        let fx = fixture();
        write(fx.dir.path(), "layout_sms.text.tmpl", "{{ content }}");
        write(fx.dir.path(), "welcome/index_sms.text.tmpl", "{{ t('footer') }}");

        match render(&fx, Channel::Sms, RenderFormat::Text, &MessageData::new()) {
            Err(MsgrError::MissingTranslation { key, locale }) => {
                assert_eq!(key, "footer");
                assert_eq!(locale, "en");
            }
            other => panic!("expected MissingTranslation, got: {other:?}"),
        }
    }

    #[test]
    fn message_key_is_not_visible_through_tl() {
        let fx = fixture();
        write(fx.dir.path(), "layout_sms.text.tmpl", "{{ tl('greeting') }}");
        write(fx.dir.path(), "welcome/index_sms.text.tmpl", "body");

        let err = render(&fx, Channel::Sms, RenderFormat::Text, &MessageData::new()).unwrap_err();
        assert!(matches!(err, MsgrError::MissingTranslation { ref key, .. } if key == "greeting"), "got: {err:?}");
    }

    #[test]
    fn missing_message_template_is_template_not_found() {
        let fx = fixture();
        write(fx.dir.path(), "layout_sms.text.tmpl", "{{ content }}");

        match render(&fx, Channel::Sms, RenderFormat::Text, &MessageData::new()) {
            Err(MsgrError::TemplateNotFound(path)) => {
                assert!(path.ends_with("welcome/index_sms.text.tmpl"), "got: {}", path.display());
            }
            other => panic!("expected TemplateNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn syntax_error_is_render_error() {
        let fx = fixture();
        write(fx.dir.path(), "layout_sms.text.tmpl", "{{ content }}");
        write(fx.dir.path(), "welcome/index_sms.text.tmpl", "{{ unclosed");

        let err = render(&fx, Channel::Sms, RenderFormat::Text, &MessageData::new()).unwrap_err();
        assert!(matches!(err, MsgrError::Render(_)), "got: {err:?}");
    }

    #[test]
    fn passthrough_inliner_keeps_html() {
        let html = "<p style=\"x\">hi</p>".to_string();
        assert_eq!(PassthroughInliner.inline(html.clone()).unwrap(), html);
    }
}
