//! Preview export: compose a message and write one HTML page per channel.
//!
//! Files are named `{message}_{channel}_{locale}.html` and land in the
//! requested output directory. Nothing is delivered.

use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{context, Environment};

use courier_core::{Channel, MessageData};

use crate::error::{MsgrError, Result};
use crate::messenger::Messenger;

const MAIL_PREVIEW: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{{ subject }}</title></head>
<body>
<table>
  <tr><th>Subject</th><td>{{ subject }}</td></tr>
</table>
<h2>HTML</h2>
<div class="mail-html">{{ html|safe }}</div>
<h2>Text</h2>
<pre>{{ text }}</pre>
</body>
</html>
"#;

const SMS_PREVIEW: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>SMS preview</title></head>
<body>
<div class="sms-bubble"><pre>{{ body }}</pre></div>
<p>{{ body|length }} characters</p>
</body>
</html>
"#;

const PUSH_PREVIEW: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{{ title }}</title></head>
<body>
<div class="push-card">
  <strong>{{ title }}</strong>
  <p>{{ body }}</p>
</div>
</body>
</html>
"#;

/// What to preview and where to put it.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub message: String,
    pub channels: Vec<Channel>,
    pub data: MessageData,
    /// Locale to compose in; the messenger default when `None`.
    pub locale: Option<String>,
    pub out_dir: PathBuf,
}

impl PreviewOptions {
    pub fn new(message: impl Into<String>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            message: message.into(),
            channels: Channel::ALL.to_vec(),
            data: MessageData::new(),
            locale: None,
            out_dir: out_dir.into(),
        }
    }
}

fn preview_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    for (name, source) in [
        ("mail_preview.html", MAIL_PREVIEW),
        ("sms_preview.html", SMS_PREVIEW),
        ("push_preview.html", PUSH_PREVIEW),
    ] {
        env.add_template(name, source)
            .map_err(|e| MsgrError::Render(e.to_string()))?;
    }
    Ok(env)
}

/// Path of the preview file for one channel.
pub fn preview_file(out_dir: &Path, message: &str, channel: Channel, locale: &str) -> PathBuf {
    out_dir.join(format!("{message}_{channel}_{locale}.html"))
}

/// Compose `opts.message` for each requested channel and write the pages.
///
/// Stops at the first channel that fails to compose. Returns the written
/// paths in channel order.
pub fn preview_message(messenger: &Messenger, opts: &PreviewOptions) -> Result<Vec<PathBuf>> {
    let message = messenger.message(&opts.message)?;
    let locale = messenger.resolve_locale(opts.locale.as_deref())?;
    let composer = messenger.composer();
    let env = preview_env()?;

    fs::create_dir_all(&opts.out_dir)?;

    let mut written = Vec::with_capacity(opts.channels.len());
    for &channel in &opts.channels {
        let page = match channel {
            Channel::Mail => {
                let mail = composer.compose_mail(&message, &locale, &opts.data)?;
                render_page(&env, "mail_preview.html", context! {
                    subject => mail.subject,
                    html => mail.html,
                    text => mail.text,
                })?
            }
            Channel::Sms => {
                let sms = composer.compose_sms(&message, &locale, &opts.data)?;
                render_page(&env, "sms_preview.html", context! { body => sms.body })?
            }
            Channel::Push => {
                let push = composer.compose_push(&message, &locale, &opts.data)?;
                render_page(&env, "push_preview.html", context! {
                    title => push.title,
                    body => push.body,
                })?
            }
        };

        let path = preview_file(&opts.out_dir, &opts.message, channel, &locale);
        fs::write(&path, page)?;
        tracing::info!(message_name = %opts.message, %channel, %locale, path = %path.display(), "preview written");
        written.push(path);
    }

    Ok(written)
}

fn render_page(env: &Environment<'_>, name: &str, ctx: minijinja::Value) -> Result<String> {
    env.get_template(name)
        .and_then(|tmpl| tmpl.render(ctx))
        .map_err(|e| MsgrError::Render(e.to_string()))
}
