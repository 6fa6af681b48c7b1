use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str) -> Option<u16> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str) -> Option<bool> {
    profiled_env_opt(profile, key).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub messenger: MessengerSettings,
    pub smtp: SmtpConfig,
    pub sms: SmsConfig,
    pub push: PushConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `COURIER_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("COURIER_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            messenger: MessengerSettings::from_env_profiled(p),
            smtp: SmtpConfig::from_env_profiled(p),
            sms: SmsConfig::from_env_profiled(p),
            push: PushConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  messenger:   templates_root={}, default_locale={}, timeout={}s",
            self.messenger.templates_root.display(),
            self.messenger.default_locale,
            self.messenger.provider_timeout_secs
        );
        tracing::info!(
            "  mail:        from={}, reply_to={}",
            self.messenger.mail_from.as_deref().unwrap_or("(none)"),
            self.messenger.mail_reply_to.as_deref().unwrap_or("(none)")
        );
        tracing::info!("  smtp:        configured={}", self.smtp.is_configured());
        tracing::info!("  sms:         configured={}", self.sms.is_configured());
        tracing::info!(
            "  push:        apple={}, google={}",
            self.push.apple_webhook_url.is_some(),
            self.push.google_webhook_url.is_some()
        );
    }
}

// ── Messenger ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessengerSettings {
    /// Directory holding layout templates, layout locales and one
    /// sub-directory per message.
    pub templates_root: PathBuf,
    pub default_locale: String,
    pub mail_from: Option<String>,
    pub mail_reply_to: Option<String>,
    /// Deadline applied to every provider call.
    pub provider_timeout_secs: u64,
}

impl MessengerSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            templates_root: PathBuf::from(profiled_env_or(p, "TEMPLATES_ROOT", "templates")),
            default_locale: profiled_env_or(p, "DEFAULT_LOCALE", "en"),
            mail_from: profiled_env_opt(p, "MAIL_FROM"),
            mail_reply_to: profiled_env_opt(p, "MAIL_REPLY_TO"),
            provider_timeout_secs: profiled_env_u64(p, "PROVIDER_TIMEOUT_SECS", 30),
        }
    }
}

// ── SMTP ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<bool>,
}

impl SmtpConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_opt(p, "SMTP_HOST"),
            port: profiled_env_u16(p, "SMTP_PORT"),
            tls: profiled_env_bool(p, "SMTP_TLS"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.host.is_some()
    }
}

// ── SMS relay ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub webhook_url: Option<String>,
}

impl SmsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "SMS_WEBHOOK_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}

// ── Push relays ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    pub apple_webhook_url: Option<String>,
    pub google_webhook_url: Option<String>,
}

impl PushConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            apple_webhook_url: profiled_env_opt(p, "PUSH_APPLE_WEBHOOK_URL"),
            google_webhook_url: profiled_env_opt(p, "PUSH_GOOGLE_WEBHOOK_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.apple_webhook_url.is_some() || self.google_webhook_url.is_some()
    }
}
