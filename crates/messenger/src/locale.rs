//! Localized message bundles loaded from `locale.<tag>.yml` files.
//!
//! A bundle maps locale tag → (message key → string). The strings are
//! small minijinja templates interpolated with the caller's data at lookup
//! time, so `"Hello, {{ Name }}!"` becomes `"Hello, Bob Marley!"`.
//!
//! Lookup falls back from the exact tag to its base language (`en-US` →
//! `en`) and finally to the bundle's default locale.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{MsgrError, Result};

const LOCALE_FILE_PREFIX: &str = "locale.";
const LOCALE_FILE_SUFFIX: &str = ".yml";

/// Normalize a locale tag (`en_US` → `en-us`), rejecting malformed input.
pub fn normalize_locale(tag: &str) -> Result<String> {
    let trimmed = tag.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .split(['-', '_'])
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
    if !valid {
        return Err(MsgrError::InvalidLocale(tag.to_string()));
    }
    Ok(trimmed.replace('_', "-").to_lowercase())
}

/// Localized strings for one scope (the layout or a single message).
#[derive(Debug, Clone)]
pub struct LocaleBundle {
    default_locale: String,
    messages: HashMap<String, HashMap<String, String>>,
}

impl LocaleBundle {
    /// Create an empty bundle.
    pub fn new(default_locale: &str) -> Result<Self> {
        Ok(Self {
            default_locale: normalize_locale(default_locale)?,
            messages: HashMap::new(),
        })
    }

    /// Load every `locale.<tag>.yml` file directly inside `dir`.
    ///
    /// A missing directory yields an empty bundle; lookups then fail with
    /// [`MsgrError::MissingTranslation`] at render time.
    pub fn load_dir(dir: &Path, default_locale: &str) -> Result<Self> {
        let mut bundle = Self::new(default_locale)?;

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %dir.display(), "locale directory missing, bundle is empty");
                return Ok(bundle);
            }
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            let Some(tag) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(LOCALE_FILE_PREFIX))
                .and_then(|n| n.strip_suffix(LOCALE_FILE_SUFFIX))
            else {
                continue;
            };
            if !path.is_file() {
                continue;
            }

            let locale = normalize_locale(tag).map_err(|_| MsgrError::LocaleFile {
                path: path.clone(),
                reason: format!("invalid locale tag {tag:?} in file name"),
            })?;
            let raw = fs::read_to_string(&path)?;
            let messages: HashMap<String, String> =
                serde_yaml::from_str(&raw).map_err(|e| MsgrError::LocaleFile {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

            debug!(path = %path.display(), %locale, keys = messages.len(), "loaded locale file");
            bundle.add_messages(&locale, messages)?;
        }

        Ok(bundle)
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Locales with at least one message, sorted.
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.messages.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    /// Insert or replace a single message.
    pub fn insert(&mut self, locale: &str, key: impl Into<String>, text: impl Into<String>) -> Result<()> {
        let locale = normalize_locale(locale)?;
        self.messages
            .entry(locale)
            .or_default()
            .insert(key.into(), text.into());
        Ok(())
    }

    /// Merge a batch of messages into `locale`; later keys replace earlier ones.
    pub fn add_messages(&mut self, locale: &str, messages: HashMap<String, String>) -> Result<()> {
        let locale = normalize_locale(locale)?;
        self.messages.entry(locale).or_default().extend(messages);
        Ok(())
    }

    /// Raw message text for `key`, following the fallback chain.
    pub fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.candidates(locale)
            .into_iter()
            .find_map(|tag| self.messages.get(&tag).and_then(|m| m.get(key)))
            .map(String::as_str)
    }

    pub fn contains(&self, locale: &str, key: &str) -> bool {
        self.lookup(locale, key).is_some()
    }

    /// Resolve `key` for `locale` and interpolate `data` into it.
    pub fn resolve<S: Serialize>(&self, locale: &str, key: &str, data: &S) -> Result<String> {
        let text = self
            .lookup(locale, key)
            .ok_or_else(|| MsgrError::MissingTranslation {
                key: key.to_string(),
                locale: locale.to_string(),
            })?;

        if !text.contains("{{") && !text.contains("{%") {
            return Ok(text.to_string());
        }

        minijinja::Environment::new()
            .render_str(text, data)
            .map_err(|e| MsgrError::Render(format!("message {key:?}: {e}")))
    }

    fn candidates(&self, locale: &str) -> Vec<String> {
        let mut tags = Vec::with_capacity(3);
        if let Ok(tag) = normalize_locale(locale) {
            if let Some((base, _)) = tag.split_once('-') {
                let base = base.to_string();
                tags.push(tag);
                tags.push(base);
            } else {
                tags.push(tag);
            }
        }
        if !tags.contains(&self.default_locale) {
            tags.push(self.default_locale.clone());
        }
        if let Some((base, _)) = self.default_locale.split_once('-') {
            if !tags.iter().any(|t| t == base) {
                tags.push(base.to_string());
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn bundle() -> LocaleBundle {
        let mut b = LocaleBundle::new("en").unwrap();
        b.insert("en", "greeting", "Hello, {{ Name }}!").unwrap();
        b.insert("en", "plain", "Plain text").unwrap();
        b.insert("fr", "greeting", "Bonjour, {{ Name }} !").unwrap();
        b.insert("fr-CA", "greeting", "Allo, {{ Name }} !").unwrap();
        b
    }

    #[test]
    fn resolve_interpolates_data() {
        let out = bundle()
            .resolve("en", "greeting", &json!({"Name": "Bob Marley"}))
            .unwrap();
        assert_eq!(out, "Hello, Bob Marley!");
    }

    #[test]
    fn resolve_plain_string_skips_rendering() {
        assert_eq!(bundle().resolve("en", "plain", &json!({})).unwrap(), "Plain text");
    }

    #[test]
    fn exact_region_wins_over_base_language() {
        let out = bundle().resolve("fr_CA", "greeting", &json!({"Name": "Zoé"})).unwrap();
        assert_eq!(out, "Allo, Zoé !");
    }

    #[test]
    fn region_falls_back_to_base_language() {
        let out = bundle().resolve("fr-BE", "greeting", &json!({"Name": "Zoé"})).unwrap();
        assert_eq!(out, "Bonjour, Zoé !");
    }

    #[test]
    fn unknown_locale_falls_back_to_default() {
        let out = bundle().resolve("de", "plain", &json!({})).unwrap();
        assert_eq!(out, "Plain text");
    }

    #[test]
    fn unknown_locale_falls_back_to_regional_default_base() {
        let mut b = LocaleBundle::new("en-US").unwrap();
        b.insert("en", "mail_subject", "Hi").unwrap();
        assert_eq!(b.resolve("en-us", "mail_subject", &json!({})).unwrap(), "Hi");
        assert_eq!(b.resolve("de", "mail_subject", &json!({})).unwrap(), "Hi");
        assert_eq!(b.candidates("de"), vec!["de", "en-us", "en"]);
        assert_eq!(b.candidates("en"), vec!["en", "en-us"]);
    }

    #[test]
    fn missing_key_is_missing_translation() {
        match bundle().resolve("en", "nope", &json!({})) {
            Err(MsgrError::MissingTranslation { key, locale }) => {
                assert_eq!(key, "nope");
                assert_eq!(locale, "en");
            }
            other => panic!("expected MissingTranslation, got: {other:?}"),
        }
    }

    #[test]
    fn invalid_locale_tags_are_rejected() {
        assert!(normalize_locale("").is_err());
        assert!(normalize_locale("en--US").is_err());
        assert!(normalize_locale("../etc").is_err());
        assert_eq!(normalize_locale("pt_BR").unwrap(), "pt-br");
    }

    #[test]
    fn load_dir_reads_locale_files_only() {
        let dir = TempDir::new().expect("create tempdir");
        fs::write(dir.path().join("locale.en.yml"), "mail_subject: \"Hi {{ Name }}\"\n").unwrap();
        fs::write(dir.path().join("locale.es.yml"), "mail_subject: \"Hola {{ Name }}\"\n").unwrap();
        fs::write(dir.path().join("index_mail.html.tmpl"), "<p>ignored</p>").unwrap();

        let bundle = LocaleBundle::load_dir(dir.path(), "en").unwrap();
        assert_eq!(bundle.locales(), vec!["en", "es"]);
        assert_eq!(
            bundle.resolve("es", "mail_subject", &json!({"Name": "Ana"})).unwrap(),
            "Hola Ana"
        );
    }

    #[test]
    fn load_dir_missing_directory_is_empty() {
        let dir = TempDir::new().expect("create tempdir");
        let bundle = LocaleBundle::load_dir(&dir.path().join("absent"), "en").unwrap();
        assert!(bundle.locales().is_empty());
    }

    #[test]
    fn load_dir_reports_bad_yaml() {
        let dir = TempDir::new().expect("create tempdir");
        fs::write(dir.path().join("locale.en.yml"), "- just\n- a list\n").unwrap();
        let err = LocaleBundle::load_dir(dir.path(), "en").unwrap_err();
        assert!(matches!(err, MsgrError::LocaleFile { .. }), "got: {err:?}");
    }
}
