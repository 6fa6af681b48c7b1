//! HTTP relay provider for SMS and push.
//!
//! Posts each envelope as JSON to a configured endpoint, which forwards it
//! to the actual gateway. An optional body template reshapes the payload
//! for gateways that expect their own format.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::ProviderError;
use crate::traits::{PushEnvelope, PushProvider, SmsEnvelope, SmsProvider};

/// Delivers envelopes over HTTP to a relay endpoint.
///
/// `${VAR_NAME}` references in the URL and header values are resolved
/// from the environment at construction time.
#[derive(Debug)]
pub struct WebhookProvider {
    name: String,
    url: String,
    method: reqwest::Method,
    headers: HashMap<String, String>,
    /// Minijinja template for the request body. The envelope fields are
    /// the template context. Without one, the envelope is sent as JSON.
    body_template: Option<String>,
    client: reqwest::Client,
}

impl WebhookProvider {
    /// Create a provider named `name` (used in logs and debug output).
    ///
    /// Missing env vars and invalid body templates produce
    /// [`ProviderError::Config`]. `method` defaults to `POST`.
    pub fn new(
        name: impl Into<String>,
        url: String,
        method: Option<reqwest::Method>,
        headers: HashMap<String, String>,
        body_template: Option<String>,
    ) -> Result<Self, ProviderError> {
        let resolved_url = resolve_env_vars(&url)?;

        let mut resolved_headers = HashMap::with_capacity(headers.len());
        for (key, value) in &headers {
            resolved_headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        if let Some(ref tmpl) = body_template {
            let env = minijinja::Environment::new();
            env.template_from_str(tmpl)
                .map_err(|e| ProviderError::Config(format!("invalid body template: {e}")))?;
        }

        Ok(Self {
            name: name.into(),
            url: resolved_url,
            method: method.unwrap_or(reqwest::Method::POST),
            headers: resolved_headers,
            body_template,
            client: reqwest::Client::new(),
        })
    }

    /// Construct from config-level primitives; `method` is parsed
    /// case-insensitively.
    pub fn from_config(
        name: &str,
        url: String,
        method: Option<String>,
        headers: Option<HashMap<String, String>>,
        body_template: Option<String>,
    ) -> Result<Self, ProviderError> {
        let parsed_method = match method {
            Some(m) => m
                .to_uppercase()
                .parse::<reqwest::Method>()
                .map(Some)
                .map_err(|_| ProviderError::Config(format!("invalid HTTP method: {m}")))?,
            None => None,
        };

        Self::new(name, url, parsed_method, headers.unwrap_or_default(), body_template)
    }

    fn render_body<T: Serialize>(&self, payload: &T) -> Result<String, ProviderError> {
        match &self.body_template {
            Some(tmpl) => minijinja::Environment::new()
                .render_str(tmpl, payload)
                .map_err(|e| ProviderError::Config(format!("body template failed: {e}"))),
            None => serde_json::to_string(payload)
                .map_err(|e| ProviderError::Config(format!("failed to serialize payload: {e}"))),
        }
    }

    async fn post<T: Serialize + Sync>(&self, payload: &T) -> Result<(), ProviderError> {
        let body = self.render_body(payload)?;

        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                provider = %self.name,
                url = %self.url,
                %status,
                body = %body_text,
                "relay returned non-2xx status"
            );
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(
            provider = %self.name,
            url = %self.url,
            method = %self.method,
            %status,
            "relay accepted payload"
        );

        Ok(())
    }
}

#[async_trait::async_trait]
impl SmsProvider for WebhookProvider {
    async fn send(&self, sms: &SmsEnvelope) -> Result<(), ProviderError> {
        self.post(sms).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait::async_trait]
impl PushProvider for WebhookProvider {
    async fn send(&self, push: &PushEnvelope) -> Result<(), ProviderError> {
        self.post(push).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
fn resolve_env_vars(input: &str) -> Result<String, ProviderError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(ProviderError::Config(format!("unclosed env var reference in: {input}")));
            }
            let value = std::env::var(&var_name)
                .map_err(|_| ProviderError::Config(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
