//! SMTP mail provider via `lettre` with TLS support.
//!
//! Sends composed mail as a multipart/alternative message carrying both
//! the text and the HTML body.

use lettre::{
    message::{Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::error::ProviderError;
use crate::traits::{MailEnvelope, MailProvider};

/// Delivers [`MailEnvelope`]s through an SMTP relay.
#[derive(Debug)]
pub struct SmtpMailProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailProvider {
    /// Build a provider for `smtp_host`.
    ///
    /// - `smtp_port`: defaults to 587. Port 465 always uses implicit TLS.
    /// - `tls`: `None` or `Some(true)` enables STARTTLS on other ports.
    ///
    /// Credentials come from `SMTP_USERNAME` and `SMTP_PASSWORD` when both
    /// are set; otherwise the connection is unauthenticated. No connection
    /// is opened here.
    pub fn from_config(smtp_host: &str, smtp_port: Option<u16>, tls: Option<bool>) -> Result<Self, ProviderError> {
        let port = smtp_port.unwrap_or(587);
        let use_tls = tls.unwrap_or(true);

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
                .map_err(|e| ProviderError::Config(e.to_string()))?
                .port(port)
        } else if use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .map_err(|e| ProviderError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(port)
        };

        if let (Ok(username), Ok(password)) = (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD")) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            host: smtp_host.to_string(),
        })
    }
}

fn parse_mailbox(field: &str, addr: &str) -> Result<Mailbox, ProviderError> {
    addr.parse()
        .map_err(|e: lettre::address::AddressError| ProviderError::Config(format!("invalid {field} address {addr:?}: {e}")))
}

/// Turn an envelope into a MIME message.
///
/// Falls back to a single HTML part when the text body is empty.
pub fn build_message(mail: &MailEnvelope) -> Result<Message, ProviderError> {
    let mut builder = Message::builder()
        .from(parse_mailbox("from", &mail.from)?)
        .to(parse_mailbox("to", &mail.to)?)
        .subject(mail.subject.as_str());

    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(parse_mailbox("reply-to", reply_to)?);
    }

    let built = if mail.text.is_empty() {
        builder.singlepart(SinglePart::html(mail.html.clone()))
    } else {
        builder.multipart(MultiPart::alternative_plain_html(mail.text.clone(), mail.html.clone()))
    };

    built.map_err(|e| ProviderError::Smtp(e.to_string()))
}

#[async_trait::async_trait]
impl MailProvider for SmtpMailProvider {
    async fn send(&self, mail: &MailEnvelope) -> Result<(), ProviderError> {
        let message = build_message(mail)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ProviderError::Smtp(e.to_string()))?;

        tracing::debug!(
            host = %self.host,
            to = %mail.to,
            subject = %mail.subject,
            "mail handed to SMTP relay"
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}
