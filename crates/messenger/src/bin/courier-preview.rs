//! courier-preview: compose messages from a template tree and either
//! export previews or send them through the configured providers.
//!
//! Configuration comes from the environment (see `courier_core::Config`);
//! `.env` files are honoured.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use courier_core::{config, Channel, Config, MessageData};
use courier_messenger::{
    preview_message, AddMessageOptions, DryRunProvider, Messenger, MessengerConfig, PreviewOptions, Providers,
    PushDevice, PushProviders, SendRequest,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Compose, preview and send notifications.
#[derive(Parser, Debug)]
#[command(name = "courier-preview", version, about)]
struct Cli {
    /// Templates root; overrides TEMPLATES_ROOT.
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write HTML previews of a message.
    Preview {
        /// Message name (its template sub-directory).
        message: String,

        /// Channels to preview; all when omitted.
        #[arg(long = "channel", value_delimiter = ',')]
        channels: Vec<Channel>,

        /// Locale to compose in.
        #[arg(long)]
        locale: Option<String>,

        /// Message data as a JSON object.
        #[arg(long, default_value = "{}")]
        data: String,

        /// Output directory.
        #[arg(long, default_value = "preview")]
        out: PathBuf,
    },

    /// Send a message.
    Send {
        message: String,

        #[arg(long)]
        mail_to: Option<String>,

        #[arg(long)]
        sms_to: Option<String>,

        /// Push targets as `platform:token`.
        #[arg(long = "push-to")]
        push_to: Vec<String>,

        #[arg(long)]
        locale: Option<String>,

        #[arg(long, default_value = "{}")]
        data: String,

        /// Log payloads instead of delivering them.
        #[arg(long, env = "COURIER_DRY_RUN")]
        dry_run: bool,
    },
}

fn parse_data(raw: &str) -> anyhow::Result<MessageData> {
    serde_json::from_str(raw).context("--data must be a JSON object")
}

fn parse_device(raw: &str) -> anyhow::Result<PushDevice> {
    let (platform, token) = raw
        .split_once(':')
        .with_context(|| format!("push target {raw:?} is not platform:token"))?;
    Ok(PushDevice::new(token, platform))
}

fn dry_run_providers() -> Providers {
    let dry = Arc::new(DryRunProvider::new());
    Providers::new()
        .with_mail(dry.clone())
        .with_sms(dry.clone())
        .with_push(PushProviders::new().with_apple(dry.clone()).with_google(dry))
}

fn build_messenger(cfg: &Config, templates: Option<PathBuf>, dry_run: bool, message: &str) -> anyhow::Result<Messenger> {
    let mut messenger_config = MessengerConfig::from_settings(&cfg.messenger);
    if let Some(root) = templates {
        messenger_config.templates_root = root;
    }

    let providers = if dry_run {
        dry_run_providers()
    } else {
        let configured = Providers::from_config(cfg).context("failed to build providers")?;
        if configured.is_empty() {
            tracing::warn!("no providers configured, falling back to dry run");
            dry_run_providers()
        } else {
            configured
        }
    };

    let messenger = Messenger::new(messenger_config, providers)?;
    messenger
        .add_message(AddMessageOptions::new(message))
        .with_context(|| format!("failed to load message {message:?}"))?;
    Ok(messenger)
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    config::load_dotenv();
    let cli = Cli::parse();
    let cfg = Config::from_env();
    cfg.log_summary();

    match cli.command {
        Command::Preview {
            message,
            channels,
            locale,
            data,
            out,
        } => {
            // Preview never delivers.
            let messenger = build_messenger(&cfg, cli.templates, true, &message)?;
            let opts = PreviewOptions {
                message,
                channels: if channels.is_empty() { Channel::ALL.to_vec() } else { channels },
                data: parse_data(&data)?,
                locale,
                out_dir: out,
            };
            let written = preview_message(&messenger, &opts)?;
            for path in &written {
                println!("{}", path.display());
            }
            info!(files = written.len(), "preview finished");
        }
        Command::Send {
            message,
            mail_to,
            sms_to,
            push_to,
            locale,
            data,
            dry_run,
        } => {
            let messenger = build_messenger(&cfg, cli.templates, dry_run, &message)?;
            let mut request = SendRequest::new(message).data(parse_data(&data)?);
            request.mail_to = mail_to;
            request.sms_to = sms_to;
            request.locale = locale;
            request.push_to = push_to.iter().map(String::as_str).map(parse_device).collect::<anyhow::Result<_>>()?;

            messenger.send(&request).await?;
            info!(channels = ?request.channels(), "send finished");
        }
    }

    Ok(())
}
