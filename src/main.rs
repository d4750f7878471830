mod bridge;
mod config;
mod llm;
mod pipeline;
mod platform;
mod scheduler;
mod webhook;
mod wordpress;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bridge::Bridge;
use crate::config::Config;
use crate::scheduler::Scheduler;
use crate::webhook::WebhookState;

const USAGE: &str = "usage: tgpress [run|schedule|serve] [CONFIG_PATH]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// One polling pass, then exit.
    Run,
    /// Polling passes on a cron schedule until Ctrl-C.
    Schedule,
    /// Webhook HTTP server.
    Serve,
}

fn parse_args(args: &[String]) -> Result<(Command, PathBuf)> {
    let mut rest = args.iter().skip(1);
    let command = match rest.next().map(String::as_str) {
        None | Some("run") => Command::Run,
        Some("schedule") => Command::Schedule,
        Some("serve") => Command::Serve,
        Some(other) => anyhow::bail!("Unknown command '{}'\n{}", other, USAGE),
    };
    let config_path = rest
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    if rest.next().is_some() {
        anyhow::bail!("Too many arguments\n{}", USAGE);
    }
    Ok((command, config_path))
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tgpress=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let (command, config_path) = parse_args(&args)?;

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Provider: {} ({})", config.llm.provider, config.llm.model);
    info!("  Chat: {}", config.telegram.chat_id);
    info!("  WordPress: {} (status {})", config.wordpress.base_url, config.wordpress.post_status);

    let bridge = Arc::new(Bridge::new(&config));

    match command {
        Command::Run => {
            info!("  Fetch limit: {}", bridge.settings().fetch_limit);
            bridge.run_once().await?;
        }
        Command::Schedule => {
            let mut scheduler = Scheduler::new().await?;
            let settings = bridge.settings().clone();
            scheduler::tasks::register_polling_task(
                &scheduler,
                &config.schedule.cron,
                bridge,
                settings,
            )
            .await?;
            scheduler.start().await?;

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            scheduler.shutdown().await?;
        }
        Command::Serve => {
            let state = WebhookState {
                ops: bridge,
                target_chat_id: config.telegram.chat_id.clone(),
                post_status: config.wordpress.post_status.clone(),
            };
            webhook::serve(&config.webhook.listen, state).await?;
        }
    }

    Ok(())
}
