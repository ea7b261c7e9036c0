use std::{path::PathBuf, sync::Arc};

use {
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    reviewrelay_config::{RelayConfig, load_channel_map},
    reviewrelay_gerrit::{NotificationSink, ReviewStreamSupervisor},
    reviewrelay_irc::{ChatHandle, SessionConfig},
    reviewrelay_routing::RoutingTable,
};

#[derive(Parser)]
#[command(name = "reviewrelay", about = "Relay Gerrit review events into IRC channels")]
struct Cli {
    /// Path to the config file (otherwise discovered in ./ and the user
    /// config dir).
    #[arg(short, long, env = "REVIEWRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

/// Bridges the supervisor's notifications into the chat session queue.
struct ChatSink(ChatHandle);

#[async_trait::async_trait]
impl NotificationSink for ChatSink {
    async fn deliver(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        self.0.send(channel, text).await?;
        Ok(())
    }
}

// Any error propagating out of main is a fatal setup failure: report it and
// exit non-zero. Transient trouble never gets this far.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = load(&cli)?;
    let channel_map = load_channel_map(&config.irc.channel_config)?;
    let table = Arc::new(RoutingTable::build(channel_map));
    info!(channels = table.channels().len(), "routing table built");

    let chat = reviewrelay_irc::spawn(SessionConfig {
        nick: config.irc.nick.clone(),
        password: config.irc.password.clone(),
        server: config.irc.server.clone(),
        port: config.irc.port,
        use_tls: config.irc.use_tls(),
        server_password: config.irc.server_password.clone(),
        channels: table.channels().into_iter().collect(),
    });

    let supervisor = ReviewStreamSupervisor::new(config.gerrit, table, Arc::new(ChatSink(chat)));
    supervisor.run().await?;
    Ok(())
}

fn load(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let (path, config) = match &cli.config {
        Some(path) => (path.clone(), reviewrelay_config::load_config(path)?),
        None => reviewrelay_config::discover_and_load()?,
    };
    info!(path = %path.display(), "config loaded");
    Ok(config)
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
