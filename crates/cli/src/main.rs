mod config_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    tokio_util::sync::CancellationToken,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    streambot_config::validate,
    streambot_gateway::{GatewayState, spawn_shutdown_listener, start_gateway},
    streambot_providers::ProviderManager,
};

#[derive(Parser)]
#[command(name = "streambot", about = "Streambot: streaming AI replies for Feishu chats")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides the search of ./ and ~/.config/streambot/).
    #[arg(long, global = true, env = "STREAMBOT_CONFIG")]
    config: Option<PathBuf>,

    // Gateway arguments (used when no subcommand is provided, or with `gateway` subcommand)
    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

async fn run_gateway(cli: Cli) -> anyhow::Result<()> {
    let config = streambot_config::load_or_default(cli.config.as_deref())?;

    let result = validate(&config);
    config_commands::print_diagnostics(&result, false);
    if result.has_errors() {
        anyhow::bail!("invalid configuration: {}", result.error_summary());
    }

    let providers = Arc::new(ProviderManager::from_config(&config.ai)?);

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());
    let state = GatewayState::from_config(&config, providers, cancel)?;

    // CLI args override config values
    let bind = cli.bind.unwrap_or(config.server.bind);
    let port = cli.port.unwrap_or(config.server.port);
    start_gateway(&bind, port, state).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "streambot starting");

    match cli.command.take() {
        // Default: start gateway when no subcommand is provided
        None | Some(Commands::Gateway) => run_gateway(cli).await,
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
