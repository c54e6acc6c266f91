use std::sync::Arc;

use clap::Parser;
use racewire::console;
use racewire::prelude::*;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Race-ranking bot for a racing-coordination server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Server host.
    #[arg(long, default_value = ClientConfig::DEFAULT_HOST)]
    host: String,

    /// Server port. Falls back to 6172 if it does not parse.
    #[arg(long, default_value = "6172")]
    port: String,
}

#[tokio::main]
async fn main() -> Result<(), BotError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = BotConfig::from_args(&args.host, &args.port);
    let bot = Bot::start(config, Arc::new(ExitProcess));

    let exit = console::run(&bot, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await;
    info!(?exit, "console closed");

    bot.shutdown().await?;
    info!("detached");
    Ok(())
}
