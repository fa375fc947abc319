use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use update_tester::cli::Cli;
use update_tester::config::ServerConfig;
use update_tester::controller::Server;
use update_tester::logging;
use update_tester::shell::Shell;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let config = ServerConfig::from_cli(&cli).context("Invalid configuration")?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let server = Server::start(&config, Arc::new(event_tx))
        .await
        .context("Can't create update tester")?;

    println!("Start server, url: {}", server.local_addr());

    let mut shell = Shell::new(server.dispatcher().clone(), std::io::stdout());
    let result = shell
        .run(BufReader::new(tokio::io::stdin()), event_rx)
        .await
        .context("Shell failed");

    server.shutdown().await;
    result
}
