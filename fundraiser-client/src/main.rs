use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use fundraiser_client::{
    cli::Cli,
    client::Client,
    connection::ConnectionManager,
    console::Prompter,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    // Logs go to stderr so they stay out of the menu on stdout.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    info!(server = %cli.server, delay_ms = cli.reconnect_delay_ms, "starting client");

    let connection = ConnectionManager::new(cli.server.clone(), cli.reconnect_policy());
    let prompter = Prompter::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let mut client = Client::new(connection, prompter, cli.on_decode_error);
    client.run().await
}
