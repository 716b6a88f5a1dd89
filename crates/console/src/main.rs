//! `hrdesk-console` -- command-line driver for the hrdesk details screens.
//!
//! ```text
//! hrdesk-console <team|template|policy> <id|new> [field=value ...] [--members=1,2] [--save|--discard]
//! ```
//!
//! Configuration comes from the environment (see [`ConsoleConfig::from_env`]).

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hrdesk_console::cli::Cli;
use hrdesk_console::config::ConsoleConfig;
use hrdesk_console::session::{self, SessionRequest};
use hrdesk_events::NotificationBus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hrdesk_console=info,hrdesk_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ConsoleConfig::from_env()?;
    let screen_name = cli.screen.name();
    let request = SessionRequest::from_cli(cli)?;

    tracing::info!(
        screen = screen_name,
        entity_id = ?request.entity_id,
        api_url = %config.api_url,
        draft_file = %config.draft_file,
        "Starting hrdesk-console",
    );

    let bus = NotificationBus::default();
    let ports = session::build_ports(&config, screen_name, &bus, &request)?;
    let report = session::run(request, ports, config.controller_options(), &bus).await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
