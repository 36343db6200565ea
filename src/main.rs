//! threadline CLI binary entry point.

use clap::Parser;
use threadline::cli::commands;
use threadline::cli::repl::ReplOutcome;
use threadline::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout();
    let result = match cli.command {
        Commands::Chat(args) => commands::run_chat(config, args).await.map(|outcome| {
            if outcome == ReplOutcome::Shutdown {
                tracing::info!("kernel shutdown");
            }
        }),
        Commands::Ask(args) => commands::run_ask(config, args, &mut stdout).await,
        Commands::Route(args) => commands::run_route(config, args).await,
        Commands::History(args) => commands::run_history(config, args, &mut stdout),
        Commands::Tools => commands::run_tools(&config, &mut stdout),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        eprintln!("hint: {}", e.user_hint());
        std::process::exit(1);
    }
}
