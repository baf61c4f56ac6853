//! nodeflow CLI entry point.
//!
//! Binary name: `nodeflow`
//!
//! Parses CLI arguments, sets up tracing, then dispatches to the command
//! handlers. Only `run` needs the engine config; document commands work on
//! the file alone.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,nodeflow_core=debug,nodeflow_infra=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::New { file, force } => cli::graph::handle_new(&file, force, cli.json)?,

        Commands::Validate { file } => cli::graph::handle_validate(&file, cli.json)?,

        Commands::Run { file, delay_ms } => {
            let state = AppState::init().await?;
            cli::run::handle_run(&state, &file, delay_ms, cli.json, cli.quiet).await?;
        }

        Commands::Show { file } => cli::graph::handle_show(&file, cli.json)?,

        Commands::Node { command } => cli::graph::handle_node_command(command, cli.json)?,

        Commands::Connect {
            file,
            source,
            target,
        } => cli::graph::handle_edge(&file, source, target, true, cli.json)?,

        Commands::Disconnect {
            file,
            source,
            target,
        } => cli::graph::handle_edge(&file, source, target, false, cli.json)?,

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(shell, &mut cmd, "nodeflow", &mut std::io::stdout());
        }
    }

    Ok(())
}
