use anyhow::Context;
use clap::Parser;
use gec_cli::cli::{Cli, Commands};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    match &cli.command {
        Commands::Solve(args) => commands::solve::handle(args),
        Commands::Validate { params } => commands::validate::handle(params),
        Commands::Inspect { params, json } => commands::inspect::handle(params, *json),
        Commands::Comfort {
            params,
            temperatures,
        } => commands::comfort::handle(params, temperatures),
    }
}
