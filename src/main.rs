use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    shelfmark::logging::init().context("init logging")?;

    let cli = shelfmark::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        shelfmark::cli::Command::Collect(args) => {
            shelfmark::collect::run(args).await.context("collect")?;
        }
        shelfmark::cli::Command::History(args) => {
            shelfmark::history::run(args).await.context("history")?;
        }
        shelfmark::cli::Command::Tag(args) => {
            shelfmark::tag::run(args).await.context("tag")?;
        }
        shelfmark::cli::Command::Link(args) => {
            shelfmark::link::run(args).await.context("link")?;
        }
    }

    Ok(())
}
