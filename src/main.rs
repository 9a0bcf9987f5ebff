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
    let cli = novel_translate::cli::Cli::parse();
    novel_translate::logging::init(cli.verbosity).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        novel_translate::cli::Command::Translate(args) => {
            novel_translate::batch::run(args).await.context("translate")?;
        }
        novel_translate::cli::Command::Status(args) => {
            novel_translate::status::run(args).context("status")?;
        }
    }

    Ok(())
}
