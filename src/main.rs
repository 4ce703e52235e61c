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
    shelfdex::logging::init().context("init logging")?;

    let cli = shelfdex::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        shelfdex::cli::Command::List(args) => {
            shelfdex::list::run(args).await.context("list")?;
        }
        shelfdex::cli::Command::Search(args) => {
            shelfdex::search::run(args).await.context("search")?;
        }
        shelfdex::cli::Command::Render(args) => {
            shelfdex::render::run(args).await.context("render")?;
        }
        shelfdex::cli::Command::Serve(args) => {
            shelfdex::serve::run(args).await.context("serve")?;
        }
        shelfdex::cli::Command::Favorites {
            command: shelfdex::cli::FavoritesCommand::List(args),
        } => {
            shelfdex::favorites::run_list(args).context("favorites list")?;
        }
        shelfdex::cli::Command::Favorites {
            command: shelfdex::cli::FavoritesCommand::Toggle(args),
        } => {
            shelfdex::favorites::run_toggle(args).context("favorites toggle")?;
        }
    }

    Ok(())
}
