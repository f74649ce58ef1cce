use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use learnshell::cli::{Cli, Command, StateCommand};
use learnshell::commands::{self, Workspace};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let directive = if cli.verbose {
        "debug"
    } else {
        learnshell::logging::DEFAULT_DIRECTIVE
    };
    learnshell::logging::init(directive).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    let ws = Workspace::load(&cli)?;

    match cli.command {
        Command::Catalog(args) => {
            commands::catalog(&ws, args).context("catalog")?;
        }
        Command::Render(args) => {
            commands::render(&ws, args).await.context("render")?;
        }
        Command::Read(args) => {
            commands::read(&ws, args).context("read")?;
        }
        Command::SkipAuth => {
            commands::skip_auth(&ws).context("skip-auth")?;
        }
        Command::SelectTrack(args) => {
            commands::select_track(&ws, args).context("select-track")?;
        }
        Command::State {
            command: StateCommand::Show,
        } => {
            commands::state_show(&ws).context("state show")?;
        }
        Command::State {
            command: StateCommand::Set(args),
        } => {
            commands::state_set(&ws, args).context("state set")?;
        }
    }

    Ok(())
}
