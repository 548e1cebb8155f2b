mod error;
mod factory;
mod logging;
mod service_kind;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use puc_core::UpdateChecker;
use puc_platform::AppPaths;

use crate::error::AppError;
use crate::settings::CheckerSettings;

#[derive(Debug, Parser)]
#[command(name = "puc", version, about = "Check a WordPress plugin or theme for updates")]
struct Cli {
    /// Settings file to use instead of the one in the config directory.
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Log to the terminal as well as the log file.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Check for updates now and report the result.
    Check,
    /// Show the recorded state of the last check.
    Status,
    /// Print the cached update, if it applies to the installed version.
    Update,
    /// Forget all recorded state.
    Reset,
    /// Check only if the schedule says a check is due.
    MaybeCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            log::error!("{error}");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String, AppError> {
    let mut paths = AppPaths::new()?;
    let settings_path = cli.settings.unwrap_or_else(|| paths.settings_file());
    let settings = CheckerSettings::load(&settings_path);
    if let Some(state_dir) = &settings.state_dir {
        paths = paths.with_state_dir(state_dir.clone());
    }
    if let Err(error) = paths.ensure_dirs() {
        eprintln!("warning: could not create application directories: {error}");
    }

    logging::init_logging(
        &paths.log_file(),
        settings.debug_logging,
        cli.verbose,
        settings.max_log_size_bytes,
    );
    log::debug!("Loaded settings from {}", settings_path.display());

    let checker = factory::build_checker(&settings, &paths.state_dir)?;
    execute(&checker, cli.command).await
}

async fn execute(checker: &UpdateChecker, command: Command) -> Result<String, AppError> {
    let kind = checker.artifact().kind();
    let slug = checker.artifact().slug().to_string();

    match command {
        Command::Check => {
            let status = checker.check_now().await?;
            let mut output = status.message(kind);
            if let Some(update) = checker.get_update() {
                output.push_str(&format!("\n{slug} {} is available.", update.version));
            }
            Ok(output)
        }
        Command::Status => to_json(&checker.get_update_state()),
        Command::Update => match checker.get_update() {
            Some(update) => to_json(&update),
            None => Ok(format!("No update available for {slug}.")),
        },
        Command::Reset => {
            checker.reset_update_state()?;
            Ok(format!("Update state for {slug} cleared."))
        }
        Command::MaybeCheck => {
            if checker.maybe_check_for_updates().await? {
                Ok(format!("Checked {slug} for updates."))
            } else {
                Ok(format!("No check due for {slug}."))
            }
        }
    }
}

fn to_json(value: &impl serde::Serialize) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::Io {
        kind: std::io::ErrorKind::InvalidData,
        message: e.to_string(),
    })
}
