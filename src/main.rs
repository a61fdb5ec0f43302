use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

mod archive;
mod capture_time;
mod cli;
mod commands;
mod select;
mod utils;

use crate::capture_time::ToolKind;
use crate::cli::{Cli, Commands};
use crate::commands::rename::cmd_rename;
use crate::commands::upload::cmd_upload;
use crate::utils::{configure_logging, default_photo_dir, AppConfig, DEFAULT_LOG_FILE};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log to a file when run from an automation action rather than a shell.
    let log_file = cli.log_file.clone().or_else(|| {
        (!std::io::stdout().is_terminal()).then(|| PathBuf::from(DEFAULT_LOG_FILE))
    });
    configure_logging(cli.debug, log_file.as_deref())?;

    let photo_dir = match cli.photo_dir {
        Some(dir) => dir,
        None => default_photo_dir()?,
    };
    let config = AppConfig {
        upload_dir: cli
            .upload_dir
            .unwrap_or_else(|| photo_dir.join("Incoming")),
        photo_dir,
        flash_card: cli.flash_card,
        metadata_tool: cli.metadata_tool.unwrap_or_else(ToolKind::platform_default),
        dry_run: cli.dry_run,
    };
    log::debug!("{:?}", config);

    let res = match &cli.command {
        Commands::Rename { paths } => cmd_rename(&config, paths),
        Commands::Upload { cards, yes } => cmd_upload(&config, cards, *yes),
    };
    std::process::exit(exit_code(res));
}

/// Logs a fatal error once, where the rest of the run's output went.
fn exit_code(res: Result<()>) -> i32 {
    match res {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{:#}", e);
            1
        }
    }
}
