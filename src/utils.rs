use crate::capture_time::ToolKind;
use anyhow::{Context, Result};
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// --- Constants & Config ---

pub const DEFAULT_FLASH_CARD: &str = "/Volumes/CAMERA*";
pub const DEFAULT_LOG_FILE: &str = "/tmp/camera-uploads.log";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub photo_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub flash_card: String,
    pub metadata_tool: ToolKind,
    pub dry_run: bool,
}

// --- Helpers ---

pub fn run_capture(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute {}", program))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("Command {} failed", program));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Fails unless `program` can be found on `PATH`.
pub fn require_tool(program: &str) -> Result<PathBuf> {
    which::which(program).with_context(|| format!("Error: Missing {}", program))
}

/// Default archive root: the user's Pictures directory.
pub fn default_photo_dir() -> Result<PathBuf> {
    let dirs = directories::UserDirs::new().context("Failed to locate home directory")?;
    Ok(dirs
        .picture_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dirs.home_dir().join("Pictures")))
}

/// Sets up env_logger with the format "LEVEL<TAB>message".
///
/// Output goes to `log_file` (appending) when given, otherwise to stderr.
/// Info covers the source -> destination lines, Debug adds per-file detail
/// and metadata fallbacks.
pub fn configure_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder.filter_level(level).format(|buf, record| {
        let style = buf.default_level_style(record.level());
        writeln!(
            buf,
            "{style}{}{style:#}\t{}",
            record.level(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        builder
            .target(Target::Pipe(Box::new(file)))
            .write_style(env_logger::WriteStyle::Never);
        colored::control::set_override(false);
    }

    builder.init();
    Ok(())
}
