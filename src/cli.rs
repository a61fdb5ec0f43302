use crate::capture_time::ToolKind;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photo_upload")]
#[command(about = "move photos off camera cards into a dated archive")]
pub struct Cli {
    /// Archive root [default: your Pictures directory]
    #[arg(long, global = true, env = "PHOTO_DIR")]
    pub photo_dir: Option<PathBuf>,

    /// Staging directory [default: <photo dir>/Incoming]
    #[arg(long, global = true, env = "UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Glob matching mounted camera cards
    #[arg(long, global = true, env = "FLASH_CARD", default_value = crate::utils::DEFAULT_FLASH_CARD)]
    pub flash_card: String,

    /// Tool used to read embedded capture dates [default: sips on macOS, else exiftool]
    #[arg(long, global = true, env = "PHOTO_METADATA_TOOL", value_enum)]
    pub metadata_tool: Option<ToolKind>,

    /// Log file, used when stdout is not a terminal or when given explicitly
    #[arg(long, global = true, env = "PHOTO_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Verbose logging; any DEBUG value other than 0/false/no/off enables it
    #[arg(long, global = true, env = "DEBUG", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Compute and log destinations without moving anything; TEST=1 enables it
    #[arg(long, global = true, env = "TEST", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Move photos into the archive, named after their capture time
    Rename {
        /// Files to archive [default: everything in the staging directory]
        paths: Vec<PathBuf>,
    },
    /// Archive every photo and video found on the attached camera card(s)
    Upload {
        /// Card roots to read from [default: every match of --flash-card]
        cards: Vec<PathBuf>,
        /// Do not ask for confirmation
        #[arg(short = 'y', long, default_value_t = false)]
        yes: bool,
    },
}
