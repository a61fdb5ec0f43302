use crate::archive::{ArchiveOptions, Archiver, Report};
use crate::capture_time::Resolver;
use crate::select::staged_files;
use crate::utils::{require_tool, AppConfig};
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

pub fn cmd_rename(config: &AppConfig, paths: &[PathBuf]) -> Result<()> {
    let photos = if paths.is_empty() {
        log::debug!("No files given, reading {}", config.upload_dir.display());
        staged_files(&config.upload_dir)?
    } else {
        paths.to_vec()
    };

    if photos.is_empty() {
        println!("No photos to archive.");
        return Ok(());
    }

    archive_photos(config, &photos)?;
    Ok(())
}

/// Moves `photos` into the archive and prints a summary.
pub fn archive_photos(config: &AppConfig, photos: &[PathBuf]) -> Result<Report> {
    let tool = config.metadata_tool.build();
    require_tool(tool.program())?;

    let options = ArchiveOptions {
        root: config.photo_dir.clone(),
        dry_run: config.dry_run,
    };
    let archiver = Archiver::new(options, Resolver::new(tool))?;
    let report = archiver.archive(photos)?;

    print_summary(&report, config.dry_run);
    Ok(report)
}

fn print_summary(report: &Report, dry_run: bool) {
    let done = if dry_run {
        format!("DRY-RUN: {} file(s) would be moved", report.planned()).green()
    } else {
        format!("{} file(s) moved", report.moved()).bold()
    };
    println!("{}", done);

    if report.missing() > 0 {
        println!(
            "{}",
            format!("{} path(s) skipped, not a file", report.missing()).yellow()
        );
    }
}
