//! Moves media files into `<root>/<year>/<year>-<month>-<day>/`, named after
//! their capture time.
//!
//! Files shot within the same second get the suffixes `a` to `z` appended to
//! the timestamp, in the order they are processed. Nothing is ever
//! overwritten: a destination that turns up occupied at move time stops the
//! batch.

use crate::capture_time::Resolver;
use chrono::NaiveDateTime;
use filetime::FileTime;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DATE_SUBDIR: &str = "%Y/%Y-%m-%d";
pub const FILE_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Missing image dir: {}", .0.display())]
    MissingRoot(PathBuf),
    #[error("too many same-second collisions for {}", .0.display())]
    SuffixesExhausted(PathBuf),
    #[error("File exists somehow: {}", .0.display())]
    UnexpectedCollision(PathBuf),
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    fn io(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| ArchiveError::Io {
            action,
            path,
            source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub root: PathBuf,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moved { from: PathBuf, to: PathBuf },
    Planned { from: PathBuf, to: PathBuf },
    Missing { path: PathBuf },
}

#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
}

impl Report {
    pub fn moved(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Moved { .. }))
    }

    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Planned { .. }))
    }

    pub fn missing(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Missing { .. }))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(*o)).count()
    }
}

pub struct Archiver {
    options: ArchiveOptions,
    resolver: Resolver,
    exists: Box<dyn Fn(&Path) -> bool>,
}

impl Archiver {
    /// Fails with [`ArchiveError::MissingRoot`] unless the root is a directory.
    pub fn new(options: ArchiveOptions, resolver: Resolver) -> Result<Self, ArchiveError> {
        if !options.root.is_dir() {
            return Err(ArchiveError::MissingRoot(options.root));
        }
        Ok(Self {
            options,
            resolver,
            exists: Box::new(|p| p.exists()),
        })
    }

    #[cfg(test)]
    fn with_exists_check(mut self, exists: impl Fn(&Path) -> bool + 'static) -> Self {
        self.exists = Box::new(exists);
        self
    }

    pub fn archive(&self, sources: &[PathBuf]) -> Result<Report, ArchiveError> {
        let mut report = Report::default();
        // Destinations handed out in this batch; dry runs never create them on disk.
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for source in sources {
            if !source.is_file() {
                log::warn!("File does not exist: {}", source.display());
                report.outcomes.push(Outcome::Missing {
                    path: source.clone(),
                });
                continue;
            }

            let date = self
                .resolver
                .resolve(source)
                .map_err(ArchiveError::io("Failed to read", source))?;
            log::debug!(
                "Processing {} ({}) from {}",
                source.display(),
                extension(source),
                date
            );

            let outdir = self.options.root.join(date.format(DATE_SUBDIR).to_string());
            if !self.options.dry_run {
                fs::create_dir_all(&outdir)
                    .map_err(ArchiveError::io("Failed to create directory", &outdir))?;
            }

            let dest = allocate(&outdir, date, &extension(source), |p| {
                claimed.contains(p) || (self.exists)(p)
            })?;

            log::info!("{} -> {}", source.display(), dest.display());
            if (self.exists)(&dest) {
                return Err(ArchiveError::UnexpectedCollision(dest));
            }

            if self.options.dry_run {
                report.outcomes.push(Outcome::Planned {
                    from: source.clone(),
                    to: dest.clone(),
                });
            } else {
                move_file(source, &dest)?;
                report.outcomes.push(Outcome::Moved {
                    from: source.clone(),
                    to: dest.clone(),
                });
            }
            claimed.insert(dest);
        }

        Ok(report)
    }
}

/// Lowercased extension including the dot, or empty when there is none.
pub fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Picks the first free name out of `<ts><ext>`, `<ts>a<ext>` .. `<ts>z<ext>`.
pub fn allocate(
    outdir: &Path,
    date: NaiveDateTime,
    ext: &str,
    taken: impl Fn(&Path) -> bool,
) -> Result<PathBuf, ArchiveError> {
    let newname = date.format(FILE_FORMAT).to_string();
    let candidates = std::iter::once(String::new()).chain(('a'..='z').map(String::from));

    for suffix in candidates {
        let path = outdir.join(format!("{}{}{}", newname, suffix, ext));
        if !taken(&path) {
            return Ok(path);
        }
    }
    Err(ArchiveError::SuffixesExhausted(
        outdir.join(format!("{}{}", newname, ext)),
    ))
}

fn move_file(source: &Path, dest: &Path) -> Result<(), ArchiveError> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!("{} is on another device, copying", source.display());
            copy_then_remove(source, dest)
        }
        Err(e) => Err(ArchiveError::io("Failed to move", source)(e)),
    }
}

// Copies next to the destination first so an interrupted copy never sits at the final name.
fn copy_then_remove(source: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let partial = dest.with_file_name(format!(".{}.partial", name));

    let copy = || -> io::Result<()> {
        let mut reader = fs::File::open(source)?;
        let mut writer = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial)?;
        io::copy(&mut reader, &mut writer)?;
        writer.sync_all()?;
        let meta = fs::metadata(source)?;
        filetime::set_file_mtime(&partial, FileTime::from_last_modification_time(&meta))
    };
    if let Err(e) = copy() {
        let _ = fs::remove_file(&partial);
        return Err(ArchiveError::io("Failed to copy", source)(e));
    }

    if dest.exists() {
        let _ = fs::remove_file(&partial);
        return Err(ArchiveError::UnexpectedCollision(dest.to_path_buf()));
    }
    fs::rename(&partial, dest).map_err(ArchiveError::io("Failed to move", &partial))?;
    fs::remove_file(source).map_err(ArchiveError::io("Failed to remove", source))
}
