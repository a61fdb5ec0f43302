use crate::utils::run_capture;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use clap::ValueEnum;
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

/// Layout of embedded creation dates as printed by exiftool and sips.
pub const METADATA_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

static NO_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)error|<nil>").unwrap());
// Subseconds and zone exiftool may print after the seconds.
static TRAILER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap());

/// Something that can read the raw creation date embedded in a media file.
pub trait MetadataTool {
    /// Executable name, used for the availability check.
    fn program(&self) -> &'static str;

    /// Returns the raw creation date string, e.g. `2024:03:05 14:30:00`.
    fn creation_date(&self, path: &Path) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToolKind {
    Exiftool,
    Sips,
}

impl ToolKind {
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            ToolKind::Sips
        } else {
            ToolKind::Exiftool
        }
    }

    pub fn build(self) -> Box<dyn MetadataTool> {
        match self {
            ToolKind::Exiftool => Box::new(Exiftool),
            ToolKind::Sips => Box::new(Sips),
        }
    }
}

pub struct Exiftool;

impl MetadataTool for Exiftool {
    fn program(&self) -> &'static str {
        "exiftool"
    }

    fn creation_date(&self, path: &Path) -> Result<String> {
        let file = path.to_str().context("Path not UTF-8")?;
        let output = run_capture(self.program(), &exiftool_args(file))?;
        first_value(&output).context("exiftool printed no creation date")
    }
}

// Videos only carry CreateDate, stored in UTC; QuickTimeUTC makes exiftool print it as local time.
fn exiftool_args(file: &str) -> Vec<&str> {
    vec![
        "-s3",
        "-api",
        "QuickTimeUTC",
        "-DateTimeOriginal",
        "-CreateDate",
        file,
    ]
}

pub struct Sips;

impl MetadataTool for Sips {
    fn program(&self) -> &'static str {
        "sips"
    }

    fn creation_date(&self, path: &Path) -> Result<String> {
        let file = path.to_str().context("Path not UTF-8")?;
        let output = run_capture(self.program(), &["-g", "creation", file])?;
        sips_value(&output).context("sips printed no creation line")
    }
}

/// First line that holds a usable date; placeholders like `0000:00:00 00:00:00` are skipped.
fn first_value(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| parse_capture_time(l).is_ok())
        .map(str::to_string)
}

// sips echoes the file path first, then "  creation: <value>".
fn sips_value(output: &str) -> Option<String> {
    let line = output.lines().nth(1)?.trim();
    Some(line.strip_prefix("creation:").unwrap_or(line).trim().to_string())
}

/// Parses a raw creation date, rejecting the "no value" markers tools print.
pub fn parse_capture_time(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() || NO_VALUE_RE.is_match(raw) {
        return Err(anyhow::anyhow!("no creation date: {:?}", raw));
    }
    let (ts, rest) = NaiveDateTime::parse_and_remainder(raw, METADATA_FORMAT)
        .with_context(|| format!("unparseable creation date: {:?}", raw))?;
    if !TRAILER_RE.is_match(rest) {
        return Err(anyhow::anyhow!("unparseable creation date: {:?}", raw));
    }
    Ok(ts)
}

pub fn modified_time(path: &Path) -> io::Result<NaiveDateTime> {
    let mtime = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(mtime).naive_local())
}

/// Resolves capture timestamps, preferring embedded metadata over mtime.
pub struct Resolver {
    tool: Box<dyn MetadataTool>,
}

impl Resolver {
    pub fn new(tool: Box<dyn MetadataTool>) -> Self {
        Self { tool }
    }

    /// Never fails on bad metadata; only a failed stat of `path` is returned.
    pub fn resolve(&self, path: &Path) -> io::Result<NaiveDateTime> {
        let embedded = self
            .tool
            .creation_date(path)
            .and_then(|raw| parse_capture_time(&raw));

        match embedded {
            Ok(ts) => Ok(ts),
            Err(e) => {
                log::debug!("{}: {:#}, using modification time", path.display(), e);
                modified_time(path)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeTool;
    use super::*;
    use chrono::NaiveDate;
    use filetime::FileTime;
    use std::fs;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn touch(dir: &Path, name: &str, when: NaiveDateTime) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"data").unwrap();
        let local = when.and_local_timezone(Local).single().unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(local.timestamp(), 0)).unwrap();
        path
    }

    #[test]
    fn test_parse_capture_time() {
        assert_eq!(
            parse_capture_time("2024:03:05 14:30:00").unwrap(),
            ts(2024, 3, 5, 14, 30, 0)
        );
        assert_eq!(
            parse_capture_time("  2023:12:31 23:59:59\n").unwrap(),
            ts(2023, 12, 31, 23, 59, 59)
        );
        assert!(parse_capture_time("").is_err());
        assert!(parse_capture_time("<nil>").is_err());
        assert!(parse_capture_time("Error: file not found").is_err());
        assert!(parse_capture_time("2024-03-05").is_err());
    }

    #[test]
    fn test_sips_value() {
        let out = "/Volumes/CAMERA/DCIM/IMG_01.JPG\n  creation: 2024:03:05 14:30:00";
        assert_eq!(sips_value(out).as_deref(), Some("2024:03:05 14:30:00"));
        assert_eq!(sips_value("/only/the/path"), None);

        let nil = "/x.png\n  creation: <nil>";
        assert!(parse_capture_time(&sips_value(nil).unwrap()).is_err());
    }

    #[test]
    fn test_first_value() {
        assert_eq!(
            first_value("\n2024:03:05 14:30:00\n2024:03:05 13:30:00").as_deref(),
            Some("2024:03:05 14:30:00")
        );
        assert_eq!(first_value("  \n"), None);
    }

    #[test]
    fn test_first_value_skips_placeholder() {
        assert_eq!(
            first_value("0000:00:00 00:00:00\n2024:03:06 00:30:00+01:00").as_deref(),
            Some("2024:03:06 00:30:00+01:00")
        );
        assert_eq!(first_value("0000:00:00 00:00:00"), None);
    }

    #[test]
    fn test_exiftool_args_convert_quicktime_to_local() {
        let args = exiftool_args("/card/clip.mp4");
        assert_eq!(
            args,
            vec![
                "-s3",
                "-api",
                "QuickTimeUTC",
                "-DateTimeOriginal",
                "-CreateDate",
                "/card/clip.mp4"
            ]
        );
    }

    #[test]
    fn test_parse_capture_time_with_zone() {
        assert_eq!(
            parse_capture_time("2024:03:06 00:30:00+01:00").unwrap(),
            ts(2024, 3, 6, 0, 30, 0)
        );
        assert_eq!(
            parse_capture_time("2024:03:05 14:30:00.25").unwrap(),
            ts(2024, 3, 5, 14, 30, 0)
        );
        assert!(parse_capture_time("2024:03:05 14:30:00 and change").is_err());
    }

    #[test]
    fn test_resolve_prefers_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "IMG_01.JPG", ts(2020, 1, 1, 0, 0, 0));
        let resolver = Resolver::new(Box::new(
            FakeTool::default().with("IMG_01.JPG", "2024:03:05 14:30:00"),
        ));

        assert_eq!(resolver.resolve(&path).unwrap(), ts(2024, 3, 5, 14, 30, 0));
    }

    #[test]
    fn test_resolve_falls_back_to_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let mtime = ts(2023, 11, 1, 8, 0, 0);
        let failing = touch(dir.path(), "failing.jpg", mtime);
        let nil = touch(dir.path(), "nil.jpg", mtime);
        let garbage = touch(dir.path(), "garbage.jpg", mtime);
        let empty = touch(dir.path(), "empty.jpg", mtime);

        let resolver = Resolver::new(Box::new(
            FakeTool::default()
                .with("nil.jpg", "<nil>")
                .with("garbage.jpg", "yesterday at noon")
                .with("empty.jpg", ""),
        ));

        for path in [failing, nil, garbage, empty] {
            assert_eq!(resolver.resolve(&path).unwrap(), mtime, "{:?}", path);
        }
    }

    #[test]
    fn test_resolve_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = Resolver::new(Box::new(FakeTool::default()));
        assert!(resolver.resolve(&dir.path().join("gone.jpg")).is_err());
    }
}
