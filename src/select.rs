use anyhow::{Context, Result};
use glob::{glob, glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Extensions picked up from a card, compared case-insensitively.
pub const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "mov", "mp4", "avi", "gif"];

/// Mounted card volumes matching `pattern`, e.g. `/Volumes/CAMERA*`.
pub fn find_cards(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("Invalid card pattern {:?}", pattern))?;
    Ok(paths
        .filter_map(|p| p.ok())
        .filter(|p| p.is_dir())
        .collect())
}

/// Every non-hidden entry directly inside the staging directory, sorted.
pub fn staged_files(staging: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*",
        Pattern::escape(staging.to_str().context("Path not UTF-8")?)
    );
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let paths = glob_with(&pattern, options)
        .with_context(|| format!("Invalid staging dir {:?}", staging))?;
    Ok(paths.filter_map(|p| p.ok()).collect())
}

pub fn is_media(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MEDIA_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

/// Walks `card`, pruning hidden directories, and returns the media files on it.
pub fn media_files(card: &Path) -> Vec<PathBuf> {
    WalkDir::new(card)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_media(e.path()))
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_is_media() {
        assert!(is_media(Path::new("IMG_0001.JPG")));
        assert!(is_media(Path::new("a/b/clip.Mov")));
        assert!(is_media(Path::new("x.jpeg")));
        assert!(!is_media(Path::new("notes.txt")));
        assert!(!is_media(Path::new("jpg")));
        assert!(!is_media(Path::new("RAW.CR2")));
    }

    #[test]
    fn test_media_files_skips_hidden_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let card = dir.path();
        let a = touch(card, "DCIM/100CANON/IMG_0001.JPG");
        let b = touch(card, "DCIM/100CANON/MVI_0002.MOV");
        let c = touch(card, "PRIVATE/clip.mp4");
        touch(card, ".Trashes/501/IMG_0003.JPG");
        touch(card, "DCIM/.thumbs/IMG_0001.jpg");
        touch(card, "DCIM/100CANON/IMG_0001.CR2");
        touch(card, "MISC/AUTPRINT.MRK");

        assert_eq!(media_files(card), vec![a, b, c]);
    }

    #[test]
    fn test_media_files_hidden_root_still_walked() {
        let dir = tempfile::tempdir().unwrap();
        let card = dir.path().join(".card");
        let img = touch(&card, "IMG_0001.jpg");
        assert_eq!(media_files(&card), vec![img]);
    }

    #[test]
    fn test_find_cards() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("CAMERA_A")).unwrap();
        fs::create_dir(dir.path().join("CAMERA_B")).unwrap();
        fs::create_dir(dir.path().join("Backup")).unwrap();
        touch(dir.path(), "CAMERA.txt");

        let pattern = format!("{}/CAMERA*", dir.path().display());
        assert_eq!(
            find_cards(&pattern).unwrap(),
            vec![dir.path().join("CAMERA_A"), dir.path().join("CAMERA_B")]
        );
    }

    #[test]
    fn test_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("In[coming]");
        let b = touch(&staging, "b.png");
        let a = touch(&staging, "a.JPG");
        touch(&staging, "nested/c.jpg");
        touch(&staging, ".DS_Store");

        assert_eq!(
            staged_files(&staging).unwrap(),
            vec![a, b, staging.join("nested")]
        );
    }
}
