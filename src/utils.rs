use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{is_accepted_image, SCAN_EXTENSIONS};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .progress_chars("#>-"),
    );
    pb
}

/// Create a directory and its parents if they do not already exist.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

/// Filename stem as UTF-8, if the path has one.
pub fn file_stem_str(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

/// Accepted image files directly inside `dir`, sorted by path.
pub fn collect_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_accepted_image(path))
        .collect();
    images.sort();
    Ok(images)
}

/// Image files in `dir` matching the lowercase scan extensions, sorted.
pub fn scan_images(dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for ext in SCAN_EXTENSIONS {
        let pattern = format!("{}/*.{}", dir.display(), ext);
        match glob(&pattern) {
            Ok(entries) => paths.extend(entries.filter_map(|entry| entry.ok())),
            Err(e) => warn!("Bad glob pattern {}: {}", pattern, e),
        }
    }
    paths.sort();
    paths
}
