use std::path::Path;

// Image extensions accepted by the merge scans. Matching is exact, so both
// spellings of each format are listed.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "JPG", "JPEG", "PNG", "BMP",
];

// Lowercase extensions used by the stats and preview glob scans.
pub const SCAN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

// Splits present in the destination tree after a merge.
pub const DEST_SPLITS: &[&str] = &["train", "validation"];

/// True when the path carries one of the accepted image extensions.
pub fn is_accepted_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

// Struct to hold merge run statistics
#[derive(Debug, Default, Clone)]
pub struct MergeStats {
    pub images_copied: usize,
    pub labels_remapped: usize,
    pub labels_verbatim: usize,
    pub label_fallbacks: usize,
    pub images_without_labels: usize,
    pub files_failed: usize,
}

impl MergeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_summary(&self) {
        log::info!("=== Merge Summary ===");
        log::info!("Images copied: {}", self.images_copied);
        log::info!("Labels remapped: {}", self.labels_remapped);
        log::info!("Labels copied verbatim: {}", self.labels_verbatim);
        log::info!("Images without labels: {}", self.images_without_labels);

        if self.label_fallbacks > 0 {
            log::warn!(
                "Label rewrites that fell back to a verbatim copy: {}",
                self.label_fallbacks
            );
        }
        if self.files_failed > 0 {
            log::warn!("Files skipped after copy errors: {}", self.files_failed);
        }
    }
}
