use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::StatsArgs;
use crate::types::DEST_SPLITS;
use crate::utils::{file_stem_str, scan_images};

/// Raw per-box pixel measurements for one split.
#[derive(Debug, Default)]
pub struct BoxSizes {
    pub widths: Vec<f64>,
    pub heights: Vec<f64>,
    pub areas: Vec<f64>,
}

/// Aggregated box statistics for one split.
#[derive(Debug, Serialize)]
pub struct BoxSummary {
    pub boxes: usize,
    pub width_mean: f64,
    pub width_median: f64,
    pub height_mean: f64,
    pub height_median: f64,
    pub height_p25: f64,
    pub height_p75: f64,
    pub area_median: f64,
    pub suggestion: &'static str,
}

/// Collect pixel-space box sizes from every labelled image in a split.
///
/// Image dimensions come from the headers only, so no pixel data is
/// decoded. Images whose dimensions or labels cannot be read are skipped.
pub fn gather_box_sizes(images_dir: &Path, labels_dir: &Path, limit: Option<usize>) -> BoxSizes {
    let mut sizes = BoxSizes::default();
    for (index, image) in scan_images(images_dir).iter().enumerate() {
        if let Some(limit) = limit {
            if index >= limit {
                break;
            }
        }
        let dims = match imagesize::size(image) {
            Ok(dims) => dims,
            Err(e) => {
                warn!("Failed to read dimensions of {}: {}", image.display(), e);
                continue;
            }
        };
        let stem = match file_stem_str(image) {
            Some(stem) => stem,
            None => continue,
        };
        let content = match fs::read_to_string(labels_dir.join(format!("{}.txt", stem))) {
            Ok(content) => content,
            Err(_) => continue,
        };
        for line in content.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                continue;
            }
            let mut values = [0.0f64; 5];
            let mut parsed = true;
            for (slot, field) in values.iter_mut().zip(&fields) {
                match field.parse::<f64>() {
                    Ok(value) => *slot = value,
                    Err(_) => {
                        parsed = false;
                        break;
                    }
                }
            }
            if !parsed {
                continue;
            }
            let width = values[3] * dims.width as f64;
            let height = values[4] * dims.height as f64;
            sizes.widths.push(width);
            sizes.heights.push(height);
            sizes.areas.push(width * height);
        }
    }
    sizes
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear-interpolated percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let k = (sorted.len() - 1) as f64 * q / 100.0;
    let lower = k.floor() as usize;
    let upper = k.ceil() as usize;
    let weight = k - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Training image size suggested by the median box height in pixels.
pub fn recommend_image_size(height_median: f64) -> &'static str {
    if height_median < 16.0 {
        "imgsz >= 1024 (1280 recommended)"
    } else if height_median < 32.0 {
        "imgsz 640-1024"
    } else if height_median < 64.0 {
        "imgsz 512-640"
    } else {
        "imgsz 416-640 (standard)"
    }
}

/// Reduce raw measurements to a summary, or None when no boxes were seen.
pub fn summarize(mut sizes: BoxSizes) -> Option<BoxSummary> {
    if sizes.widths.is_empty() {
        return None;
    }
    sizes.widths.sort_by(|a, b| a.total_cmp(b));
    sizes.heights.sort_by(|a, b| a.total_cmp(b));
    sizes.areas.sort_by(|a, b| a.total_cmp(b));

    let height_median = percentile(&sizes.heights, 50.0);
    Some(BoxSummary {
        boxes: sizes.widths.len(),
        width_mean: mean(&sizes.widths),
        width_median: percentile(&sizes.widths, 50.0),
        height_mean: mean(&sizes.heights),
        height_median,
        height_p25: percentile(&sizes.heights, 25.0),
        height_p75: percentile(&sizes.heights, 75.0),
        area_median: percentile(&sizes.areas, 50.0),
        suggestion: recommend_image_size(height_median),
    })
}

pub fn run(args: &StatsArgs) -> io::Result<()> {
    let mut report: BTreeMap<&str, BoxSummary> = BTreeMap::new();
    for &split in DEST_SPLITS {
        let images_dir = args.data_dir.join(split).join("images");
        let labels_dir = args.data_dir.join(split).join("labels");
        if !images_dir.is_dir() {
            info!(
                "Split '{}' not found under {}; skipping",
                split,
                args.data_dir.display()
            );
            continue;
        }
        let sizes = gather_box_sizes(&images_dir, &labels_dir, args.limit);
        match summarize(sizes) {
            Some(summary) => {
                report.insert(split, summary);
            }
            None => info!("Split '{}' has no boxes to measure", split),
        }
    }

    if args.json {
        let body = serde_json::to_string_pretty(&report)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        println!("{}", body);
        return Ok(());
    }

    for (split, summary) in &report {
        info!("=== Box statistics: {} ===", split);
        info!("Boxes measured: {}", summary.boxes);
        info!(
            "Width px: mean {:.1}, median {:.1}",
            summary.width_mean, summary.width_median
        );
        info!(
            "Height px: mean {:.1}, median {:.1} (p25 {:.1}, p75 {:.1})",
            summary.height_mean, summary.height_median, summary.height_p25, summary.height_p75
        );
        info!("Area px^2: median {:.1}", summary.area_median);
        info!("Suggested training size: {}", summary.suggestion);
    }
    Ok(())
}
