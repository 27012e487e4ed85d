use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use log::{info, warn};
use std::fs;
use std::io;

use crate::config::PreprocessArgs;
use crate::types::DEST_SPLITS;
use crate::utils::{collect_images, create_progress_bar, ensure_dir, file_stem_str};

/// Gray-world white balance: scale each channel so its mean matches the
/// overall gray mean.
fn white_balance(image: &mut RgbImage) {
    let pixel_count = u64::from(image.width()) * u64::from(image.height());
    if pixel_count == 0 {
        return;
    }
    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += u64::from(channel);
        }
    }
    let means = sums.map(|sum| sum as f64 / pixel_count as f64);
    let gray = (means[0] + means[1] + means[2]) / 3.0;
    if gray == 0.0 {
        return;
    }
    let gains = means.map(|mean| if mean > 0.0 { gray / mean } else { 1.0 });
    for pixel in image.pixels_mut() {
        for (channel, gain) in pixel.0.iter_mut().zip(gains) {
            *channel = (f64::from(*channel) * gain).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)).round() as u8
}

/// Histogram-equalize the luma channel, scaling RGB to follow it.
fn equalize_contrast(image: &mut RgbImage) {
    let pixel_count = u64::from(image.width()) * u64::from(image.height());
    if pixel_count == 0 {
        return;
    }
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[usize::from(luma(pixel))] += 1;
    }
    let mut lut = [0u8; 256];
    let mut cumulative = 0u64;
    for (level, count) in histogram.iter().enumerate() {
        cumulative += count;
        lut[level] = (cumulative * 255 / pixel_count) as u8;
    }
    for pixel in image.pixels_mut() {
        let old = luma(pixel);
        if old == 0 {
            continue;
        }
        let scale = f64::from(lut[usize::from(old)]) / f64::from(old);
        for channel in pixel.0.iter_mut() {
            *channel = (f64::from(*channel) * scale).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Apply gamma correction through a per-level lookup table.
fn apply_gamma(image: &mut RgbImage, gamma: f32) {
    if (gamma - 1.0).abs() < f32::EPSILON {
        return;
    }
    let inverse = 1.0 / f64::from(gamma);
    let mut lut = [0u8; 256];
    for (level, slot) in lut.iter_mut().enumerate() {
        let normalized = level as f64 / 255.0;
        *slot = (normalized.powf(inverse) * 255.0).round() as u8;
    }
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = lut[usize::from(*channel)];
        }
    }
}

/// Scale the image to fit a size x size square and pad the rest with
/// black, anchored at the top-left corner.
fn letterbox(image: &RgbImage, size: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    if size == 0 || width == 0 || height == 0 {
        return RgbImage::new(size, size);
    }
    let scale = f64::from(size) / f64::from(width.max(height));
    let new_width = ((f64::from(width) * scale).round() as u32).clamp(1, size);
    let new_height = ((f64::from(height) * scale).round() as u32).clamp(1, size);
    let resized = imageops::resize(image, new_width, new_height, FilterType::Triangle);
    let mut canvas = RgbImage::new(size, size);
    imageops::replace(&mut canvas, &resized, 0, 0);
    canvas
}

/// Run the full enhancement chain on one decoded image.
pub fn process_image(mut image: RgbImage, size: u32, gamma: f32) -> RgbImage {
    white_balance(&mut image);
    equalize_contrast(&mut image);
    apply_gamma(&mut image, gamma);
    letterbox(&image, size)
}

/// Preprocess every split into a parallel output tree.
///
/// Labels are copied verbatim; the top-left letterbox anchor means boxes
/// stay aligned with the scaled content only for square sources, matching
/// how the output is meant to be consumed together with the original tree.
pub fn run(args: &PreprocessArgs) -> io::Result<()> {
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
        let out_images = args.out_dir.join(split).join("images");
        let out_labels = args.out_dir.join(split).join("labels");
        ensure_dir(&out_images)?;
        ensure_dir(&out_labels)?;

        let images = collect_images(&images_dir)?;
        let pb = create_progress_bar(images.len() as u64, split);
        let mut processed = 0;
        for path in &images {
            pb.inc(1);
            let decoded = match image::open(path) {
                Ok(img) => img.to_rgb8(),
                Err(e) => {
                    warn!("Failed to decode {}: {}", path.display(), e);
                    continue;
                }
            };
            let result = process_image(decoded, args.size, args.gamma);
            let file_name = match path.file_name() {
                Some(name) => name,
                None => continue,
            };
            if let Err(e) = result.save(out_images.join(file_name)) {
                warn!("Failed to save processed {}: {}", path.display(), e);
                continue;
            }
            if let Some(stem) = file_stem_str(path) {
                let label = labels_dir.join(format!("{}.txt", stem));
                if label.is_file() {
                    fs::copy(&label, out_labels.join(format!("{}.txt", stem)))?;
                }
            }
            processed += 1;
        }
        pb.finish();
        info!("Preprocessed {} images for split '{}'", processed, split);
    }
    Ok(())
}
