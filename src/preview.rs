use image::{Rgb, RgbImage};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::Path;

use crate::config::PreviewArgs;
use crate::types::DEST_SPLITS;
use crate::utils::{ensure_dir, file_stem_str, scan_images};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: u32 = 2;

/// Convert a normalized center-format box to clamped pixel corners.
///
/// Returns None when the box collapses to nothing inside the image.
fn denormalize_box(cx: f64, cy: f64, w: f64, h: f64, width: u32, height: u32) -> Option<[u32; 4]> {
    if width == 0 || height == 0 {
        return None;
    }
    let max_x = f64::from(width - 1);
    let max_y = f64::from(height - 1);
    let x1 = ((cx - w / 2.0) * f64::from(width)).round().clamp(0.0, max_x) as u32;
    let y1 = ((cy - h / 2.0) * f64::from(height)).round().clamp(0.0, max_y) as u32;
    let x2 = ((cx + w / 2.0) * f64::from(width)).round().clamp(0.0, max_x) as u32;
    let y2 = ((cy + h / 2.0) * f64::from(height)).round().clamp(0.0, max_y) as u32;
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some([x1, y1, x2, y2])
}

/// Draw an unfilled rectangle outline, rings growing inward.
fn draw_rect(image: &mut RgbImage, bounds: [u32; 4]) {
    let [x1, y1, x2, y2] = bounds;
    for ring in 0..BOX_THICKNESS {
        let left = x1.saturating_add(ring).min(x2);
        let right = x2.saturating_sub(ring).max(x1);
        let top = y1.saturating_add(ring).min(y2);
        let bottom = y2.saturating_sub(ring).max(y1);
        for x in left..=right {
            image.put_pixel(x, top, BOX_COLOR);
            image.put_pixel(x, bottom, BOX_COLOR);
        }
        for y in top..=bottom {
            image.put_pixel(left, y, BOX_COLOR);
            image.put_pixel(right, y, BOX_COLOR);
        }
    }
}

fn parse_box_fields(fields: &[&str]) -> Option<[f64; 4]> {
    let mut values = [0.0f64; 4];
    for (slot, field) in values.iter_mut().zip(&fields[1..5]) {
        *slot = field.parse().ok()?;
    }
    Some(values)
}

/// Render labelled images of one split with their boxes drawn on top.
///
/// Output files are named `<stem>_preview.jpg`. Images without a label
/// file are skipped. Returns how many previews were written.
pub fn render_split(
    images_dir: &Path,
    labels_dir: &Path,
    out_dir: &Path,
    max_images: usize,
) -> io::Result<usize> {
    let mut images = scan_images(images_dir);
    images.truncate(max_images);
    ensure_dir(out_dir)?;

    let mut rendered = 0;
    for path in &images {
        let stem = match file_stem_str(path) {
            Some(stem) => stem,
            None => continue,
        };
        let content = match fs::read_to_string(labels_dir.join(format!("{}.txt", stem))) {
            Ok(content) => content,
            Err(_) => {
                info!("No label for {}; skipping", path.display());
                continue;
            }
        };
        let mut canvas = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                warn!("Failed to decode {}: {}", path.display(), e);
                continue;
            }
        };
        let (width, height) = canvas.dimensions();
        for line in content.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 5 {
                if !fields.is_empty() {
                    warn!("Malformed label line for {}: {}", path.display(), line);
                }
                continue;
            }
            let parsed = match parse_box_fields(&fields) {
                Some(parsed) => parsed,
                None => {
                    warn!("Malformed label line for {}: {}", path.display(), line);
                    continue;
                }
            };
            if let Some(bounds) =
                denormalize_box(parsed[0], parsed[1], parsed[2], parsed[3], width, height)
            {
                draw_rect(&mut canvas, bounds);
            }
        }
        let out_path = out_dir.join(format!("{}_preview.jpg", stem));
        if let Err(e) = canvas.save(&out_path) {
            warn!("Failed to save {}: {}", out_path.display(), e);
            continue;
        }
        rendered += 1;
    }
    Ok(rendered)
}

pub fn run(args: &PreviewArgs) -> io::Result<()> {
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
        let out_dir = args.out_dir.join(format!("preview_{}", split));
        let rendered = render_split(&images_dir, &labels_dir, &out_dir, args.max_images)?;
        info!(
            "Rendered {} previews for split '{}' into {}",
            rendered,
            split,
            out_dir.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denormalize_centers_and_clamps() {
        assert_eq!(
            denormalize_box(0.5, 0.5, 0.5, 0.5, 100, 100),
            Some([25, 25, 75, 75])
        );
        assert_eq!(
            denormalize_box(0.25, 0.25, 0.5, 0.5, 100, 100),
            Some([0, 0, 50, 50])
        );
        assert_eq!(denormalize_box(1.5, 0.5, 0.5, 0.5, 100, 100), None);
        assert_eq!(denormalize_box(0.5, 0.5, 0.0, 0.0, 100, 100), None);
    }

    #[test]
    fn draw_rect_outlines_without_filling() {
        let mut canvas = RgbImage::new(10, 10);
        draw_rect(&mut canvas, [2, 2, 7, 7]);

        assert_eq!(*canvas.get_pixel(2, 2), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(3, 3), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(2, 5), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(7, 7), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn renders_preview_file() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        let out = dir.path().join("out");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        RgbImage::new(20, 20).save(images.join("a.png")).unwrap();
        fs::write(labels.join("a.txt"), "0 0.5 0.5 0.5 0.5\n").unwrap();

        let rendered = render_split(&images, &labels, &out, 200).unwrap();

        assert_eq!(rendered, 1);
        assert!(out.join("a_preview.jpg").exists());
    }

    #[test]
    fn unlabelled_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        let out = dir.path().join("out");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        RgbImage::new(20, 20).save(images.join("a.png")).unwrap();

        let rendered = render_split(&images, &labels, &out, 200).unwrap();

        assert_eq!(rendered, 0);
        assert!(!out.join("a_preview.jpg").exists());
    }
}
