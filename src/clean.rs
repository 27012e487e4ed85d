use log::{info, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::CleanArgs;
use crate::types::{DEST_SPLITS, IMAGE_EXTENSIONS};
use crate::utils::{collect_images, file_stem_str};

/// Remove the label file for `stem` if one exists.
fn remove_label_for_stem(labels_dir: &Path, stem: &str) -> io::Result<()> {
    let label = labels_dir.join(format!("{}.txt", stem));
    if label.is_file() {
        fs::remove_file(label)?;
    }
    Ok(())
}

/// Find the image that pairs with `stem`, trying each accepted extension.
fn find_image_for_stem(images_dir: &Path, stem: &str) -> Option<PathBuf> {
    for ext in IMAGE_EXTENSIONS {
        let candidate = images_dir.join(format!("{}.{}", stem, ext));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Every line must carry exactly five numeric fields with the four
/// coordinates inside [0, 1]. Empty content is valid; a blank line is not.
fn label_content_is_valid(content: &str) -> bool {
    content.lines().all(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return false;
        }
        fields
            .iter()
            .enumerate()
            .all(|(i, field)| match field.parse::<f64>() {
                Ok(value) => i == 0 || (0.0..=1.0).contains(&value),
                Err(_) => false,
            })
    })
}

/// Remove images that have no matching label file.
pub fn clean_missing_labels(images_dir: &Path, labels_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for image in collect_images(images_dir)? {
        let stem = match file_stem_str(&image) {
            Some(stem) => stem.to_owned(),
            None => continue,
        };
        if !labels_dir.join(format!("{}.txt", stem)).is_file() {
            info!("Removing {} (no label)", image.display());
            fs::remove_file(&image)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Remove malformed label files together with their images. Labels that
/// cannot be read are warned about and left in place.
pub fn clean_corrupt_labels(images_dir: &Path, labels_dir: &Path) -> io::Result<usize> {
    if !labels_dir.is_dir() {
        return Ok(0);
    }
    let mut labels: Vec<PathBuf> = fs::read_dir(labels_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    labels.sort();

    let mut removed = 0;
    for label in labels {
        let content = match fs::read_to_string(&label) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", label.display(), e);
                continue;
            }
        };
        if label_content_is_valid(&content) {
            continue;
        }
        info!("Removing corrupt label {}", label.display());
        let stem = file_stem_str(&label).map(str::to_owned);
        fs::remove_file(&label)?;
        if let Some(stem) = stem {
            if let Some(image) = find_image_for_stem(images_dir, &stem) {
                fs::remove_file(image)?;
            }
        }
        removed += 1;
    }
    Ok(removed)
}

/// Remove images that cannot be decoded, together with their labels.
pub fn clean_corrupt_images(images_dir: &Path, labels_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for image in collect_images(images_dir)? {
        if image::open(&image).is_ok() {
            continue;
        }
        info!("Removing undecodable image {}", image.display());
        let stem = file_stem_str(&image).map(str::to_owned);
        fs::remove_file(&image)?;
        if let Some(stem) = stem {
            remove_label_for_stem(labels_dir, &stem)?;
        }
        removed += 1;
    }
    Ok(removed)
}

/// Remove byte-identical duplicate images, keeping the first in sorted
/// path order. The duplicate's label is removed as well.
pub fn remove_duplicates(images_dir: &Path, labels_dir: &Path) -> io::Result<usize> {
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut removed = 0;
    for image in collect_images(images_dir)? {
        let bytes = match fs::read(&image) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read {}: {}", image.display(), e);
                continue;
            }
        };
        let digest = format!("{:x}", Sha256::digest(&bytes));
        if let Some(original) = seen.get(&digest) {
            info!(
                "Removing duplicate {} (same content as {})",
                image.display(),
                original.display()
            );
            let stem = file_stem_str(&image).map(str::to_owned);
            fs::remove_file(&image)?;
            if let Some(stem) = stem {
                remove_label_for_stem(labels_dir, &stem)?;
            }
            removed += 1;
        } else {
            seen.insert(digest, image);
        }
    }
    Ok(removed)
}

/// Run all four sweeps over every destination split that exists.
pub fn run(args: &CleanArgs) -> io::Result<()> {
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
        let missing = clean_missing_labels(&images_dir, &labels_dir)?;
        let bad_labels = clean_corrupt_labels(&images_dir, &labels_dir)?;
        let bad_images = clean_corrupt_images(&images_dir, &labels_dir)?;
        let duplicates = remove_duplicates(&images_dir, &labels_dir)?;
        info!(
            "Cleaned split '{}': {} without labels, {} corrupt labels, {} corrupt images, {} duplicates",
            split, missing, bad_labels, bad_images, duplicates
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pair(dir: &Path, stem: &str, image_bytes: &[u8], label: &str) {
        fs::write(dir.join("images").join(format!("{}.jpg", stem)), image_bytes).unwrap();
        fs::write(dir.join("labels").join(format!("{}.txt", stem)), label).unwrap();
    }

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        (dir, images, labels)
    }

    #[test]
    fn removes_image_without_label() {
        let (dir, images, labels) = setup();
        make_pair(dir.path(), "kept", b"a", "0 0.5 0.5 0.1 0.1\n");
        fs::write(images.join("orphan.jpg"), b"b").unwrap();

        let removed = clean_missing_labels(&images, &labels).unwrap();

        assert_eq!(removed, 1);
        assert!(!images.join("orphan.jpg").exists());
        assert!(images.join("kept.jpg").exists());
    }

    #[test]
    fn label_validation_is_strict() {
        assert!(label_content_is_valid("0 0.5 0.5 0.1 0.1\n"));
        assert!(label_content_is_valid(""));
        assert!(!label_content_is_valid("0 0.5 0.5 0.1 0.1\n\n"));
        assert!(!label_content_is_valid("0 0.5 0.5 0.1\n"));
        assert!(!label_content_is_valid("0 1.5 0.5 0.1 0.1\n"));
        assert!(!label_content_is_valid("x 0.5 0.5 0.1 0.1\n"));
    }

    #[test]
    fn removes_corrupt_label_and_its_image() {
        let (dir, images, labels) = setup();
        make_pair(dir.path(), "good", b"a", "0 0.5 0.5 0.1 0.1\n");
        make_pair(dir.path(), "bad", b"b", "0 0.5 oops 0.1 0.1\n");

        let removed = clean_corrupt_labels(&images, &labels).unwrap();

        assert_eq!(removed, 1);
        assert!(!labels.join("bad.txt").exists());
        assert!(!images.join("bad.jpg").exists());
        assert!(labels.join("good.txt").exists());
        assert!(images.join("good.jpg").exists());
    }

    #[test]
    fn unreadable_label_is_kept() {
        let (dir, images, labels) = setup();
        make_pair(dir.path(), "good", b"a", "0 0.5 0.5 0.1 0.1\n");
        fs::write(images.join("odd.jpg"), b"b").unwrap();
        fs::write(labels.join("odd.txt"), [0xff, 0xfe, 0x00]).unwrap();

        let removed = clean_corrupt_labels(&images, &labels).unwrap();

        assert_eq!(removed, 0);
        assert!(labels.join("odd.txt").exists());
        assert!(images.join("odd.jpg").exists());
    }

    #[test]
    fn removes_undecodable_image() {
        let (dir, images, labels) = setup();
        image::RgbImage::new(4, 4)
            .save(images.join("real.png"))
            .unwrap();
        fs::write(labels.join("real.txt"), "0 0.5 0.5 0.1 0.1\n").unwrap();
        make_pair(dir.path(), "fake", b"not an image", "0 0.5 0.5 0.1 0.1\n");

        let removed = clean_corrupt_images(&images, &labels).unwrap();

        assert_eq!(removed, 1);
        assert!(!images.join("fake.jpg").exists());
        assert!(!labels.join("fake.txt").exists());
        assert!(images.join("real.png").exists());
    }

    #[test]
    fn keeps_first_duplicate_in_sorted_order() {
        let (dir, images, labels) = setup();
        make_pair(dir.path(), "a", b"same bytes", "0 0.5 0.5 0.1 0.1\n");
        make_pair(dir.path(), "b", b"same bytes", "0 0.5 0.5 0.1 0.1\n");
        make_pair(dir.path(), "c", b"different", "0 0.5 0.5 0.1 0.1\n");

        let removed = remove_duplicates(&images, &labels).unwrap();

        assert_eq!(removed, 1);
        assert!(images.join("a.jpg").exists());
        assert!(!images.join("b.jpg").exists());
        assert!(!labels.join("b.txt").exists());
        assert!(images.join("c.jpg").exists());
    }
}
