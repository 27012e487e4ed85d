use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::MergeArgs;
use crate::copier::{copy_image_and_label, LabelOutcome};
use crate::taxonomy::{build_id_map, read_classes_txt, read_set_names, unify, IdMap};
use crate::types::MergeStats;
use crate::utils::{collect_images, create_progress_bar, ensure_dir};

/// Destination split name for a source split folder.
fn normalize_split_name(name: &str) -> &str {
    if name == "valid" {
        "validation"
    } else {
        name
    }
}

/// Copy a list of images (and their labels) into one destination split.
fn copy_all(
    images: &[PathBuf],
    source_labels_dir: &Path,
    dest_images_dir: &Path,
    dest_labels_dir: &Path,
    id_map: &IdMap,
    split: &str,
    stats: &mut MergeStats,
) {
    let pb = create_progress_bar(images.len() as u64, split);
    for image in images {
        match copy_image_and_label(
            image,
            source_labels_dir,
            dest_images_dir,
            dest_labels_dir,
            id_map,
        ) {
            Ok(report) => {
                stats.images_copied += 1;
                match report.label {
                    LabelOutcome::Remapped => stats.labels_remapped += 1,
                    LabelOutcome::Verbatim => stats.labels_verbatim += 1,
                    LabelOutcome::VerbatimFallback => stats.label_fallbacks += 1,
                    LabelOutcome::Absent => stats.images_without_labels += 1,
                }
            }
            Err(e) => {
                stats.files_failed += 1;
                error!("Failed to copy {}: {}", image.display(), e);
            }
        }
        pb.inc(1);
    }
    pb.finish();
}

/// Import one pre-split source folder into the destination tree.
///
/// The split named "valid" lands under "validation"; other names pass
/// through. A source split without an `images` directory is skipped.
pub fn import_split(
    source_split_root: &Path,
    dest_root: &Path,
    split_name: &str,
    id_map: &IdMap,
    stats: &mut MergeStats,
) -> io::Result<()> {
    let source_images = source_split_root.join("images");
    let source_labels = source_split_root.join("labels");
    if !source_images.is_dir() {
        warn!(
            "No images directory under {}; skipping split '{}'",
            source_split_root.display(),
            split_name
        );
        return Ok(());
    }

    let dest_split = normalize_split_name(split_name);
    let dest_images = dest_root.join(dest_split).join("images");
    let dest_labels = dest_root.join(dest_split).join("labels");
    ensure_dir(&dest_images)?;
    ensure_dir(&dest_labels)?;

    let images = collect_images(&source_images)?;
    info!(
        "Importing {} images from {} into '{}'",
        images.len(),
        source_images.display(),
        dest_split
    );
    copy_all(
        &images,
        &source_labels,
        &dest_images,
        &dest_labels,
        id_map,
        dest_split,
        stats,
    );
    Ok(())
}

/// Split an unsplit image pool into train/validation and import both parts.
///
/// The shuffle uses its own seeded generator, so repeated runs over the same
/// file set produce the same membership. The cut index is
/// floor(count * train_fraction). Nothing is created when the source has no
/// accepted images.
pub fn split_custom_data(
    source_root: &Path,
    dest_root: &Path,
    train_fraction: f32,
    seed: u64,
    id_map: &IdMap,
    stats: &mut MergeStats,
) -> io::Result<()> {
    let source_images = source_root.join("images");
    let source_labels = source_root.join("labels");
    if !source_images.is_dir() {
        info!(
            "No custom images directory at {}; nothing to split",
            source_images.display()
        );
        return Ok(());
    }

    let mut images = collect_images(&source_images)?;
    if images.is_empty() {
        info!("No custom images found in {}", source_images.display());
        return Ok(());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    images.shuffle(&mut rng);

    let cut = (images.len() as f64 * f64::from(train_fraction)) as usize;
    let (train_images, val_images) = images.split_at(cut.min(images.len()));
    info!(
        "Splitting {} custom images into {} train / {} validation",
        images.len(),
        train_images.len(),
        val_images.len()
    );

    for (split_name, split_images) in [("train", train_images), ("validation", val_images)] {
        let dest_images = dest_root.join(split_name).join("images");
        let dest_labels = dest_root.join(split_name).join("labels");
        ensure_dir(&dest_images)?;
        ensure_dir(&dest_labels)?;
        copy_all(
            split_images,
            &source_labels,
            &dest_images,
            &dest_labels,
            id_map,
            split_name,
            stats,
        );
    }
    Ok(())
}

/// Merge the pre-split set source and the unsplit custom source into one
/// destination tree with a unified class taxonomy.
///
/// Either source may be absent; whatever is available is imported and the
/// rest is skipped with a diagnostic.
pub fn merge_datasets(args: &MergeArgs) -> io::Result<MergeStats> {
    let set_yaml = args.set_dir.join("data.yaml");
    let set_names = read_set_names(&set_yaml);
    if set_names.is_empty() {
        info!("No set taxonomy available from {}", set_yaml.display());
    }
    let custom_names = if args.custom_dir.is_dir() {
        read_classes_txt(&args.classes_txt)
    } else {
        Vec::new()
    };

    let unified = unify(&set_names, &custom_names);
    let set_map = build_id_map(&set_names, &unified);
    let custom_map = build_id_map(&custom_names, &unified);
    info!(
        "Unified taxonomy has {} classes (set: {}, custom: {})",
        unified.len(),
        set_names.len(),
        custom_names.len()
    );

    let mut stats = MergeStats::new();

    let mut split_names = vec!["train", "valid"];
    if args.include_test {
        split_names.push("test");
    }
    for split_name in split_names {
        let split_root = args.set_dir.join(split_name);
        if split_root.is_dir() {
            import_split(&split_root, &args.data_dir, split_name, &set_map, &mut stats)?;
        } else {
            info!(
                "Set split '{}' not found at {}; skipping",
                split_name,
                split_root.display()
            );
        }
    }

    if args.custom_dir.is_dir() {
        split_custom_data(
            &args.custom_dir,
            &args.data_dir,
            args.train_pct,
            args.seed,
            &custom_map,
            &mut stats,
        )?;
    } else {
        info!(
            "Custom directory {} not found; skipping custom data",
            args.custom_dir.display()
        );
    }

    stats.print_summary();
    Ok(stats)
}
