use log::warn;
use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

use crate::taxonomy::IdMap;
use crate::utils::file_stem_str;

/// How the label paired with a copied image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOutcome {
    /// Class ids rewritten through the id map.
    Remapped,
    /// Copied byte-for-byte because the id map was empty.
    Verbatim,
    /// Rewrite failed; the original bytes were copied instead.
    VerbatimFallback,
    /// The source image had no label file.
    Absent,
}

/// Result of one collision-safe copy.
#[derive(Debug, Clone)]
pub struct CopyReport {
    /// File name the image received in the destination directory.
    pub image_name: String,
    pub label: LabelOutcome,
}

/// Destination file name for `stem` + `ext` that does not collide with an
/// existing file in `dest_images_dir`.
///
/// The bare name wins when free; otherwise the stem gets a short random hex
/// suffix, regenerated until the name is unused. The existence check is not
/// safe against concurrent writers; the merge runs single-threaded.
pub fn unique_target_name(dest_images_dir: &Path, stem: &str, ext: &str) -> String {
    let candidate = join_name(stem, ext);
    if !dest_images_dir.join(&candidate).exists() {
        return candidate;
    }
    loop {
        let tag = Uuid::new_v4().simple().to_string();
        let candidate = join_name(&format!("{}_{}", stem, &tag[..8]), ext);
        if !dest_images_dir.join(&candidate).exists() {
            return candidate;
        }
    }
}

fn join_name(stem: &str, ext: &str) -> String {
    if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, ext)
    }
}

/// Copy one image and, when present, its paired label file into the
/// destination directory pair.
///
/// The destination name is collision-resolved first and the label is written
/// under the resolved stem, so the pair stays matched after renaming. With an
/// empty `id_map` the label is copied verbatim; otherwise its class ids are
/// rewritten, and a rewrite error downgrades to a verbatim copy of the
/// original label.
pub fn copy_image_and_label(
    source_image: &Path,
    source_labels_dir: &Path,
    dest_images_dir: &Path,
    dest_labels_dir: &Path,
    id_map: &IdMap,
) -> io::Result<CopyReport> {
    let stem = file_stem_str(source_image).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no usable file stem: {}", source_image.display()),
        )
    })?;
    let ext = source_image
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    let image_name = unique_target_name(dest_images_dir, stem, ext);
    fs::copy(source_image, dest_images_dir.join(&image_name))?;

    let source_label = source_labels_dir.join(format!("{}.txt", stem));
    if !source_label.is_file() {
        return Ok(CopyReport {
            image_name,
            label: LabelOutcome::Absent,
        });
    }

    let resolved_stem = if ext.is_empty() {
        image_name.as_str()
    } else {
        &image_name[..image_name.len() - ext.len() - 1]
    };
    let dest_label = dest_labels_dir.join(format!("{}.txt", resolved_stem));

    let label = if id_map.is_empty() {
        fs::copy(&source_label, &dest_label)?;
        LabelOutcome::Verbatim
    } else {
        match remap_label_file(&source_label, &dest_label, id_map) {
            Ok(()) => LabelOutcome::Remapped,
            Err(e) => {
                warn!(
                    "Failed to remap {}; copying it verbatim: {}",
                    source_label.display(),
                    e
                );
                fs::copy(&source_label, &dest_label)?;
                LabelOutcome::VerbatimFallback
            }
        }
    };

    Ok(CopyReport { image_name, label })
}

/// Rewrite every class id in a label file through the id map.
///
/// Empty lines are dropped. Lines whose first field does not parse as an
/// unsigned integer pass through unchanged, and ids the map does not cover
/// keep their original value.
pub fn remap_label_file(source: &Path, dest: &Path, id_map: &IdMap) -> io::Result<()> {
    let content = fs::read_to_string(source)?;
    let mut output = String::with_capacity(content.len());
    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let class_field = match fields.next() {
            Some(field) => field,
            None => continue,
        };
        match class_field.parse::<usize>() {
            Ok(class_id) => {
                output.push_str(&id_map.remap(class_id).to_string());
                for field in fields {
                    output.push(' ');
                    output.push_str(field);
                }
            }
            Err(_) => output.push_str(line),
        }
        output.push('\n');
    }
    fs::write(dest, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_map(entries: &[(usize, usize)]) -> IdMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn free_name_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_target_name(dir.path(), "img", "jpg"), "img.jpg");
    }

    #[test]
    fn taken_name_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("img.jpg"), b"first").unwrap();

        let resolved = unique_target_name(dir.path(), "img", "jpg");

        assert_ne!(resolved, "img.jpg");
        assert!(resolved.starts_with("img_"));
        assert!(resolved.ends_with(".jpg"));
        assert_eq!(resolved.len(), "img_".len() + 8 + ".jpg".len());
    }

    #[test]
    fn remap_rewrites_class_ids() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.txt");
        let dest = dir.path().join("out.txt");
        fs::write(&source, "0 0.5 0.5 0.1 0.2\n").unwrap();

        remap_label_file(&source, &dest, &id_map(&[(0, 7)])).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "7 0.5 0.5 0.1 0.2\n");
    }

    #[test]
    fn remap_passes_malformed_lines_through() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.txt");
        let dest = dir.path().join("out.txt");
        fs::write(&source, "x 0.5 0.5 0.1 0.2\n").unwrap();

        remap_label_file(&source, &dest, &id_map(&[(0, 7)])).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "x 0.5 0.5 0.1 0.2\n");
    }

    #[test]
    fn remap_keeps_unmapped_ids_and_drops_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.txt");
        let dest = dir.path().join("out.txt");
        fs::write(&source, "3 0.1 0.1 0.2 0.2\n\n").unwrap();

        remap_label_file(&source, &dest, &id_map(&[(0, 7)])).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "3 0.1 0.1 0.2 0.2\n");
    }

    #[test]
    fn copy_without_label_reports_absent() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let images = dest.path().join("images");
        let labels = dest.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        let image = source.path().join("bg.jpg");
        fs::write(&image, b"pixels").unwrap();

        let report =
            copy_image_and_label(&image, source.path(), &images, &labels, &IdMap::new()).unwrap();

        assert_eq!(report.label, LabelOutcome::Absent);
        assert_eq!(report.image_name, "bg.jpg");
        assert!(images.join("bg.jpg").exists());
        assert!(fs::read_dir(&labels).unwrap().next().is_none());
    }

    #[test]
    fn empty_map_copies_label_verbatim() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let images = dest.path().join("images");
        let labels = dest.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        fs::write(source.path().join("a.jpg"), b"pixels").unwrap();
        fs::write(source.path().join("a.txt"), "0  0.5\t0.5 0.1 0.2\n").unwrap();

        let report = copy_image_and_label(
            &source.path().join("a.jpg"),
            source.path(),
            &images,
            &labels,
            &IdMap::new(),
        )
        .unwrap();

        assert_eq!(report.label, LabelOutcome::Verbatim);
        assert_eq!(
            fs::read_to_string(labels.join("a.txt")).unwrap(),
            "0  0.5\t0.5 0.1 0.2\n"
        );
    }

    #[test]
    fn colliding_copies_keep_both_files() {
        let source_a = tempfile::tempdir().unwrap();
        let source_b = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let images = dest.path().join("images");
        let labels = dest.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();

        fs::write(source_a.path().join("shot.jpg"), b"first").unwrap();
        fs::write(source_a.path().join("shot.txt"), "0 0.5 0.5 0.1 0.1\n").unwrap();
        fs::write(source_b.path().join("shot.jpg"), b"second").unwrap();
        fs::write(source_b.path().join("shot.txt"), "0 0.2 0.2 0.1 0.1\n").unwrap();

        let map = id_map(&[(0, 4)]);
        let first = copy_image_and_label(
            &source_a.path().join("shot.jpg"),
            source_a.path(),
            &images,
            &labels,
            &map,
        )
        .unwrap();
        let second = copy_image_and_label(
            &source_b.path().join("shot.jpg"),
            source_b.path(),
            &images,
            &labels,
            &map,
        )
        .unwrap();

        assert_eq!(first.image_name, "shot.jpg");
        assert_ne!(second.image_name, first.image_name);
        assert_eq!(fs::read(images.join(&first.image_name)).unwrap(), b"first");
        assert_eq!(fs::read(images.join(&second.image_name)).unwrap(), b"second");

        let second_stem = second.image_name.trim_end_matches(".jpg");
        assert_eq!(
            fs::read_to_string(labels.join(format!("{}.txt", second_stem))).unwrap(),
            "4 0.2 0.2 0.1 0.1\n"
        );
    }

    #[test]
    fn unreadable_label_falls_back_to_verbatim_copy() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let images = dest.path().join("images");
        let labels = dest.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        fs::write(source.path().join("x.jpg"), b"pixels").unwrap();
        let raw = [0xff, 0xfe, 0x00, 0x01];
        fs::write(source.path().join("x.txt"), raw).unwrap();

        let report = copy_image_and_label(
            &source.path().join("x.jpg"),
            source.path(),
            &images,
            &labels,
            &id_map(&[(0, 1)]),
        )
        .unwrap();

        assert_eq!(report.label, LabelOutcome::VerbatimFallback);
        assert_eq!(fs::read(labels.join("x.txt")).unwrap(), raw);
    }
}
