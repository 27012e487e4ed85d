use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::YamlArgs;
use crate::taxonomy::{read_classes_txt, read_set_names, unify};

/// Ultralytics-style dataset manifest.
#[derive(Debug, Serialize)]
struct DataYaml<'a> {
    path: &'a str,
    train: &'a str,
    val: &'a str,
    nc: usize,
    names: &'a [String],
}

/// Write a `data.yaml` manifest describing the merged dataset layout.
pub fn write_data_yaml(names: &[String], out_path: &Path) -> io::Result<()> {
    let doc = DataYaml {
        path: "data",
        train: "train/images",
        val: "validation/images",
        nc: names.len(),
        names,
    };
    let body = serde_yaml::to_string(&doc)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(out_path, body)
}

pub fn run(args: &YamlArgs) -> io::Result<()> {
    let custom_names = read_classes_txt(&args.classes_txt);
    let set_names = match &args.set_yaml {
        Some(path) => read_set_names(path),
        None => Vec::new(),
    };

    let unified = unify(&set_names, &custom_names);
    if unified.is_empty() {
        warn!("No class names found; not writing {}", args.out.display());
        return Ok(());
    }

    write_data_yaml(&unified, &args.out)?;
    info!(
        "Wrote {} with {} classes",
        args.out.display(),
        unified.len()
    );
    Ok(())
}
