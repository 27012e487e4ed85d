//! YOLO dataset preparation toolkit
//!
//! This library merges a pre-split dataset export and an unsplit custom image
//! pool into one train/validation tree under a unified class taxonomy, and
//! provides follow-up passes over the merged tree: manifest generation,
//! cleaning, box statistics, annotated previews and image preprocessing.

pub mod clean;
pub mod config;
pub mod copier;
pub mod data_yaml;
pub mod merge;
pub mod preprocess;
pub mod preview;
pub mod stats;
pub mod taxonomy;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{
    CleanArgs, Cli, Command, MergeArgs, PreprocessArgs, PreviewArgs, StatsArgs, YamlArgs,
};
pub use copier::{copy_image_and_label, unique_target_name, CopyReport, LabelOutcome};
pub use merge::{import_split, merge_datasets, split_custom_data};
pub use taxonomy::{build_id_map, read_classes_txt, read_set_names, unify, IdMap};
pub use types::MergeStats;
