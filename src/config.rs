use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Command-line interface for preparing YOLO object-detection datasets.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge the downloaded set and self-labeled custom data into one tree
    Merge(MergeArgs),
    /// Write the data.yaml consumed by training
    Yaml(YamlArgs),
    /// Remove broken or duplicate image/label pairs
    Clean(CleanArgs),
    /// Summarize bounding-box sizes and recommend a training image size
    Stats(StatsArgs),
    /// Draw label boxes onto copies of the images
    Preview(PreviewArgs),
    /// Normalize and letterbox images into a parallel tree
    Preprocess(PreprocessArgs),
}

/// Arguments for the dataset merge.
#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// Directory holding the pre-split set (train/valid/test and data.yaml)
    #[arg(long = "set_dir", default_value = "dataset/set")]
    pub set_dir: PathBuf,

    /// Directory holding unsplit self-labeled images and labels
    #[arg(long = "custom_dir", default_value = "dataset/custom_data")]
    pub custom_dir: PathBuf,

    /// Destination root for the merged dataset
    #[arg(long = "data_dir", default_value = "data")]
    pub data_dir: PathBuf,

    /// Class list for the custom data, one name per line
    #[arg(long = "classes_txt", default_value = "dataset/custom_data/classes.txt")]
    pub classes_txt: PathBuf,

    /// Fraction of the custom images that goes to train
    #[arg(long = "train_pct", default_value_t = 0.8, value_parser = validate_fraction)]
    pub train_pct: f32,

    /// Seed for the custom-data shuffle
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Also import the set's test split
    #[arg(long = "include_test")]
    pub include_test: bool,
}

/// Arguments for the data.yaml writer.
#[derive(Args, Debug, Clone)]
pub struct YamlArgs {
    /// Class list for the custom data, one name per line
    #[arg(long = "classes_txt", default_value = "dataset/custom_data/classes.txt")]
    pub classes_txt: PathBuf,

    /// Optional set data.yaml whose names come first in the union
    #[arg(long = "set_yaml")]
    pub set_yaml: Option<PathBuf>,

    /// Where to write the resulting data.yaml
    #[arg(long = "out", default_value = "data.yaml")]
    pub out: PathBuf,
}

/// Arguments for the dataset cleaner.
#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Root of the merged dataset tree
    #[arg(long = "data_dir", default_value = "data")]
    pub data_dir: PathBuf,
}

/// Arguments for the bounding-box statistics report.
#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Root of the merged dataset tree
    #[arg(long = "data_dir", default_value = "data")]
    pub data_dir: PathBuf,

    /// Cap on the number of images examined per split
    #[arg(long = "limit")]
    pub limit: Option<usize>,

    /// Print the report as JSON instead of log lines
    #[arg(long = "json")]
    pub json: bool,
}

/// Arguments for the label preview renderer.
#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    /// Root of the merged dataset tree
    #[arg(long = "data_dir", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory that receives the rendered previews
    #[arg(long = "out_dir", default_value = "previews")]
    pub out_dir: PathBuf,

    /// Cap on the number of previews rendered per split
    #[arg(long = "max_images", default_value_t = 200)]
    pub max_images: usize,
}

/// Arguments for the image preprocessor.
#[derive(Args, Debug, Clone)]
pub struct PreprocessArgs {
    /// Root of the merged dataset tree
    #[arg(long = "data_dir", default_value = "data")]
    pub data_dir: PathBuf,

    /// Root of the preprocessed output tree
    #[arg(long = "out_dir", default_value = "data_preprocessed")]
    pub out_dir: PathBuf,

    /// Side length of the square letterbox canvas
    #[arg(long = "size", default_value_t = 512, value_parser = validate_size)]
    pub size: u32,

    /// Gamma correction exponent (1.0 leaves pixels unchanged)
    #[arg(long = "gamma", default_value_t = 1.0, value_parser = validate_gamma)]
    pub gamma: f32,
}

// Validate that the fraction is between 0.0 and 1.0
fn validate_fraction(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("FRACTION must be between 0.0 and 1.0".to_string()),
    }
}

// Validate that the gamma exponent is positive
fn validate_gamma(s: &str) -> Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if val > 0.0 => Ok(val),
        _ => Err("GAMMA must be greater than 0.0".to_string()),
    }
}

// Validate that the canvas side length is at least one pixel
fn validate_size(s: &str) -> Result<u32, String> {
    match u32::from_str(s) {
        Ok(val) if val > 0 => Ok(val),
        _ => Err("SIZE must be a positive integer".to_string()),
    }
}
