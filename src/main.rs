use clap::Parser;
use log::error;

use yoloprep::config::{Cli, Command};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Merge(args) => yoloprep::merge::merge_datasets(&args).map(|_| ()),
        Command::Yaml(args) => yoloprep::data_yaml::run(&args),
        Command::Clean(args) => yoloprep::clean::run(&args),
        Command::Stats(args) => yoloprep::stats::run(&args),
        Command::Preview(args) => yoloprep::preview::run(&args),
        Command::Preprocess(args) => yoloprep::preprocess::run(&args),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
