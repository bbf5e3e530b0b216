//! Training driver.
//!
//! Usage:
//!   treeward-train -a attacks.json -f dataset.txt [options]
//!
//! Options:
//!   -a PATH    attacker rule file (required)
//!   -f PATH    dataset file (required); labels default to PATH + ".labels"
//!   -l PATH    label file
//!   -b FLOAT   perturbation budget, >= 0 (default 0)
//!   -d INT     maximum tree depth, >= 0 (default 1)
//!   -j INT     worker threads for the feature scan, >= 1 (default 1)
//!   -e INT     number of trees in the ensemble, >= 1 (default 1)
//!   -i {0,1}   algorithm variant: 0 robust, 1 icml2019 (default 0)
//!   -o PATH    output model file
//!
//! Exit codes: 0 success, 2 invalid arguments or configuration, 1 runtime
//! error.

use std::process::ExitCode;

use treeward::data::load_dataset;
use treeward::persist::save_model;
use treeward::{Attacker, ConfigError, RobustTrainer, TrainParams, TrainingAlgorithm};

/// Parsed command line.
struct Args {
    attacker_file: String,
    dataset_file: String,
    label_file: String,
    budget: f64,
    max_depth: usize,
    n_workers: usize,
    n_trees: usize,
    algorithm: TrainingAlgorithm,
    output_file: Option<String>,
}

fn invalid(flag: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidArgument {
        flag: flag.to_string(),
        reason: reason.into(),
    }
}

fn parse_args(argv: impl Iterator<Item = String>) -> Result<Args, ConfigError> {
    let mut attacker_file = None;
    let mut dataset_file: Option<String> = None;
    let mut label_file = None;
    let mut budget = 0.0f64;
    let mut max_depth = 1usize;
    let mut n_workers = 1usize;
    let mut n_trees = 1usize;
    let mut algorithm = TrainingAlgorithm::Robust;
    let mut output_file = None;

    let mut it = argv;
    while let Some(flag) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .ok_or_else(|| invalid(flag, "expected a value"))
        };
        match flag.as_str() {
            "-a" => attacker_file = Some(value("-a")?),
            "-f" => dataset_file = Some(value("-f")?),
            "-l" => label_file = Some(value("-l")?),
            "-b" => {
                budget = value("-b")?
                    .parse::<f64>()
                    .map_err(|e| invalid("-b", e.to_string()))?;
                if !(budget >= 0.0 && budget.is_finite()) {
                    return Err(invalid("-b", "budget must be >= 0"));
                }
            }
            "-d" => {
                max_depth = value("-d")?
                    .parse::<usize>()
                    .map_err(|e| invalid("-d", e.to_string()))?;
            }
            "-j" => {
                n_workers = value("-j")?
                    .parse::<usize>()
                    .map_err(|e| invalid("-j", e.to_string()))?;
                if n_workers < 1 {
                    return Err(invalid("-j", "worker count must be >= 1"));
                }
            }
            "-e" => {
                n_trees = value("-e")?
                    .parse::<usize>()
                    .map_err(|e| invalid("-e", e.to_string()))?;
                if n_trees < 1 {
                    return Err(invalid("-e", "estimator count must be >= 1"));
                }
            }
            "-i" => {
                algorithm = match value("-i")?.as_str() {
                    "0" => TrainingAlgorithm::Robust,
                    "1" => TrainingAlgorithm::Icml2019,
                    other => return Err(invalid("-i", format!("must be 0 or 1, got '{other}'"))),
                };
            }
            "-o" => output_file = Some(value("-o")?),
            other => {
                return Err(invalid(other, "unknown option"));
            }
        }
    }

    let attacker_file = attacker_file.ok_or(ConfigError::MissingArgument("-a"))?;
    let dataset_file = dataset_file.ok_or(ConfigError::MissingArgument("-f"))?;
    let label_file = label_file.unwrap_or_else(|| format!("{dataset_file}.labels"));

    Ok(Args {
        attacker_file,
        dataset_file,
        label_file,
        budget,
        max_depth,
        n_workers,
        n_trees,
        algorithm,
        output_file,
    })
}

fn usage() {
    eprintln!(
        "Usage: treeward-train -a <attacker file> -f <dataset file> \
         [-l <label file>] [-b <budget>] [-d <max depth>] [-j <threads>] \
         [-e <estimators>] [-i <0|1>] [-o <output model file>]"
    );
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = load_dataset(&args.dataset_file, &args.label_file)?;
    let attacker = Attacker::from_file(&args.attacker_file, &dataset, args.budget)?;

    let params = TrainParams {
        n_trees: args.n_trees,
        max_depth: args.max_depth,
        n_workers: args.n_workers,
        algorithm: args.algorithm,
        ..Default::default()
    };
    let forest = RobustTrainer::new(params).train(&dataset, &attacker)?;

    if let Some(path) = &args.output_file {
        save_model(path, &forest, &dataset)?;
        println!("model written to {path}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("treeward-train: {err}");
            usage();
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("treeward-train: {err}");
            ExitCode::FAILURE
        }
    }
}
