use std::path::PathBuf;

use clap::Parser;

/// Structured perceptron tagger.
#[derive(Parser, Debug)]
#[command(name = "labeler", version, about = "Structured perceptron tagger")]
pub struct Args {
    /// Training data (vw format).
    #[arg(long)]
    pub train: Option<PathBuf>,

    /// Test data (vw format).
    #[arg(long)]
    pub test: Option<PathBuf>,

    /// Size of feature vector in bits (2**b).
    #[arg(long = "hash-bits", short = 'b')]
    pub hash_bits: Option<u32>,

    /// Number of passes over the training set.
    #[arg(long, default_value_t = 5)]
    pub passes: usize,

    /// File for outputting predictions.
    #[arg(long, short = 'p')]
    pub predictions: Option<PathBuf>,

    /// One-character prefixes of namespaces to ignore.
    #[arg(long, num_args = 0..)]
    pub ignore: Vec<String>,

    /// Combine features from these namespace prefixes; ':' means all namespaces.
    #[arg(long, short = 'q', num_args = 0..)]
    pub quadratic: Vec<String>,

    /// Do not average over all updates.
    #[arg(long = "no-average", action = clap::ArgAction::SetFalse, default_value_t = true)]
    pub average: bool,

    /// Do not use adaptive gradient scaling.
    #[arg(long = "no-ada-grad", action = clap::ArgAction::SetFalse, default_value_t = true)]
    pub ada_grad: bool,

    /// Initial model directory to resume training/testing from.
    #[arg(long = "initial-model", short = 'i')]
    pub initial_model: Option<PathBuf>,

    /// Directory to save the trained model into.
    #[arg(long = "final-model", short = 'f')]
    pub final_model: Option<PathBuf>,

    /// Cost-sensitive weight updates.
    #[arg(long = "cost-sensitive", visible_alias = "cs")]
    pub cost_sensitive: bool,

    /// Append test result as a JSON object to this file.
    #[arg(long = "append-test")]
    pub append_test: Option<PathBuf>,

    /// Print the interpretation of the input files to standard out.
    #[arg(long)]
    pub audit: bool,

    /// Identify this invocation by name (used with --append-test).
    #[arg(long)]
    pub name: Option<String>,

    /// Read the set of labels from this file.
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Regularize by randomly removing features (p = 0.1).
    #[arg(long = "drop-out")]
    pub drop_out: bool,

    /// CSV file of a square label x label confusion scaling matrix.
    #[arg(long = "confusion-scaling")]
    pub confusion_scaling: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            train: None,
            test: None,
            hash_bits: None,
            passes: 5,
            predictions: None,
            ignore: vec![],
            quadratic: vec![],
            average: true,
            ada_grad: true,
            initial_model: None,
            final_model: None,
            cost_sensitive: false,
            append_test: None,
            audit: false,
            name: None,
            labels: None,
            drop_out: false,
            confusion_scaling: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_train_invocation() {
        let args = Args::try_parse_from(["labeler", "--train", "data.vw"]).unwrap();
        assert_eq!(args.train, Some(PathBuf::from("data.vw")));
        assert_eq!(args.passes, 5);
        assert!(args.average);
        assert!(args.ada_grad);
    }

    #[test]
    fn no_average_and_no_ada_grad_flip_defaults() {
        let args = Args::try_parse_from(["labeler", "--train", "d.vw", "--no-average", "--no-ada-grad"])
            .unwrap();
        assert!(!args.average);
        assert!(!args.ada_grad);
    }

    #[test]
    fn ignore_accepts_multiple_prefixes() {
        let args =
            Args::try_parse_from(["labeler", "--train", "d.vw", "--ignore", "1", "3"]).unwrap();
        assert_eq!(args.ignore, vec!["1".to_string(), "3".to_string()]);
    }
}
