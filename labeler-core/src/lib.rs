//! labeler-core — feature map, weight vectors, Viterbi decoder and
//! perceptron trainer for structured sequence labeling.
//!
//! This crate does no I/O: it owns no files, no CLI, no logger. Everything
//! it needs arrives as arguments; everything it produces is a return value
//! or a mutation of an argument. The orchestration around it (reading
//! input, writing predictions, persisting models) lives in `labeler-cli`.

pub mod corruption;
pub mod error;
pub mod feature_map;
pub mod sequence;
pub mod trainer;
pub mod update;
pub mod viterbi;
pub mod weights;

pub use error::{Error, Result};
pub use feature_map::FeatureMap;
pub use sequence::{Sequence, Token};
pub use trainer::{Trainer, TrainerConfig, TrainerProgress};
pub use update::UpdateRule;
pub use viterbi::Decoder;
pub use weights::WeightVector;
