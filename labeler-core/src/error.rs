use thiserror::Error;

/// Structural errors: a caller violated a precondition or the data itself is
/// internally inconsistent. These are always fatal to the operation that
/// raised them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("sequence has zero tokens")]
    EmptySequence,

    #[error("feature index {index} out of bounds for weight vector with {cols} columns")]
    FeatureIndexOutOfBounds { index: u32, cols: usize },

    #[error("label index {index} out of bounds for {n_labels} labels")]
    LabelIndexOutOfBounds { index: u32, n_labels: usize },

    #[error("loaded weight vector has dimensions {found:?}, expected {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("weight became non-finite (NaN or infinite) at row {row}, col {col}")]
    NonFiniteWeight { row: usize, col: usize },

    #[error("n_updates overflowed the per-cell tick counter width")]
    TickCounterOverflow,

    #[error("(de)serialization failure: {0}")]
    Codec(#[from] Box<bincode::ErrorKind>),
}

pub type Result<T> = std::result::Result<T, Error>;
