//! Error types for histogram construction, filling and readback.

use thiserror::Error;

use crate::storage::BinKind;

/// Errors produced by the histogram engine.
///
/// A coordinate outside an axis range is not an error; see
/// [`FillStatus::Dropped`](crate::FillStatus::Dropped).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistError {
    /// Axis parameters violate the axis invariants.
    #[error("invalid axis: {0}")]
    InvalidAxis(String),

    /// Histogram-level configuration is inconsistent (empty axis list, kind/default mismatch, ...).
    #[error("invalid histogram config: {0}")]
    InvalidConfig(String),

    /// The product of all local bin counts does not fit in `usize`.
    #[error("too many bins: product of local bin counts cannot be allocated")]
    TooManyBins,

    /// Number of coordinates (or local indices, or columns) differs from the dimensionality.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Histogram dimensionality.
        expected: usize,
        /// Number of values supplied by the caller.
        got: usize,
    },

    /// Weight present but not convertible to the bin kind's value type.
    #[error("bad weight: {0}")]
    BadWeight(String),

    /// Generic fill without a weight, and no unit weight was declared.
    #[error("missing weight: generic bins declare no unit weight")]
    MissingWeight,

    /// A combine function was supplied for a numeric bin kind.
    #[error("combine function not allowed for {0:?} bins")]
    CombineNotAllowed(BinKind),

    /// Generic bin value cannot be combined additively with the weight.
    #[error("value is not additive: {0}")]
    NotAdditive(String),

    /// Caller-supplied combine function failed.
    #[error("combine failed: {0}")]
    Combine(String),

    /// Columnar fill with columns (or weights) of unequal length.
    #[error("column length mismatch: expected {expected}, got {got} (column {column})")]
    ColumnLength {
        /// Column position (`ndim` denotes the weight column).
        column: usize,
        /// Length of the first column.
        expected: usize,
        /// Length of the offending column.
        got: usize,
    },

    /// Local index past the end of an axis.
    #[error("index {index} out of range for axis {axis} with {len} local bins")]
    IndexOutOfRange {
        /// Axis position.
        axis: usize,
        /// Requested local index.
        index: usize,
        /// Local bin count of that axis.
        len: usize,
    },

    /// Flat offset past the end of the storage.
    #[error("flat offset {offset} out of range for {len} bins")]
    OffsetOutOfRange {
        /// Requested offset.
        offset: usize,
        /// Total number of bins.
        len: usize,
    },

    /// Two histograms (or a histogram and a snapshot) have different shapes or kinds.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// JSON config could not be parsed.
    #[error("JSON error: {0}")]
    Json(String),

    /// Config file could not be read.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for HistError {
    fn from(e: serde_json::Error) -> Self {
        HistError::Json(e.to_string())
    }
}

impl From<std::io::Error> for HistError {
    fn from(e: std::io::Error) -> Self {
        HistError::Io(e.to_string())
    }
}

/// Result alias for histogram operations.
pub type Result<T> = std::result::Result<T, HistError>;
