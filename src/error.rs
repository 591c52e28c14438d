//! Error taxonomy for the random indexing engine.
//!
//! Every variant is a precondition or boundary violation detected before
//! any mutation takes place. Arithmetic saturation is deliberately absent:
//! it is a tracked, recoverable event reported through
//! [`RandomIndexer::saturation`](crate::RandomIndexer::saturation), never
//! an error.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes of table construction, growth and the engine transforms.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// An indexer needs at least one dimension.
    #[error("random indexer needs at least one dimension")]
    EmptyDims,

    /// A data range must fit the `u16` index cell type.
    #[error("data range {data_range} exceeds the u16 index cell range")]
    RangeTooLarge { data_range: u32 },

    /// A dimension with zero random indices cannot superpose anything.
    #[error("index count must be nonzero")]
    IndexCountZero,

    /// Index counts split evenly into a positive and a negative half.
    #[error("index count {index_count} must be even to split into sign halves")]
    IndexCountOdd { index_count: u32 },

    /// Row uniqueness requires strictly fewer indices than the range.
    #[error("index count {index_count} must be less than data range {data_range}")]
    IndexCountTooLarge { index_count: u32, data_range: u32 },

    /// Product of per-dimension sizes does not fit `u32`.
    #[error("array element count overflows u32")]
    SizeOverflow,

    /// Dimension selector out of bounds.
    #[error("dimension {dim} out of bounds for {dims}-dimensional indexer")]
    DimOutOfBounds { dim: usize, dims: usize },

    /// Coordinate arity does not match the indexer dimensionality.
    #[error("coordinate has {got} dimensions, expected {expected}")]
    CoordLength { expected: usize, got: usize },

    /// Coordinate beyond the generated rows of a dimension's table.
    #[error(
        "index {index} in dimension {dim} exceeds the generated range {rows}; \
         call set_range first"
    )]
    IndexNotGenerated { dim: usize, index: u32, rows: u32 },

    /// Caller buffer does not hold exactly `data_numel` elements.
    #[error("buffer holds {got} elements, expected {expected}")]
    BufferSize { expected: usize, got: usize },

    /// The two cosa operands disagree on averaging a dimension.
    #[error("cosa operands disagree on averaging in dimension {dim}")]
    AverageMismatch { dim: usize },

    /// Both cosine operands must have a nonzero norm.
    #[error("cosine similarity is undefined for a zero-norm operand")]
    ZeroNorm,

    /// Rejection sampling exceeded its draw budget while generating a row.
    #[error(
        "could not draw a unique random index in range {data_range} \
         with {index_count} columns"
    )]
    DrawLimit { data_range: u32, index_count: u32 },
}
