//! # rindex
//!
//! Random indexing of n-dimensional distributional arrays.
//!
//! Random indexing accumulates sparse, high-dimensional co-occurrence
//! statistics into a fixed-size dense array by superposing every explicit
//! coordinate onto a small set of pseudo-random, sign-balanced positions.
//! Near-orthogonality of the random position sets makes approximate
//! recovery and similarity estimation possible without ever materializing
//! the full sparse tensor, so memory use is independent of how many
//! distinct index combinations are observed.
//!
//! ## Components
//!
//! 1. **IndexTable** — growable per-dimension table of collision-free
//!    pseudo-random positions, generated lazily row by row
//! 2. **RandomIndexer** — the engine: mixed-radix indexing math plus the
//!    `encode` / `decode` / `cosa` transforms over caller-owned buffers
//! 3. **saturate** — the saturating fixed-point accumulate shared by all
//!    encode paths
//!
//! The engine owns a seeded [`rand::rngs::StdRng`] (or any caller-supplied
//! [`rand::Rng`]), so identically seeded and identically driven indexers
//! produce bit-identical tables and results.

pub mod error;
pub mod indexer;
pub mod saturate;
pub mod table;

pub use error::{Error, Result};
pub use indexer::{DimIndex, DimSpec, RandomIndexer};
pub use table::IndexTable;

/// Signed fixed-point element type of distributional arrays.
pub type Weight = i16;
