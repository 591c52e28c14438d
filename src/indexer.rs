//! The random indexing engine.
//!
//! A [`RandomIndexer`] owns one [`IndexTable`] per dimension plus the
//! mixed-radix strides needed to enumerate superposition terms, and
//! implements the three transforms over caller-owned buffers:
//!
//! - [`encode`](RandomIndexer::encode) — superpose a signed weight onto
//!   `dist_numel` pseudo-random cells of the distributional array
//! - [`decode`](RandomIndexer::decode) — the unbiased mean estimator
//!   recovering an approximation of the originally encoded weight
//! - [`cosa`](RandomIndexer::cosa) — approximate cosine similarity
//!   between two distributional slices, with per-dimension exact
//!   marginalization via [`DimIndex::Average`]
//!
//! Buffers are never retained across calls; the engine's only mutable
//! state outside table growth is the saturation counter.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::saturate::saturating_add;
use crate::table::IndexTable;
use crate::Weight;

/// Per-dimension contract of an indexer: the dense position range of the
/// distributional array and the number of random indices used to encode
/// one explicit index value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimSpec {
    /// Size of the dense index domain of this dimension.
    pub data_range: u32,

    /// Random positions assigned per explicit index value. Must be even
    /// (half carry positive sign, half negative) and `< data_range`.
    pub index_count: u32,
}

/// One dimension of a [`cosa`](RandomIndexer::cosa) coordinate: either a
/// concrete explicit index or a directive to marginalize the dimension by
/// iterating its full dense range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DimIndex {
    /// Index a specific explicit value through its random index row.
    At(u32),

    /// Marginalize: sum over every dense position of this dimension.
    Average,
}

/// Row-major fold of one dimension's dense position into a flat offset.
///
/// The single flatten step shared by every transform, so encode, decode
/// and cosa cannot diverge on buffer layout.
#[inline]
fn fold_offset(offset: usize, data_range: u32, pos: u16) -> usize {
    pos as usize + data_range as usize * offset
}

/// Random indexing engine over n-dimensional distributional arrays.
///
/// Generic over the owned random generator so tests can inject an
/// isolated stream; [`RandomIndexer::new`] seeds a [`StdRng`] for the
/// common reproducible-experiment path.
#[derive(Debug)]
pub struct RandomIndexer<R: Rng = StdRng> {
    tables: Vec<IndexTable>,
    /// Row-major strides over index counts, for mixed-radix decomposition
    /// of a flat superposition term into per-dimension columns.
    unroll: Vec<u32>,
    data_numel: u32,
    dist_numel: u32,
    saturations: u64,
    rng: R,
}

impl RandomIndexer<StdRng> {
    /// Build an indexer whose tables are generated from a seeded
    /// [`StdRng`]; identical seeds and call sequences reproduce identical
    /// tables and results.
    pub fn new(specs: &[DimSpec], seed: u64) -> Result<Self> {
        Self::with_rng(specs, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomIndexer<R> {
    /// Build an indexer drawing table entries from a caller-supplied
    /// generator.
    pub fn with_rng(specs: &[DimSpec], rng: R) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::EmptyDims);
        }

        let mut tables = Vec::with_capacity(specs.len());
        let mut data_numel: u32 = 1;
        let mut dist_numel: u32 = 1;
        for spec in specs {
            tables.push(IndexTable::new(spec.data_range, spec.index_count)?);
            data_numel = data_numel
                .checked_mul(spec.data_range)
                .ok_or(Error::SizeOverflow)?;
            dist_numel = dist_numel
                .checked_mul(spec.index_count)
                .ok_or(Error::SizeOverflow)?;
        }

        let dims = specs.len();
        let mut unroll = vec![1u32; dims];
        for d in 0..dims {
            for j in (d + 1)..dims {
                unroll[d] *= specs[j].index_count;
            }
        }

        Ok(Self {
            tables,
            unroll,
            data_numel,
            dist_numel,
            saturations: 0,
            rng,
        })
    }

    /// Number of dimensions.
    #[inline]
    pub fn dims(&self) -> usize {
        self.tables.len()
    }

    /// Generated explicit range of a dimension (rows of its table).
    #[inline]
    pub fn range(&self, dim: usize) -> u32 {
        self.tables[dim].rows()
    }

    /// Random indices per explicit value in a dimension.
    #[inline]
    pub fn index_count(&self, dim: usize) -> u32 {
        self.tables[dim].cols()
    }

    /// Dense position range of a dimension.
    #[inline]
    pub fn data_range(&self, dim: usize) -> u32 {
        self.tables[dim].data_range()
    }

    /// Elements a caller must allocate for one distributional array.
    #[inline]
    pub fn data_numel(&self) -> u32 {
        self.data_numel
    }

    /// Superposition terms touched per encode/decode call.
    #[inline]
    pub fn dist_numel(&self) -> u32 {
        self.dist_numel
    }

    /// Size of one distributional array in bytes.
    #[inline]
    pub fn data_size(&self) -> usize {
        self.data_numel as usize * std::mem::size_of::<Weight>()
    }

    /// Total storage of the random index tables in bytes.
    pub fn index_size(&self) -> usize {
        self.tables.iter().map(IndexTable::size_bytes).sum()
    }

    /// Cumulative count of saturated (clamped) accumulations.
    #[inline]
    pub fn saturation(&self) -> u64 {
        self.saturations
    }

    /// Grow the explicit range of `dim` to at least `range`, generating
    /// random index rows for the new values. Ranges never shrink; returns
    /// the actual row count, which may exceed `range` from earlier growth.
    pub fn set_range(&mut self, dim: usize, range: u32) -> Result<u32> {
        let dims = self.tables.len();
        let table = self
            .tables
            .get_mut(dim)
            .ok_or(Error::DimOutOfBounds { dim, dims })?;
        let rows = table.grow(range, &mut self.rng)?;
        tracing::debug!(dim, rows, "random index range set");
        Ok(rows)
    }

    /// Superpose `weight` onto the distributional array at explicit
    /// coordinate `ind`.
    ///
    /// Each of the `dist_numel` term cells receives the weight with a sign
    /// that flips once per dimension whose column falls in the negative
    /// half, accumulated saturating; clamping events are tallied in the
    /// saturation counter. The coordinate must lie within the ranges
    /// grown via [`set_range`](RandomIndexer::set_range).
    pub fn encode(&mut self, data: &mut [Weight], ind: &[u32], weight: Weight) -> Result<()> {
        self.check_buffer(data.len())?;
        self.check_coord(ind)?;
        if weight == 0 {
            return Ok(());
        }

        let base = weight as i32;
        for term in 0..self.dist_numel {
            let (negate, offset) = self.term_offset(term, ind);
            let delta = if negate { -base } else { base };
            let (value, clamped) = saturating_add(data[offset], delta);
            data[offset] = value;
            if clamped {
                self.saturations += 1;
            }
        }
        Ok(())
    }

    /// Estimate the weight encoded at explicit coordinate `ind`.
    ///
    /// Averages the sign-corrected term cells; contributions from other
    /// encoded coordinates cancel in expectation thanks to the random,
    /// sign-balanced table construction.
    pub fn decode(&self, data: &[Weight], ind: &[u32]) -> Result<f64> {
        self.check_buffer(data.len())?;
        self.check_coord(ind)?;

        let mut sum = 0.0f64;
        for term in 0..self.dist_numel {
            let (negate, offset) = self.term_offset(term, ind);
            let value = data[offset] as f64;
            sum += if negate { -value } else { value };
        }
        Ok(sum / self.dist_numel as f64)
    }

    /// Approximate cosine similarity between slices of two distributional
    /// arrays.
    ///
    /// For each dimension, both coordinates must agree on whether it is
    /// [`DimIndex::Average`] (exactly marginalized by iterating the full
    /// dense range) or concrete (iterated over the random index columns
    /// of each operand's explicit value). Signs cancel identically on
    /// both operands and need no tracking. A zero norm on either operand
    /// is reported as [`Error::ZeroNorm`], never as a silent NaN.
    pub fn cosa(
        &self,
        d1: &[Weight],
        i1: &[DimIndex],
        d2: &[Weight],
        i2: &[DimIndex],
    ) -> Result<f64> {
        self.check_buffer(d1.len())?;
        self.check_buffer(d2.len())?;
        let dims = self.tables.len();
        if i1.len() != dims {
            return Err(Error::CoordLength {
                expected: dims,
                got: i1.len(),
            });
        }
        if i2.len() != dims {
            return Err(Error::CoordLength {
                expected: dims,
                got: i2.len(),
            });
        }

        // Enumeration radix per dimension: the full dense range when
        // marginalizing, the table columns when indexing. The product
        // never exceeds data_numel, so u32 suffices.
        let mut radices = vec![0u32; dims];
        let mut dnumel: u32 = 1;
        for (d, table) in self.tables.iter().enumerate() {
            radices[d] = match (i1[d], i2[d]) {
                (DimIndex::Average, DimIndex::Average) => table.data_range(),
                (DimIndex::At(a), DimIndex::At(b)) => {
                    self.check_index(d, a)?;
                    self.check_index(d, b)?;
                    table.cols()
                }
                _ => return Err(Error::AverageMismatch { dim: d }),
            };
            dnumel *= radices[d];
        }

        let mut unroll = vec![1u32; dims];
        for d in 0..dims {
            for j in (d + 1)..dims {
                unroll[d] *= radices[j];
            }
        }

        let mut dot = 0.0f64;
        let mut norm1 = 0.0f64;
        let mut norm2 = 0.0f64;
        for term in 0..dnumel {
            let mut rem = term;
            let mut off1 = 0usize;
            let mut off2 = 0usize;
            for (d, table) in self.tables.iter().enumerate() {
                let col = rem / unroll[d];
                rem -= col * unroll[d];
                let (p1, p2) = match (i1[d], i2[d]) {
                    (DimIndex::At(a), DimIndex::At(b)) => (table.item(a, col), table.item(b, col)),
                    // Marginalized: the enumerated value is the dense
                    // position itself, identical on both operands.
                    _ => (col as u16, col as u16),
                };
                off1 = fold_offset(off1, table.data_range(), p1);
                off2 = fold_offset(off2, table.data_range(), p2);
            }
            let v1 = d1[off1] as f64;
            let v2 = d2[off2] as f64;
            dot += v1 * v2;
            norm1 += v1 * v1;
            norm2 += v2 * v2;
        }

        if norm1 == 0.0 || norm2 == 0.0 {
            return Err(Error::ZeroNorm);
        }
        Ok(dot / (norm1 * norm2).sqrt())
    }

    /// Sign and flat data offset of one superposition term.
    ///
    /// Decomposes the term through `unroll` into per-dimension columns,
    /// flips the sign once per negative-half column, maps each column
    /// through its dimension's table row and flattens the resulting dense
    /// positions row-major. The coordinate must already be validated.
    fn term_offset(&self, term: u32, ind: &[u32]) -> (bool, usize) {
        let mut rem = term;
        let mut negate = false;
        let mut offset = 0usize;
        for (d, table) in self.tables.iter().enumerate() {
            let col = rem / self.unroll[d];
            rem -= col * self.unroll[d];
            if col >= table.positive_cols() {
                negate = !negate;
            }
            let pos = table.item(ind[d], col);
            offset = fold_offset(offset, table.data_range(), pos);
        }
        (negate, offset)
    }

    fn check_buffer(&self, len: usize) -> Result<()> {
        if len != self.data_numel as usize {
            return Err(Error::BufferSize {
                expected: self.data_numel as usize,
                got: len,
            });
        }
        Ok(())
    }

    fn check_index(&self, dim: usize, index: u32) -> Result<()> {
        let rows = self.tables[dim].rows();
        if index >= rows {
            return Err(Error::IndexNotGenerated { dim, index, rows });
        }
        Ok(())
    }

    fn check_coord(&self, ind: &[u32]) -> Result<()> {
        if ind.len() != self.tables.len() {
            return Err(Error::CoordLength {
                expected: self.tables.len(),
                got: ind.len(),
            });
        }
        for (dim, &index) in ind.iter().enumerate() {
            self.check_index(dim, index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(data_range: u32, index_count: u32) -> DimSpec {
        DimSpec {
            data_range,
            index_count,
        }
    }

    /// A small two-dimensional indexer with both ranges grown.
    fn small_indexer() -> RandomIndexer {
        let mut ri = RandomIndexer::new(&[spec(512, 8), spec(64, 4)], 42).unwrap();
        ri.set_range(0, 10).unwrap();
        ri.set_range(1, 10).unwrap();
        ri
    }

    #[test]
    fn test_construction_preconditions() {
        assert_eq!(RandomIndexer::new(&[], 0).unwrap_err(), Error::EmptyDims);
        assert_eq!(
            RandomIndexer::new(&[spec(100, 7)], 0).unwrap_err(),
            Error::IndexCountOdd { index_count: 7 }
        );
        assert_eq!(
            RandomIndexer::new(&[spec(4, 6)], 0).unwrap_err(),
            Error::IndexCountTooLarge {
                index_count: 6,
                data_range: 4
            }
        );
        // 65536^2 overflows the u32 element count.
        assert_eq!(
            RandomIndexer::new(&[spec(65_535, 2), spec(65_535, 2), spec(65_535, 2)], 0)
                .unwrap_err(),
            Error::SizeOverflow
        );
    }

    #[test]
    fn test_indexing_math() {
        let ri = RandomIndexer::new(&[spec(2048, 8), spec(32, 4)], 0).unwrap();
        assert_eq!(ri.dims(), 2);
        assert_eq!(ri.data_numel(), 2048 * 32);
        assert_eq!(ri.dist_numel(), 8 * 4);
        assert_eq!(ri.data_size(), 2048 * 32 * 2);
        assert_eq!(ri.data_range(0), 2048);
        assert_eq!(ri.index_count(1), 4);
        // No ranges grown yet.
        assert_eq!(ri.range(0), 0);
        assert_eq!(ri.index_size(), 0);
    }

    #[test]
    fn test_set_range_is_monotonic() {
        let mut ri = RandomIndexer::new(&[spec(256, 4)], 9).unwrap();
        assert_eq!(ri.set_range(0, 100).unwrap(), 100);
        assert_eq!(ri.set_range(0, 40).unwrap(), 100);
        assert_eq!(ri.range(0), 100);
        assert_eq!(ri.index_size(), 100 * 4 * 2);
        assert_eq!(
            ri.set_range(3, 10).unwrap_err(),
            Error::DimOutOfBounds { dim: 3, dims: 1 }
        );
    }

    #[test]
    fn test_encode_validates_before_mutating() {
        let mut ri = small_indexer();
        let numel = ri.data_numel() as usize;

        let mut short = vec![0; numel - 1];
        assert_eq!(
            ri.encode(&mut short, &[0, 0], 1).unwrap_err(),
            Error::BufferSize {
                expected: numel,
                got: numel - 1
            }
        );

        let mut data = vec![0; numel];
        assert_eq!(
            ri.encode(&mut data, &[0], 1).unwrap_err(),
            Error::CoordLength {
                expected: 2,
                got: 1
            }
        );
        assert_eq!(
            ri.encode(&mut data, &[0, 10], 1).unwrap_err(),
            Error::IndexNotGenerated {
                dim: 1,
                index: 10,
                rows: 10
            }
        );
        assert!(data.iter().all(|&v| v == 0), "failed encode must not write");
    }

    #[test]
    fn test_single_write_roundtrip() {
        let mut ri = small_indexer();
        let mut data = vec![0; ri.data_numel() as usize];

        ri.encode(&mut data, &[3, 7], 21).unwrap();
        // Within one coordinate all term offsets are distinct (row
        // uniqueness), so a single write decodes back exactly.
        let got = ri.decode(&data, &[3, 7]).unwrap();
        assert!((got - 21.0).abs() < 1e-9, "decoded {got}");

        let touched = data.iter().filter(|&&v| v != 0).count();
        assert_eq!(touched, ri.dist_numel() as usize);
    }

    #[test]
    fn test_zero_weight_is_noop() {
        let mut ri = small_indexer();
        let mut data = vec![0; ri.data_numel() as usize];
        ri.encode(&mut data, &[1, 1], 0).unwrap();
        assert!(data.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_superposition_additivity() {
        let mut ri = small_indexer();
        let mut data = vec![0; ri.data_numel() as usize];

        ri.encode(&mut data, &[1, 2], 100).unwrap();
        ri.encode(&mut data, &[3, 4], 7).unwrap();

        // Interference from the second write is bounded by its weight
        // (and is almost always zero at this occupancy).
        let got = ri.decode(&data, &[1, 2]).unwrap();
        assert!((got - 100.0).abs() < 7.5, "decoded {got}");
    }

    #[test]
    fn test_decode_is_stable() {
        let mut ri = small_indexer();
        let mut data = vec![0; ri.data_numel() as usize];
        ri.encode(&mut data, &[5, 5], 13).unwrap();
        let first = ri.decode(&data, &[5, 5]).unwrap();
        let second = ri.decode(&data, &[5, 5]).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_deterministic_across_engines() {
        let drive = |seed: u64| {
            let mut ri = RandomIndexer::new(&[spec(512, 8), spec(64, 4)], seed).unwrap();
            ri.set_range(0, 20).unwrap();
            ri.set_range(1, 20).unwrap();
            let mut data = vec![0; ri.data_numel() as usize];
            ri.encode(&mut data, &[4, 9], 17).unwrap();
            ri.encode(&mut data, &[11, 2], -6).unwrap();
            let estimate = ri.decode(&data, &[4, 9]).unwrap();
            (data, estimate)
        };

        let (data_a, est_a) = drive(1234);
        let (data_b, est_b) = drive(1234);
        assert_eq!(data_a, data_b);
        assert_eq!(est_a.to_bits(), est_b.to_bits());

        let (data_c, _) = drive(4321);
        assert_ne!(data_a, data_c, "different seeds should differ");
    }

    #[test]
    fn test_saturation_counts_clamped_cells() {
        let mut ri = RandomIndexer::new(&[spec(8, 2), spec(4, 2)], 5).unwrap();
        ri.set_range(0, 1).unwrap();
        ri.set_range(1, 1).unwrap();
        let mut data = vec![0; ri.data_numel() as usize];

        // First pass fills four distinct cells with +-30000, no clamping.
        ri.encode(&mut data, &[0, 0], 30_000).unwrap();
        assert_eq!(ri.saturation(), 0);

        // Second pass pushes every cell past the representable range.
        ri.encode(&mut data, &[0, 0], 30_000).unwrap();
        assert_eq!(ri.saturation(), 4);
        assert_eq!(data.iter().filter(|&&v| v == Weight::MAX).count(), 2);
        assert_eq!(data.iter().filter(|&&v| v == Weight::MIN).count(), 2);

        // Clamped cells stay clamped and keep counting.
        ri.encode(&mut data, &[0, 0], 30_000).unwrap();
        assert_eq!(ri.saturation(), 8);
    }

    #[test]
    fn test_cosa_self_similarity() {
        let mut ri = small_indexer();
        let mut data = vec![0; ri.data_numel() as usize];
        ri.encode(&mut data, &[0, 1], 9).unwrap();
        ri.encode(&mut data, &[2, 3], -4).unwrap();

        let at = [DimIndex::At(0), DimIndex::At(1)];
        let got = ri.cosa(&data, &at, &data, &at).unwrap();
        assert!((got - 1.0).abs() < 1e-12, "cosa {got}");

        let avg = [DimIndex::Average, DimIndex::Average];
        let got = ri.cosa(&data, &avg, &data, &avg).unwrap();
        assert!((got - 1.0).abs() < 1e-12, "cosa {got}");

        let mixed = [DimIndex::Average, DimIndex::At(1)];
        let got = ri.cosa(&data, &mixed, &data, &mixed).unwrap();
        assert!((got - 1.0).abs() < 1e-12, "cosa {got}");
    }

    #[test]
    fn test_cosa_rejects_mismatched_average() {
        let ri = small_indexer();
        let data = vec![0; ri.data_numel() as usize];
        let err = ri
            .cosa(
                &data,
                &[DimIndex::Average, DimIndex::At(0)],
                &data,
                &[DimIndex::At(0), DimIndex::At(0)],
            )
            .unwrap_err();
        assert_eq!(err, Error::AverageMismatch { dim: 0 });
    }

    #[test]
    fn test_cosa_zero_norm_is_an_error() {
        let ri = small_indexer();
        let data = vec![0; ri.data_numel() as usize];
        let avg = [DimIndex::Average, DimIndex::Average];
        assert_eq!(ri.cosa(&data, &avg, &data, &avg).unwrap_err(), Error::ZeroNorm);
    }

    #[test]
    fn test_cosa_distinguishes_disjoint_slices() {
        let mut ri = small_indexer();
        let numel = ri.data_numel() as usize;
        let mut a = vec![0; numel];
        let mut b = vec![0; numel];

        ri.encode(&mut a, &[0, 0], 50).unwrap();
        ri.encode(&mut b, &[0, 0], 50).unwrap();
        ri.encode(&mut b, &[7, 3], 50).unwrap();

        let avg = [DimIndex::Average, DimIndex::Average];
        let same = ri.cosa(&a, &avg, &b, &avg).unwrap();
        assert!(same > 0.5, "shared content should correlate, got {same}");

        let mut c = vec![0; numel];
        ri.encode(&mut c, &[9, 9], 50).unwrap();
        let disjoint = ri.cosa(&a, &avg, &c, &avg).unwrap();
        assert!(
            disjoint.abs() < same,
            "disjoint content should correlate less: {disjoint} vs {same}"
        );
    }

    /// The concrete two-dimensional scenario: ranges {10000, 1000},
    /// index counts {8, 4}, weight 5 encoded at (3, 7).
    #[test]
    fn test_reference_scenario() {
        let mut ri = RandomIndexer::new(&[spec(10_000, 8), spec(1_000, 4)], 0x12345).unwrap();
        ri.set_range(0, 4).unwrap();
        ri.set_range(1, 8).unwrap();

        let mut data = vec![0; ri.data_numel() as usize];
        ri.encode(&mut data, &[3, 7], 5).unwrap();

        let first = ri.decode(&data, &[3, 7]).unwrap();
        assert!(first > 0.0, "sign must match the encoded weight");
        assert!((first - 5.0).abs() < 1e-9, "decoded {first}");

        let second = ri.decode(&data, &[3, 7]).unwrap();
        assert_eq!(first.to_bits(), second.to_bits(), "untouched buffer decodes stably");
    }
}
