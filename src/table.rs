//! Per-dimension random index table.
//!
//! One [`IndexTable`] maps every explicit index value of a dimension to
//! `cols` pseudo-random positions in `[0, data_range)`. Rows are generated
//! lazily: the table starts empty and [`IndexTable::grow`] appends rows on
//! demand, drawing each position by rejection sampling until it is unique
//! within its row. The first `cols / 2` columns carry positive sign during
//! superposition, the rest negative.

use rand::Rng;

use crate::error::{Error, Result};

/// Hard bound on rejection-sampling draws per generated cell, as a
/// multiple of `data_range`. Unreachable for any legal configuration
/// since a draw succeeds with probability at least `1 / data_range`.
const DRAW_LIMIT_FACTOR: u64 = 64;

/// Growable table of collision-free random positions for one dimension.
///
/// Storage is a flat row-major `Vec<u16>`; each cell is a position in
/// `[0, data_range)` and all cells within a row are pairwise distinct.
#[derive(Debug)]
pub struct IndexTable {
    data_range: u32,
    cols: u32,
    rows: u32,
    cells: Vec<u16>,
}

impl IndexTable {
    /// Create an empty table for a dimension with the given explicit
    /// position range and random index count.
    ///
    /// `data_range` must fit the `u16` cell type, `index_count` must be
    /// even, nonzero and strictly smaller than `data_range` (required for
    /// uniqueness within a row).
    pub fn new(data_range: u32, index_count: u32) -> Result<Self> {
        if data_range > u16::MAX as u32 {
            return Err(Error::RangeTooLarge { data_range });
        }
        if index_count == 0 {
            return Err(Error::IndexCountZero);
        }
        if index_count % 2 != 0 {
            return Err(Error::IndexCountOdd { index_count });
        }
        if index_count >= data_range {
            return Err(Error::IndexCountTooLarge {
                index_count,
                data_range,
            });
        }
        Ok(Self {
            data_range,
            cols: index_count,
            rows: 0,
            cells: Vec::new(),
        })
    }

    /// Number of explicit index values with generated rows so far.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Random indices per explicit index value.
    #[inline]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Columns carrying positive sign (the first half).
    #[inline]
    pub fn positive_cols(&self) -> u32 {
        self.cols >> 1
    }

    /// Size of the explicit position domain of this dimension.
    #[inline]
    pub fn data_range(&self) -> u32 {
        self.data_range
    }

    /// Storage footprint in table cells.
    #[inline]
    pub fn size_cells(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Storage footprint in bytes.
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.size_cells() * std::mem::size_of::<u16>()
    }

    /// Stored random position for `(row, col)`, guaranteed `< data_range`.
    ///
    /// The row must have been generated via [`IndexTable::grow`] first;
    /// the engine validates coordinates before entering its superposition
    /// loops.
    #[inline]
    pub fn item(&self, row: u32, col: u32) -> u16 {
        debug_assert!(row < self.rows);
        debug_assert!(col < self.cols);
        self.cells[row as usize * self.cols as usize + col as usize]
    }

    /// Grow the table to at least `target_rows` rows.
    ///
    /// Monotonic and idempotent: a target at or below the current row
    /// count is a no-op, and previously generated rows are never altered.
    /// Each new cell is drawn uniformly from `[0, data_range)` and redrawn
    /// until unique within its row (linear scan; the row is short).
    /// Returns the row count after growth.
    pub fn grow<R: Rng>(&mut self, target_rows: u32, rng: &mut R) -> Result<u32> {
        if target_rows <= self.rows {
            return Ok(self.rows);
        }

        let cols = self.cols as usize;
        let draw_limit = DRAW_LIMIT_FACTOR * self.data_range as u64;
        self.cells.resize(target_rows as usize * cols, 0);

        for row in self.rows as usize..target_rows as usize {
            let base = row * cols;
            for col in 0..cols {
                let mut draws = 0u64;
                self.cells[base + col] = loop {
                    let candidate = rng.gen_range(0..self.data_range) as u16;
                    if !self.cells[base..base + col].contains(&candidate) {
                        break candidate;
                    }
                    draws += 1;
                    if draws >= draw_limit {
                        return Err(Error::DrawLimit {
                            data_range: self.data_range,
                            index_count: self.cols,
                        });
                    }
                };
            }
        }

        let added = target_rows - self.rows;
        self.rows = target_rows;
        tracing::trace!(added, rows = self.rows, "grew random index table");
        Ok(self.rows)
    }
}
