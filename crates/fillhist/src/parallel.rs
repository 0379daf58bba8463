//! Parallel columnar fill: rows are split into chunks, every chunk fills a private
//! histogram on the rayon pool, and the partial histograms are merged in chunk order.

use std::ops::Range;

use rayon::prelude::*;

use crate::error::Result;
use crate::histogram::{FillStats, Histogram};

/// Rows per chunk when the caller passes `0`.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 16;

fn chunk_ranges(n_rows: usize, chunk_size: usize) -> Vec<Range<usize>> {
    (0..n_rows.div_ceil(chunk_size))
        .map(|c| {
            let start = c * chunk_size;
            start..(start + chunk_size).min(n_rows)
        })
        .collect()
}

impl Histogram {
    /// Parallel version of [`fill_columns`](Histogram::fill_columns).
    ///
    /// Runs on the current rayon pool. Generic bins are combined additively.
    /// Either every row is applied or, on error, none is.
    pub fn par_fill_columns(
        &mut self,
        columns: &[&[f64]],
        weights: Option<&[f64]>,
        chunk_size: usize,
    ) -> Result<FillStats> {
        let n = self.check_columns(columns, weights)?;
        let chunk_size = if chunk_size == 0 { DEFAULT_CHUNK_SIZE } else { chunk_size };

        let template = self.identity_like();
        let partials: Vec<Result<Histogram>> = chunk_ranges(n, chunk_size)
            .into_par_iter()
            .map(|rows| {
                let mut part = template.clone();
                part.fill_rows(columns, weights, rows)?;
                Ok(part)
            })
            .collect();

        let mut total = template;
        for part in partials {
            total.merge(&part?, None)?;
        }
        let stats = total.stats();
        self.merge(&total, None)?;
        if n > 0 && stats.filled == 0 {
            log::warn!("parallel fill dropped all {n} rows");
        }
        Ok(stats)
    }
}
