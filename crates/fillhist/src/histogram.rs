//! The histogram: axes, flat indexer and bin storage behind one fill protocol.

use serde::{Deserialize, Serialize};

use crate::axis::{Axis, AxisSpec};
use crate::config::{GenericConfig, HistogramConfig};
use crate::error::{HistError, Result};
use crate::index::FlatIndexer;
use crate::storage::{BinKind, BinStorage, BinValue, Combine, Increment, Weight};

/// Outcome of a fill that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatus {
    /// A bin was updated.
    Filled,
    /// Some coordinate fell outside its axis with no catch-bin; nothing was updated.
    Dropped,
}

/// Running count of fills by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillStats {
    /// Fills that updated a bin.
    pub filled: u64,
    /// Fills dropped as out of range.
    pub dropped: u64,
}

impl FillStats {
    /// Total number of accepted fill calls.
    pub fn total(&self) -> u64 {
        self.filled + self.dropped
    }

    fn since(&self, before: FillStats) -> FillStats {
        FillStats { filled: self.filled - before.filled, dropped: self.dropped - before.dropped }
    }

    fn add(&mut self, other: FillStats) {
        self.filled += other.filled;
        self.dropped += other.dropped;
    }
}

/// Serializable state of a histogram: axes, bin values and fill statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    /// Axes in coordinate order.
    pub axes: Vec<AxisSpec>,
    /// Flat bin values (axis 0 fastest).
    pub bins: BinStorage,
    /// Fill statistics.
    #[serde(default)]
    pub stats: FillStats,
}

/// A multi-dimensional histogram with a fixed grid of bins.
///
/// ```
/// use fillhist::{Axis, BinKind, FillStatus, Histogram};
///
/// let mut h = Histogram::new(vec![Axis::uniform(2, 0.0, 10.0)?], BinKind::Integer, None)?;
/// assert_eq!(h.fill_point(&[3.0])?, FillStatus::Filled);
/// assert_eq!(h.bin_value(&[1])?.as_i64(), Some(1));
/// # Ok::<(), fillhist::HistError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    axes: Vec<Axis>,
    indexer: FlatIndexer,
    storage: BinStorage,
    stats: FillStats,
}

impl Histogram {
    /// Build an empty histogram.
    ///
    /// `generic` carries the initial value and unit weight of generic bins and must be
    /// `None` for numeric kinds. Generic bins without a config start empty (`null`) and
    /// have no unit weight.
    pub fn new(axes: Vec<Axis>, kind: BinKind, generic: Option<GenericConfig>) -> Result<Self> {
        if axes.is_empty() {
            return Err(HistError::InvalidConfig("at least one axis is required".into()));
        }
        if generic.is_some() && kind != BinKind::Generic {
            return Err(HistError::InvalidConfig(format!(
                "generic defaults given for {kind:?} bins"
            )));
        }
        let indexer = FlatIndexer::new(axes.iter().map(Axis::local_count).collect())?;
        let n = indexer.len();
        let cfg = generic.unwrap_or_default();
        let storage = BinStorage::try_with_kind(kind, n, cfg.initial, cfg.unit)?;
        log::debug!("histogram: ndim={}, nbins={n}, kind={kind:?}", axes.len());
        Ok(Self { axes, indexer, storage, stats: FillStats::default() })
    }

    /// Dimensionality.
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Total number of bins, including under/overflow.
    pub fn nbins(&self) -> usize {
        self.indexer.len()
    }

    /// Axes in coordinate order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Bin-value kind.
    pub fn kind(&self) -> BinKind {
        self.storage.kind()
    }

    /// Flat bin storage (axis 0 fastest).
    pub fn storage(&self) -> &BinStorage {
        &self.storage
    }

    /// Fill statistics since construction (or the last reset).
    pub fn stats(&self) -> FillStats {
        self.stats
    }

    /// Config that rebuilds an empty histogram of the same shape.
    pub fn config(&self) -> HistogramConfig {
        let generic = match &self.storage {
            BinStorage::Generic(g) => {
                Some(GenericConfig { initial: g.initial.clone(), unit: g.unit.clone() })
            }
            _ => None,
        };
        HistogramConfig {
            axes: self.axes.iter().map(Axis::spec).collect(),
            kind: self.kind(),
            generic,
        }
    }

    fn check_arity(&self, got: usize) -> Result<()> {
        if got != self.axes.len() {
            return Err(HistError::DimensionMismatch { expected: self.axes.len(), got });
        }
        Ok(())
    }

    /// Flat offset of the bin a point falls into, `None` if it is dropped.
    pub fn locate(&self, coords: &[f64]) -> Result<Option<usize>> {
        self.check_arity(coords.len())?;
        Ok(self.indexer.compose(self.axes.iter().zip(coords).map(|(a, &x)| a.locate(x))))
    }

    /// Fill one point.
    ///
    /// Out-of-range coordinates without a catch-bin give [`FillStatus::Dropped`].
    /// Errors (wrong coordinate count, bad weight, combine on a numeric kind, failing
    /// combine) leave every bin untouched.
    pub fn fill(
        &mut self,
        coords: &[f64],
        weight: Option<Weight<'_>>,
        combine: Option<Combine<'_>>,
    ) -> Result<FillStatus> {
        self.check_arity(coords.len())?;
        let inc = self.storage.prepare(weight, combine)?;
        self.fill_prepared(coords, &inc)
    }

    /// Fill one point with the kind's default weight.
    pub fn fill_point(&mut self, coords: &[f64]) -> Result<FillStatus> {
        self.fill(coords, None, None)
    }

    /// Fill one point with a numeric weight.
    pub fn fill_weighted(&mut self, coords: &[f64], weight: f64) -> Result<FillStatus> {
        self.fill(coords, Some(Weight::Number(weight)), None)
    }

    #[inline]
    fn fill_prepared(&mut self, coords: &[f64], inc: &Increment<'_>) -> Result<FillStatus> {
        let located = self.indexer.compose(self.axes.iter().zip(coords).map(|(a, &x)| a.locate(x)));
        match located {
            Some(offset) => {
                self.storage.apply(offset, inc)?;
                self.stats.filled += 1;
                Ok(FillStatus::Filled)
            }
            None => {
                self.stats.dropped += 1;
                Ok(FillStatus::Dropped)
            }
        }
    }

    /// Validate columnar input and return the row count.
    pub(crate) fn check_columns(
        &self,
        columns: &[&[f64]],
        weights: Option<&[f64]>,
    ) -> Result<usize> {
        self.check_arity(columns.len())?;
        let n = columns[0].len();
        let lengths = columns.iter().map(|c| c.len()).chain(weights.map(<[f64]>::len));
        for (column, got) in lengths.enumerate() {
            if got != n {
                return Err(HistError::ColumnLength { column, expected: n, got });
            }
        }
        Ok(n)
    }

    /// Fill rows `rows` of columnar input into `self`, stopping at the first error.
    pub(crate) fn fill_rows(
        &mut self,
        columns: &[&[f64]],
        weights: Option<&[f64]>,
        rows: std::ops::Range<usize>,
    ) -> Result<FillStats> {
        let before = self.stats;
        let unit = match weights {
            Some(_) => None,
            None => Some(self.storage.prepare(None, None)?),
        };
        let mut coords = vec![0.0; columns.len()];
        for row in rows {
            for (c, col) in coords.iter_mut().zip(columns) {
                *c = col[row];
            }
            if let Some(w) = weights {
                let inc = self.storage.prepare(Some(Weight::Number(w[row])), None)?;
                self.fill_prepared(&coords, &inc)?;
            } else if let Some(inc) = &unit {
                self.fill_prepared(&coords, inc)?;
            }
        }
        Ok(self.stats.since(before))
    }

    /// Fill many points given as one column per axis, with optional per-row weights.
    ///
    /// Either every row is applied or, on error, none is.
    pub fn fill_columns(
        &mut self,
        columns: &[&[f64]],
        weights: Option<&[f64]>,
    ) -> Result<FillStats> {
        let n = self.check_columns(columns, weights)?;
        let mut partial = self.identity_like();
        let stats = partial.fill_rows(columns, weights, 0..n)?;
        self.merge(&partial, None)?;
        if n > 0 && stats.filled == 0 {
            log::warn!("columnar fill dropped all {n} rows");
        }
        Ok(stats)
    }

    /// Value of the bin at the given local indices (one per axis).
    pub fn bin_value(&self, local: &[usize]) -> Result<BinValue<'_>> {
        let offset = self.indexer.flatten(local)?;
        self.bin_value_at(offset)
    }

    /// Value of the bin at a flat offset.
    pub fn bin_value_at(&self, offset: usize) -> Result<BinValue<'_>> {
        self.storage
            .read(offset)
            .ok_or(HistError::OffsetOutOfRange { offset, len: self.nbins() })
    }

    /// Flat offset of the given local indices.
    pub fn flat_offset(&self, local: &[usize]) -> Result<usize> {
        self.indexer.flatten(local)
    }

    /// Local indices of a flat offset.
    pub fn local_indices(&self, offset: usize) -> Result<Vec<usize>> {
        self.indexer.unflatten(offset)
    }

    /// All bins as `(local_indices, value)` in flat order.
    pub fn iter_bins(&self) -> impl Iterator<Item = (Vec<usize>, BinValue<'_>)> + '_ {
        (0..self.nbins()).filter_map(move |offset| {
            Some((self.indexer.unflatten(offset).ok()?, self.storage.read(offset)?))
        })
    }

    /// Add the bins and statistics of `other` into `self`.
    ///
    /// Axes and kinds must be identical. Generic bins use `combine(into, from)` when
    /// given and additive combine otherwise. On error `self` is unchanged.
    pub fn merge(&mut self, other: &Histogram, combine: Option<Combine<'_>>) -> Result<()> {
        if self.axes != other.axes {
            return Err(HistError::ShapeMismatch(format!(
                "axes differ: {:?} vs {:?}",
                self.indexer.counts(),
                other.indexer.counts()
            )));
        }
        self.storage.merge_from(&other.storage, combine)?;
        self.stats.add(other.stats);
        log::debug!(
            "merged histogram: +{} filled, +{} dropped",
            other.stats.filled,
            other.stats.dropped
        );
        Ok(())
    }

    /// Empty histogram of the same shape whose bins are merge identities.
    pub(crate) fn identity_like(&self) -> Self {
        Self {
            axes: self.axes.clone(),
            indexer: self.indexer.clone(),
            storage: self.storage.identity_like(),
            stats: FillStats::default(),
        }
    }

    /// Restore every bin to its default and clear the statistics.
    pub fn reset(&mut self) {
        self.storage.reset();
        self.stats = FillStats::default();
    }

    /// Serializable copy of the full state.
    pub fn snapshot(&self) -> HistogramSnapshot {
        HistogramSnapshot {
            axes: self.axes.iter().map(Axis::spec).collect(),
            bins: self.storage.clone(),
            stats: self.stats,
        }
    }

    /// Rebuild a histogram from a snapshot, validating axes and bin count.
    pub fn from_snapshot(snapshot: HistogramSnapshot) -> Result<Self> {
        let axes = snapshot.axes.into_iter().map(Axis::try_from).collect::<Result<Vec<_>>>()?;
        if axes.is_empty() {
            return Err(HistError::InvalidConfig("at least one axis is required".into()));
        }
        let indexer = FlatIndexer::new(axes.iter().map(Axis::local_count).collect())?;
        if snapshot.bins.len() != indexer.len() {
            return Err(HistError::ShapeMismatch(format!(
                "snapshot has {} bins, axes need {}",
                snapshot.bins.len(),
                indexer.len()
            )));
        }
        Ok(Self { axes, indexer, storage: snapshot.bins, stats: snapshot.stats })
    }
}
