//! Mixed-radix composition of per-axis local indices into one flat offset.
//!
//! Axis 0 is the fastest-varying digit:
//! `offset = Σ_i local[i] * Π_{j<i} count[j]`.

use crate::error::{HistError, Result};

/// Precomputed strides for a fixed list of axis local counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatIndexer {
    counts: Vec<usize>,
    strides: Vec<usize>,
    len: usize,
}

impl FlatIndexer {
    /// Build strides for the given local counts.
    ///
    /// Fails with [`HistError::TooManyBins`] if the total does not fit in `usize`.
    pub fn new(counts: Vec<usize>) -> Result<Self> {
        let mut strides = Vec::with_capacity(counts.len());
        let mut len = 1usize;
        for &c in &counts {
            strides.push(len);
            len = len.checked_mul(c).ok_or(HistError::TooManyBins)?;
        }
        Ok(Self { counts, strides, len })
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.counts.len()
    }

    /// Total number of flat bins (product of local counts).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no bins at all (some axis has zero local bins).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Local counts per axis.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Stride of each axis.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Flatten one local index per axis, checking arity and bounds.
    pub fn flatten(&self, local: &[usize]) -> Result<usize> {
        if local.len() != self.counts.len() {
            return Err(HistError::DimensionMismatch {
                expected: self.counts.len(),
                got: local.len(),
            });
        }
        let mut offset = 0;
        for (axis, ((&i, &count), &stride)) in
            local.iter().zip(&self.counts).zip(&self.strides).enumerate()
        {
            if i >= count {
                return Err(HistError::IndexOutOfRange { axis, index: i, len: count });
            }
            offset += i * stride;
        }
        Ok(offset)
    }

    /// Fold already-resolved local indices, short-circuiting on the first `None`.
    ///
    /// The caller guarantees arity and that every `Some` is within its axis.
    #[inline]
    pub(crate) fn compose<I>(&self, local: I) -> Option<usize>
    where
        I: IntoIterator<Item = Option<usize>>,
    {
        let mut offset = 0;
        for (i, &stride) in local.into_iter().zip(&self.strides) {
            offset += i? * stride;
        }
        Some(offset)
    }

    /// Inverse of [`flatten`](Self::flatten).
    pub fn unflatten(&self, offset: usize) -> Result<Vec<usize>> {
        if offset >= self.len {
            return Err(HistError::OffsetOutOfRange { offset, len: self.len });
        }
        let mut rest = offset;
        Ok(self
            .counts
            .iter()
            .map(|&c| {
                let i = rest % c;
                rest /= c;
                i
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_zero_is_fastest() {
        let ix = FlatIndexer::new(vec![2, 3]).unwrap();
        assert_eq!(ix.len(), 6);
        assert_eq!(ix.strides(), &[1, 2]);
        assert_eq!(ix.flatten(&[0, 1]).unwrap(), 2);
        assert_eq!(ix.flatten(&[1, 0]).unwrap(), 1);
        assert_eq!(ix.flatten(&[1, 2]).unwrap(), 5);
    }

    #[test]
    fn flatten_is_a_bijection() {
        let ix = FlatIndexer::new(vec![3, 1, 4, 2]).unwrap();
        let mut seen = vec![false; ix.len()];
        for a in 0..3 {
            for b in 0..1 {
                for c in 0..4 {
                    for d in 0..2 {
                        let off = ix.flatten(&[a, b, c, d]).unwrap();
                        assert!(!seen[off], "offset {off} produced twice");
                        seen[off] = true;
                        assert_eq!(ix.unflatten(off).unwrap(), vec![a, b, c, d]);
                    }
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn arity_and_bounds() {
        let ix = FlatIndexer::new(vec![2, 3]).unwrap();
        assert_eq!(
            ix.flatten(&[0]).unwrap_err(),
            HistError::DimensionMismatch { expected: 2, got: 1 }
        );
        assert_eq!(
            ix.flatten(&[0, 0, 0]).unwrap_err(),
            HistError::DimensionMismatch { expected: 2, got: 3 }
        );
        assert_eq!(
            ix.flatten(&[0, 3]).unwrap_err(),
            HistError::IndexOutOfRange { axis: 1, index: 3, len: 3 }
        );
        assert!(matches!(ix.unflatten(6), Err(HistError::OffsetOutOfRange { .. })));
    }

    #[test]
    fn compose_short_circuits() {
        let ix = FlatIndexer::new(vec![4, 5]).unwrap();
        assert_eq!(ix.compose([Some(3), Some(2)]), Some(11));
        assert_eq!(ix.compose([Some(3), None]), None);
    }

    #[test]
    fn overflow_is_detected() {
        assert_eq!(FlatIndexer::new(vec![usize::MAX, 2]).unwrap_err(), HistError::TooManyBins);
    }

    #[test]
    fn zero_count_axis_means_no_bins() {
        let ix = FlatIndexer::new(vec![3, 0]).unwrap();
        assert!(ix.is_empty());
    }
}
