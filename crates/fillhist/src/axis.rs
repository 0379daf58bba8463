//! Axis definitions and coordinate-to-bin resolution.
//!
//! Local index layout of one axis:
//!
//! ```text
//! [underflow?] [bin 0] [bin 1] ... [bin n-1] [overflow?]
//! ```
//!
//! The underflow bin, when present, is local index 0 and shifts ordinary bins by one.
//! The overflow bin, when present, is the last local index.

use serde::{Deserialize, Serialize};

use crate::error::{HistError, Result};

fn flow_default() -> bool {
    true
}

/// Serializable axis descriptor, as supplied by a caller or a config file.
///
/// Under/overflow bins are enabled unless explicitly switched off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AxisSpec {
    /// `bins` equal-width bins over `[low, high)`.
    Uniform {
        /// Number of ordinary bins.
        bins: usize,
        /// Lower edge (inclusive).
        low: f64,
        /// Upper edge (exclusive).
        high: f64,
        /// Catch coordinates below `low`.
        #[serde(default = "flow_default")]
        underflow: bool,
        /// Catch coordinates at or above `high`.
        #[serde(default = "flow_default")]
        overflow: bool,
    },
    /// Explicit, strictly increasing bin edges (`n + 1` values for `n` bins).
    Edges {
        /// Bin edges.
        edges: Vec<f64>,
        /// Catch coordinates below the first edge.
        #[serde(default = "flow_default")]
        underflow: bool,
        /// Catch coordinates at or above the last edge.
        #[serde(default = "flow_default")]
        overflow: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Binning {
    Uniform { n: usize, low: f64, high: f64 },
    Edges(Vec<f64>),
}

/// One validated histogram dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxisSpec", into = "AxisSpec")]
pub struct Axis {
    binning: Binning,
    underflow: bool,
    overflow: bool,
}

impl Axis {
    /// Uniform axis with `n` bins over `[low, high)`, under/overflow enabled.
    pub fn uniform(n: usize, low: f64, high: f64) -> Result<Self> {
        if !low.is_finite() || !high.is_finite() {
            return Err(HistError::InvalidAxis(format!(
                "range must be finite, got [{low}, {high})"
            )));
        }
        if low >= high {
            return Err(HistError::InvalidAxis(format!(
                "low must be < high, got [{low}, {high})"
            )));
        }
        if n > usize::MAX - 2 {
            return Err(HistError::InvalidAxis(format!("bin count too large: {n}")));
        }
        Ok(Self { binning: Binning::Uniform { n, low, high }, underflow: true, overflow: true })
    }

    /// Axis over explicit edges, under/overflow enabled.
    pub fn edges(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(HistError::InvalidAxis(format!(
                "need at least 2 edges, got {}",
                edges.len()
            )));
        }
        if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
            return Err(HistError::InvalidAxis(format!("edges must be finite, got {bad}")));
        }
        if let Some(i) = edges.windows(2).position(|w| w[0] >= w[1]) {
            return Err(HistError::InvalidAxis(format!(
                "edges must be strictly increasing: edges[{i}]={} >= edges[{}]={}",
                edges[i],
                i + 1,
                edges[i + 1]
            )));
        }
        Ok(Self { binning: Binning::Edges(edges), underflow: true, overflow: true })
    }

    /// Enable or disable the underflow bin.
    pub fn with_underflow(mut self, enabled: bool) -> Self {
        self.underflow = enabled;
        self
    }

    /// Enable or disable the overflow bin.
    pub fn with_overflow(mut self, enabled: bool) -> Self {
        self.overflow = enabled;
        self
    }

    /// Number of ordinary bins (excluding under/overflow).
    pub fn n_bins(&self) -> usize {
        match &self.binning {
            Binning::Uniform { n, .. } => *n,
            Binning::Edges(edges) => edges.len() - 1,
        }
    }

    /// Whether coordinates below the range land in a catch-bin.
    pub fn has_underflow(&self) -> bool {
        self.underflow
    }

    /// Whether coordinates at or above the range land in a catch-bin.
    pub fn has_overflow(&self) -> bool {
        self.overflow
    }

    /// Number of local bins, including under/overflow.
    pub fn local_count(&self) -> usize {
        self.n_bins() + usize::from(self.underflow) + usize::from(self.overflow)
    }

    /// Half-open range `[low, high)` covered by ordinary bins.
    pub fn range(&self) -> (f64, f64) {
        match &self.binning {
            Binning::Uniform { low, high, .. } => (*low, *high),
            Binning::Edges(edges) => (edges[0], edges[edges.len() - 1]),
        }
    }

    /// Edges of the ordinary bins (length `n_bins + 1`).
    pub fn bin_edges(&self) -> Vec<f64> {
        match &self.binning {
            Binning::Uniform { n, low, high } => {
                (0..=*n).map(|i| uniform_edge(*low, *high, *n, i)).collect()
            }
            Binning::Edges(edges) => edges.clone(),
        }
    }

    /// Local index of the underflow bin, if enabled.
    pub fn underflow_index(&self) -> Option<usize> {
        self.underflow.then_some(0)
    }

    /// Local index of the overflow bin, if enabled.
    pub fn overflow_index(&self) -> Option<usize> {
        self.overflow.then(|| self.local_count() - 1)
    }

    /// Resolve a coordinate to a local index.
    ///
    /// Returns `None` when the coordinate is not finite, or falls outside the range
    /// on a side without a catch-bin.
    #[inline]
    pub fn locate(&self, x: f64) -> Option<usize> {
        if !x.is_finite() {
            return None;
        }
        let (low, high) = self.range();
        if x < low {
            return self.underflow_index();
        }
        if x >= high {
            return self.overflow_index();
        }
        let bin = match &self.binning {
            Binning::Uniform { n, low, high } => {
                if *n == 0 {
                    return None;
                }
                let raw = (uniform_fraction(x, *low, *high) * *n as f64).floor();
                // x == high - ulp can round up to n
                (raw as usize).min(n - 1)
            }
            // low <= x < high, so the count of edges <= x is in 1..=n
            Binning::Edges(edges) => edges.partition_point(|&e| e <= x) - 1,
        };
        Some(bin + usize::from(self.underflow))
    }

    /// Interval `[lo, hi)` covered by a local bin. Flow bins extend to infinity.
    pub fn bin_bounds(&self, local: usize) -> Option<(f64, f64)> {
        if local >= self.local_count() {
            return None;
        }
        let (low, high) = self.range();
        if self.underflow_index() == Some(local) {
            return Some((f64::NEG_INFINITY, low));
        }
        if self.overflow_index() == Some(local) {
            return Some((high, f64::INFINITY));
        }
        let i = local - usize::from(self.underflow);
        match &self.binning {
            Binning::Uniform { n, low, high } => {
                Some((uniform_edge(*low, *high, *n, i), uniform_edge(*low, *high, *n, i + 1)))
            }
            Binning::Edges(edges) => Some((edges[i], edges[i + 1])),
        }
    }

    /// Descriptor that rebuilds this axis.
    pub fn spec(&self) -> AxisSpec {
        match &self.binning {
            Binning::Uniform { n, low, high } => AxisSpec::Uniform {
                bins: *n,
                low: *low,
                high: *high,
                underflow: self.underflow,
                overflow: self.overflow,
            },
            Binning::Edges(edges) => AxisSpec::Edges {
                edges: edges.clone(),
                underflow: self.underflow,
                overflow: self.overflow,
            },
        }
    }
}

// Finite bounds can still have a width that overflows to inf.
fn uniform_fraction(x: f64, low: f64, high: f64) -> f64 {
    let width = high - low;
    if width.is_finite() {
        (x - low) / width
    } else {
        (0.5 * x - 0.5 * low) / (0.5 * high - 0.5 * low)
    }
}

fn uniform_edge(low: f64, high: f64, n: usize, i: usize) -> f64 {
    if i == n {
        return high;
    }
    let width = high - low;
    if width.is_finite() {
        low + width * (i as f64) / (n as f64)
    } else {
        let t = i as f64 / n as f64;
        low * (1.0 - t) + high * t
    }
}

impl TryFrom<AxisSpec> for Axis {
    type Error = HistError;

    fn try_from(spec: AxisSpec) -> Result<Self> {
        match spec {
            AxisSpec::Uniform { bins, low, high, underflow, overflow } => {
                let axis = Axis::uniform(bins, low, high)?;
                Ok(axis.with_underflow(underflow).with_overflow(overflow))
            }
            AxisSpec::Edges { edges, underflow, overflow } => {
                Ok(Axis::edges(edges)?.with_underflow(underflow).with_overflow(overflow))
            }
        }
    }
}

impl From<Axis> for AxisSpec {
    fn from(axis: Axis) -> Self {
        axis.spec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_with_flows_layout() {
        let ax = Axis::uniform(2, 0.0, 10.0).unwrap();
        assert_eq!(ax.local_count(), 4);
        assert_eq!(ax.locate(-1.0), Some(0));
        assert_eq!(ax.locate(3.0), Some(1));
        assert_eq!(ax.locate(7.0), Some(2));
        assert_eq!(ax.locate(100.0), Some(3));
        assert_eq!(ax.locate(10.0), Some(3));
        assert_eq!(ax.locate(0.0), Some(1));
    }

    #[test]
    fn uniform_without_flows_rejects() {
        let ax = Axis::uniform(4, 0.0, 1.0).unwrap().with_underflow(false).with_overflow(false);
        assert_eq!(ax.local_count(), 4);
        assert_eq!(ax.locate(-0.1), None);
        assert_eq!(ax.locate(1.0), None);
        assert_eq!(ax.locate(0.0), Some(0));
        assert_eq!(ax.locate(0.999), Some(3));
    }

    #[test]
    fn underflow_only() {
        let ax = Axis::uniform(3, 0.0, 3.0).unwrap().with_overflow(false);
        assert_eq!(ax.local_count(), 4);
        assert_eq!(ax.locate(-5.0), Some(0));
        assert_eq!(ax.locate(0.5), Some(1));
        assert_eq!(ax.locate(2.5), Some(3));
        assert_eq!(ax.locate(3.0), None);
        assert_eq!(ax.overflow_index(), None);
    }

    #[test]
    fn non_finite_is_always_rejected() {
        let ax = Axis::uniform(2, 0.0, 1.0).unwrap();
        assert_eq!(ax.locate(f64::NAN), None);
        assert_eq!(ax.locate(f64::INFINITY), None);
        assert_eq!(ax.locate(f64::NEG_INFINITY), None);

        let ax = Axis::edges(vec![0.0, 1.0]).unwrap();
        assert_eq!(ax.locate(f64::NAN), None);
    }

    #[test]
    fn upper_edge_rounding_is_clamped() {
        let high: f64 = 0.3;
        let x = f64::from_bits(high.to_bits() - 1);
        let ax = Axis::uniform(3, 0.0, high).unwrap().with_overflow(false).with_underflow(false);
        assert_eq!(ax.locate(x), Some(2));
    }

    #[test]
    fn uniform_is_monotonic() {
        let ax = Axis::uniform(7, -1.5, 2.25).unwrap().with_underflow(false).with_overflow(false);
        let mut prev = 0;
        for i in 0..10_000 {
            let x = -1.5 + 3.75 * (i as f64) / 10_000.0;
            let b = ax.locate(x).unwrap();
            assert!(b >= prev, "x={x}: {b} < {prev}");
            assert!(b < 7);
            prev = b;
        }
        assert_eq!(prev, 6);
    }

    #[test]
    fn full_f64_range_uniform() {
        let ax = Axis::uniform(2, -f64::MAX, f64::MAX)
            .unwrap()
            .with_underflow(false)
            .with_overflow(false);
        assert_eq!(ax.locate(-f64::MAX), Some(0));
        assert_eq!(ax.locate(-f64::MAX / 2.0), Some(0));
        assert_eq!(ax.locate(f64::MAX / 2.0), Some(1));
        assert_eq!(ax.locate(f64::MAX), None);
        assert_eq!(ax.bin_edges(), vec![-f64::MAX, 0.0, f64::MAX]);
    }

    #[test]
    fn edges_binary_search() {
        let ax = Axis::edges(vec![0.0, 1.0, 5.0, 6.0]).unwrap();
        assert_eq!(ax.local_count(), 5);
        assert_eq!(ax.locate(-0.1), Some(0));
        assert_eq!(ax.locate(0.0), Some(1));
        assert_eq!(ax.locate(0.99), Some(1));
        assert_eq!(ax.locate(1.0), Some(2));
        assert_eq!(ax.locate(4.9), Some(2));
        assert_eq!(ax.locate(5.0), Some(3));
        assert_eq!(ax.locate(6.0), Some(4));

        let ax = ax.with_underflow(false);
        assert_eq!(ax.locate(-0.1), None);
        assert_eq!(ax.locate(0.0), Some(0));
        assert_eq!(ax.locate(5.5), Some(2));
        assert_eq!(ax.locate(6.0), Some(3));
    }

    #[test]
    fn zero_bin_uniform_axis() {
        let ax = Axis::uniform(0, 0.0, 1.0).unwrap();
        assert_eq!(ax.local_count(), 2);
        assert_eq!(ax.locate(0.5), None);
        assert_eq!(ax.locate(-1.0), Some(0));
        assert_eq!(ax.locate(2.0), Some(1));
    }

    #[test]
    fn invalid_axes() {
        assert!(matches!(Axis::uniform(3, 1.0, 1.0), Err(HistError::InvalidAxis(_))));
        assert!(matches!(Axis::uniform(3, 2.0, 1.0), Err(HistError::InvalidAxis(_))));
        assert!(matches!(Axis::uniform(3, f64::NAN, 1.0), Err(HistError::InvalidAxis(_))));
        assert!(matches!(Axis::edges(vec![1.0]), Err(HistError::InvalidAxis(_))));
        assert!(matches!(Axis::edges(vec![0.0, 1.0, 1.0]), Err(HistError::InvalidAxis(_))));
        assert!(matches!(Axis::edges(vec![0.0, 2.0, 1.0]), Err(HistError::InvalidAxis(_))));
        assert!(matches!(Axis::edges(vec![0.0, f64::INFINITY]), Err(HistError::InvalidAxis(_))));
    }

    #[test]
    fn bin_bounds_cover_flows() {
        let ax = Axis::uniform(2, 0.0, 10.0).unwrap();
        assert_eq!(ax.bin_bounds(0), Some((f64::NEG_INFINITY, 0.0)));
        assert_eq!(ax.bin_bounds(1), Some((0.0, 5.0)));
        assert_eq!(ax.bin_bounds(2), Some((5.0, 10.0)));
        assert_eq!(ax.bin_bounds(3), Some((10.0, f64::INFINITY)));
        assert_eq!(ax.bin_bounds(4), None);
        assert_eq!(ax.bin_edges(), vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn spec_defaults_enable_flows() {
        let spec: AxisSpec =
            serde_json::from_str(r#"{"type": "uniform", "bins": 4, "low": 0.0, "high": 1.0}"#)
                .unwrap();
        let ax = Axis::try_from(spec).unwrap();
        assert!(ax.has_underflow() && ax.has_overflow());
        assert_eq!(ax.local_count(), 6);

        let ax: Axis = serde_json::from_str(
            r#"{"type": "edges", "edges": [0, 1, 3], "underflow": false}"#,
        )
        .unwrap();
        assert!(!ax.has_underflow());
        assert!(ax.has_overflow());
        assert_eq!(ax.local_count(), 3);
    }

    #[test]
    fn deserialize_validates() {
        let r: std::result::Result<Axis, _> =
            serde_json::from_str(r#"{"type": "uniform", "bins": 4, "low": 1.0, "high": 0.0}"#);
        assert!(r.is_err());
    }
}
