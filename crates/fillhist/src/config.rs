//! Serializable histogram descriptions.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::axis::{Axis, AxisSpec};
use crate::error::Result;
use crate::histogram::Histogram;
use crate::storage::{BinKind, GenericValue};

/// Defaults for [`BinKind::Generic`] bins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericConfig {
    /// Initial value of every slot (`null` means empty).
    #[serde(default)]
    pub initial: GenericValue,
    /// Weight of a fill that supplies none.
    #[serde(default)]
    pub unit: Option<GenericValue>,
}

/// Full description of a histogram: axes and bin-value kind.
///
/// ```
/// use fillhist::HistogramConfig;
///
/// let cfg = HistogramConfig::from_json_str(
///     r#"{
///         "axes": [{"type": "uniform", "bins": 10, "low": 0.0, "high": 1.0}],
///         "kind": "integer"
///     }"#,
/// )
/// .unwrap();
/// let h = cfg.build().unwrap();
/// assert_eq!(h.nbins(), 12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    /// Axes in coordinate order.
    pub axes: Vec<AxisSpec>,
    /// Bin-value kind.
    #[serde(default = "default_kind")]
    pub kind: BinKind,
    /// Generic-kind defaults; must be absent for numeric kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic: Option<GenericConfig>,
}

fn default_kind() -> BinKind {
    BinKind::Float
}

impl HistogramConfig {
    /// Config with float bins.
    pub fn new(axes: Vec<AxisSpec>) -> Self {
        Self { axes, kind: BinKind::Float, generic: None }
    }

    /// Parse a JSON config.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate and build an empty histogram.
    pub fn build(&self) -> Result<Histogram> {
        let axes = self.axes.iter().cloned().map(Axis::try_from).collect::<Result<Vec<_>>>()?;
        Histogram::new(axes, self.kind, self.generic.clone())
    }
}
