//! # fillhist
//!
//! Multi-dimensional histograms that can be filled in a loop.
//!
//! A [`Histogram`] owns an ordered list of [`Axis`] values and one flat
//! [`BinStorage`]. Filling a point resolves one local index per axis, folds them into
//! a flat offset (axis 0 fastest) and accumulates into that slot. Bins hold `f64`
//! sums, `i64` counts, or dynamic values combined by a caller-supplied function.
//!
//! ## Example
//!
//! ```
//! use fillhist::{Axis, BinKind, FillStatus, Histogram};
//!
//! let x = Axis::uniform(2, 0.0, 10.0)?; // underflow, [0,5), [5,10), overflow
//! let y = Axis::edges(vec![0.0, 1.0, 3.0])?.with_underflow(false).with_overflow(false);
//! let mut h = Histogram::new(vec![x, y], BinKind::Float, None)?;
//!
//! assert_eq!(h.fill_weighted(&[7.0, 2.0], 0.5)?, FillStatus::Filled);
//! assert_eq!(h.fill_point(&[7.0, 9.0])?, FillStatus::Dropped);
//! assert_eq!(h.bin_value(&[2, 1])?.as_f64(), Some(0.5));
//! # Ok::<(), fillhist::HistError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod config;
pub mod error;
pub mod histogram;
pub mod index;
pub mod parallel;
pub mod storage;

pub use axis::{Axis, AxisSpec};
pub use config::{GenericConfig, HistogramConfig};
pub use error::{HistError, Result};
pub use histogram::{FillStats, FillStatus, Histogram, HistogramSnapshot};
pub use index::FlatIndexer;
pub use parallel::DEFAULT_CHUNK_SIZE;
pub use storage::{
    BinKind, BinStorage, BinValue, Combine, GenericBins, GenericValue, Increment, Weight,
    add_values,
};
