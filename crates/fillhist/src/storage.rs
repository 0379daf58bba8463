//! Flat bin storage over one of three value kinds.
//!
//! Storage knows nothing about axes; it is addressed by flat offset only.
//! Accumulation is split in two steps: [`BinStorage::prepare`] validates and converts
//! a weight once (so a bad weight is reported even for points that end up dropped),
//! [`BinStorage::apply`] performs the single-slot read-modify-write.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{HistError, Result};

/// Dynamic value held by generic bins.
pub type GenericValue = serde_json::Value;

/// Caller-supplied combine function: `(old_value, weight) -> new_value`.
///
/// The old value is only replaced when the function returns `Ok`.
pub type Combine<'a> = &'a dyn Fn(&GenericValue, &GenericValue) -> Result<GenericValue>;

/// Kind of value accumulated in every bin of a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinKind {
    /// `f64` sums, default `0.0`.
    Float,
    /// `i64` counters, default `0`.
    Integer,
    /// Dynamic values combined by a caller-supplied function or additively.
    Generic,
}

/// Weight of one fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weight<'a> {
    /// Plain number.
    Number(f64),
    /// Dynamic value (the only weight form that makes sense for non-numeric generic bins).
    Value(&'a GenericValue),
}

impl From<f64> for Weight<'_> {
    fn from(w: f64) -> Self {
        Weight::Number(w)
    }
}

impl<'a> From<&'a GenericValue> for Weight<'a> {
    fn from(v: &'a GenericValue) -> Self {
        Weight::Value(v)
    }
}

/// Borrowed view of one bin's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinValue<'a> {
    /// Float bin.
    Float(f64),
    /// Integer bin.
    Integer(i64),
    /// Generic bin.
    Generic(&'a GenericValue),
}

impl BinValue<'_> {
    /// Numeric view (`Integer` is widened, numeric generic values are converted).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BinValue::Float(v) => Some(*v),
            BinValue::Integer(v) => Some(*v as f64),
            BinValue::Generic(v) => v.as_f64(),
        }
    }

    /// Integer view (`Integer` bins and integral generic values only).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BinValue::Integer(v) => Some(*v),
            BinValue::Generic(v) => v.as_i64(),
            BinValue::Float(_) => None,
        }
    }

    /// Generic view.
    pub fn as_generic(&self) -> Option<&GenericValue> {
        match self {
            BinValue::Generic(v) => Some(v),
            _ => None,
        }
    }
}

/// Generic slots plus the kind-defined defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericBins {
    /// Slot values.
    pub values: Vec<GenericValue>,
    /// Value every slot starts with (`null` is the empty sentinel).
    pub initial: GenericValue,
    /// Weight used when a fill supplies none.
    pub unit: Option<GenericValue>,
}

/// Flat sequence of bin values, uniform in kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinStorage {
    /// Floating-point sums.
    Float(Vec<f64>),
    /// 64-bit signed counters.
    Integer(Vec<i64>),
    /// Dynamic values.
    Generic(GenericBins),
}

/// A weight validated against a storage kind, ready to be applied to any slot.
#[derive(Clone)]
pub enum Increment<'a> {
    /// Add to a float slot.
    Float(f64),
    /// Add to an integer slot.
    Integer(i64),
    /// Combine into a generic slot.
    Generic {
        /// Resolved weight (explicit or the declared unit).
        weight: Cow<'a, GenericValue>,
        /// Combine function; additive combine when absent.
        combine: Option<Combine<'a>>,
    },
}

impl std::fmt::Debug for Increment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Increment::Float(w) => f.debug_tuple("Float").field(w).finish(),
            Increment::Integer(w) => f.debug_tuple("Integer").field(w).finish(),
            Increment::Generic { weight, combine } => f
                .debug_struct("Generic")
                .field("weight", weight)
                .field("combine", &combine.is_some())
                .finish(),
        }
    }
}

impl BinStorage {
    /// `n` float bins set to `0.0`.
    pub fn float(n: usize) -> Self {
        BinStorage::Float(vec![0.0; n])
    }

    /// `n` integer bins set to `0`.
    pub fn integer(n: usize) -> Self {
        BinStorage::Integer(vec![0; n])
    }

    /// `n` generic bins set to `initial`; `unit` is the weight of an unweighted fill.
    pub fn generic(n: usize, initial: GenericValue, unit: Option<GenericValue>) -> Self {
        BinStorage::Generic(GenericBins { values: vec![initial.clone(); n], initial, unit })
    }

    /// `n` bins of the given kind, failing with [`HistError::TooManyBins`] instead of
    /// aborting when the allocation cannot be made.
    ///
    /// `initial` and `unit` are only used by generic storage.
    pub fn try_with_kind(
        kind: BinKind,
        n: usize,
        initial: GenericValue,
        unit: Option<GenericValue>,
    ) -> Result<Self> {
        Ok(match kind {
            BinKind::Float => BinStorage::Float(try_filled(n, 0.0)?),
            BinKind::Integer => BinStorage::Integer(try_filled(n, 0)?),
            BinKind::Generic => {
                let values = try_filled(n, initial.clone())?;
                BinStorage::Generic(GenericBins { values, initial, unit })
            }
        })
    }

    /// Value kind.
    pub fn kind(&self) -> BinKind {
        match self {
            BinStorage::Float(_) => BinKind::Float,
            BinStorage::Integer(_) => BinKind::Integer,
            BinStorage::Generic(_) => BinKind::Generic,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        match self {
            BinStorage::Float(v) => v.len(),
            BinStorage::Integer(v) => v.len(),
            BinStorage::Generic(g) => g.values.len(),
        }
    }

    /// Whether the storage has no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one slot.
    pub fn read(&self, offset: usize) -> Option<BinValue<'_>> {
        match self {
            BinStorage::Float(v) => v.get(offset).copied().map(BinValue::Float),
            BinStorage::Integer(v) => v.get(offset).copied().map(BinValue::Integer),
            BinStorage::Generic(g) => g.values.get(offset).map(BinValue::Generic),
        }
    }

    /// Float slots, if this is float storage.
    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        match self {
            BinStorage::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Integer slots, if this is integer storage.
    pub fn as_i64_slice(&self) -> Option<&[i64]> {
        match self {
            BinStorage::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Generic slots, if this is generic storage.
    pub fn as_generic_slice(&self) -> Option<&[GenericValue]> {
        match self {
            BinStorage::Generic(g) => Some(&g.values),
            _ => None,
        }
    }

    /// Validate a weight (and combine function) against this storage kind.
    ///
    /// Nothing is mutated; the returned increment can be applied to any slot.
    pub fn prepare<'a>(
        &self,
        weight: Option<Weight<'a>>,
        combine: Option<Combine<'a>>,
    ) -> Result<Increment<'a>> {
        match self {
            BinStorage::Float(_) | BinStorage::Integer(_) if combine.is_some() => {
                Err(HistError::CombineNotAllowed(self.kind()))
            }
            BinStorage::Float(_) => match weight {
                None => Ok(Increment::Float(1.0)),
                Some(Weight::Number(w)) => Ok(Increment::Float(w)),
                Some(Weight::Value(v)) => v.as_f64().map(Increment::Float).ok_or_else(|| {
                    HistError::BadWeight(format!("expected a number, got {}", type_name(v)))
                }),
            },
            BinStorage::Integer(_) => match weight {
                None => Ok(Increment::Integer(1)),
                Some(Weight::Number(w)) => round_to_i64(w).map(Increment::Integer),
                Some(Weight::Value(v)) => match (v.as_i64(), v.as_f64()) {
                    (Some(i), _) => Ok(Increment::Integer(i)),
                    (None, Some(w)) => round_to_i64(w).map(Increment::Integer),
                    _ => Err(HistError::BadWeight(format!(
                        "expected a number, got {}",
                        type_name(v)
                    ))),
                },
            },
            BinStorage::Generic(g) => {
                let weight = match weight {
                    Some(Weight::Value(v)) => Cow::Borrowed(v),
                    Some(Weight::Number(w)) => Cow::Owned(
                        serde_json::Number::from_f64(w).map(GenericValue::Number).ok_or_else(
                            || HistError::BadWeight(format!("non-finite weight {w}")),
                        )?,
                    ),
                    None => Cow::Owned(g.unit.clone().ok_or(HistError::MissingWeight)?),
                };
                Ok(Increment::Generic { weight, combine })
            }
        }
    }

    /// Apply a prepared increment to one slot.
    ///
    /// On error the slot keeps its previous value.
    pub fn apply(&mut self, offset: usize, inc: &Increment<'_>) -> Result<()> {
        let len = self.len();
        let out_of_range = || HistError::OffsetOutOfRange { offset, len };
        match (self, inc) {
            (BinStorage::Float(v), Increment::Float(w)) => {
                *v.get_mut(offset).ok_or_else(out_of_range)? += *w;
                Ok(())
            }
            (BinStorage::Integer(v), Increment::Integer(w)) => {
                let slot = v.get_mut(offset).ok_or_else(out_of_range)?;
                *slot = slot.checked_add(*w).ok_or_else(|| {
                    HistError::BadWeight(format!("adding {w} to bin {offset} overflows i64"))
                })?;
                Ok(())
            }
            (BinStorage::Generic(g), Increment::Generic { weight, combine }) => {
                let slot = g.values.get_mut(offset).ok_or_else(out_of_range)?;
                *slot = match combine {
                    Some(f) => f(slot, weight)?,
                    None => add_values(slot, weight)?,
                };
                Ok(())
            }
            (storage, inc) => Err(HistError::ShapeMismatch(format!(
                "increment {inc:?} does not match {:?} storage",
                storage.kind()
            ))),
        }
    }

    /// Validate and apply in one step.
    pub fn accumulate(
        &mut self,
        offset: usize,
        weight: Option<Weight<'_>>,
        combine: Option<Combine<'_>>,
    ) -> Result<()> {
        let inc = self.prepare(weight, combine)?;
        self.apply(offset, &inc)
    }

    /// Element-wise merge of a storage of identical kind and length.
    ///
    /// Generic slots use `combine(into, from)` when given, additive combine otherwise;
    /// `null` slots act as identities. Either every slot is merged or none is.
    pub fn merge_from(&mut self, other: &BinStorage, combine: Option<Combine<'_>>) -> Result<()> {
        if self.kind() != other.kind() || self.len() != other.len() {
            return Err(HistError::ShapeMismatch(format!(
                "cannot merge {:?}[{}] into {:?}[{}]",
                other.kind(),
                other.len(),
                self.kind(),
                self.len()
            )));
        }
        match (self, other) {
            (BinStorage::Float(a), BinStorage::Float(b)) => {
                if combine.is_some() {
                    return Err(HistError::CombineNotAllowed(BinKind::Float));
                }
                a.iter_mut().zip(b).for_each(|(x, y)| *x += *y);
                Ok(())
            }
            (BinStorage::Integer(a), BinStorage::Integer(b)) => {
                if combine.is_some() {
                    return Err(HistError::CombineNotAllowed(BinKind::Integer));
                }
                let merged = a
                    .iter()
                    .zip(b)
                    .enumerate()
                    .map(|(i, (x, y))| {
                        x.checked_add(*y).ok_or_else(|| {
                            HistError::BadWeight(format!("merging bin {i} overflows i64"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                *a = merged;
                Ok(())
            }
            (BinStorage::Generic(a), BinStorage::Generic(b)) => {
                let merged = a
                    .values
                    .iter()
                    .zip(&b.values)
                    .map(|(x, y)| match (x, y, combine) {
                        (_, GenericValue::Null, _) => Ok(x.clone()),
                        (GenericValue::Null, _, _) => Ok(y.clone()),
                        (_, _, Some(f)) => f(x, y),
                        (_, _, None) => add_values(x, y),
                    })
                    .collect::<Result<Vec<_>>>()?;
                a.values = merged;
                Ok(())
            }
            _ => unreachable!("kinds checked above"),
        }
    }

    /// Same kind and length, every slot set to the merge identity.
    ///
    /// Float/integer slots are zero; generic slots are `null`.
    pub fn identity_like(&self) -> Self {
        match self {
            BinStorage::Float(v) => BinStorage::float(v.len()),
            BinStorage::Integer(v) => BinStorage::integer(v.len()),
            BinStorage::Generic(g) => BinStorage::Generic(GenericBins {
                values: vec![GenericValue::Null; g.values.len()],
                initial: GenericValue::Null,
                unit: g.unit.clone(),
            }),
        }
    }

    /// Restore every slot to the kind default.
    pub fn reset(&mut self) {
        match self {
            BinStorage::Float(v) => v.fill(0.0),
            BinStorage::Integer(v) => v.fill(0),
            BinStorage::Generic(g) => {
                let initial = g.initial.clone();
                g.values.fill(initial);
            }
        }
    }
}

fn try_filled<T: Clone>(n: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|_| HistError::TooManyBins)?;
    v.resize(n, value);
    Ok(v)
}

fn round_to_i64(w: f64) -> Result<i64> {
    let r = w.round();
    // i64::MAX as f64 is 2^63, itself out of range
    if r.is_finite() && r >= i64::MIN as f64 && r < i64::MAX as f64 {
        Ok(r as i64)
    } else {
        Err(HistError::BadWeight(format!("{w} does not fit an i64 bin")))
    }
}

fn type_name(v: &GenericValue) -> &'static str {
    match v {
        GenericValue::Null => "null",
        GenericValue::Bool(_) => "bool",
        GenericValue::Number(_) => "number",
        GenericValue::String(_) => "string",
        GenericValue::Array(_) => "array",
        GenericValue::Object(_) => "object",
    }
}

/// Additive combine of two dynamic values.
///
/// `null` is the identity; numbers add (integers stay integral unless they overflow),
/// strings concatenate, arrays extend. Everything else is not additive.
pub fn add_values(old: &GenericValue, weight: &GenericValue) -> Result<GenericValue> {
    use serde_json::Value::{Array, Null, Number, String};
    match (old, weight) {
        (Null, w) => Ok(w.clone()),
        (Number(a), Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64())
                && let Some(s) = x.checked_add(y)
            {
                return Ok(GenericValue::from(s));
            }
            let sum = a.as_f64().unwrap_or(f64::NAN) + b.as_f64().unwrap_or(f64::NAN);
            serde_json::Number::from_f64(sum)
                .map(Number)
                .ok_or_else(|| HistError::NotAdditive(format!("{a} + {b} is not finite")))
        }
        (String(a), String(b)) => Ok(String(format!("{a}{b}"))),
        (Array(a), Array(b)) => Ok(Array(a.iter().chain(b).cloned().collect())),
        (o, w) => Err(HistError::NotAdditive(format!(
            "cannot add {} to {}",
            type_name(w),
            type_name(o)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn float_defaults_and_weights() {
        let mut s = BinStorage::float(3);
        assert_eq!(s.read(1), Some(BinValue::Float(0.0)));
        s.accumulate(1, None, None).unwrap();
        s.accumulate(1, Some(Weight::Number(0.25)), None).unwrap();
        s.accumulate(1, Some(Weight::Value(&json!(2))), None).unwrap();
        assert_eq!(s.as_f64_slice().unwrap(), &[0.0, 3.25, 0.0]);
    }

    #[test]
    fn float_rejects_non_numeric_weight() {
        let mut s = BinStorage::float(1);
        let err = s.accumulate(0, Some(Weight::Value(&json!("x"))), None).unwrap_err();
        assert!(matches!(err, HistError::BadWeight(_)));
        assert_eq!(s.read(0), Some(BinValue::Float(0.0)));
    }

    #[test]
    fn integer_rounds_weights() {
        let mut s = BinStorage::integer(1);
        s.accumulate(0, Some(Weight::Number(2.6)), None).unwrap();
        s.accumulate(0, Some(Weight::Number(-0.4)), None).unwrap();
        s.accumulate(0, None, None).unwrap();
        s.accumulate(0, Some(Weight::Value(&json!(10))), None).unwrap();
        assert_eq!(s.read(0), Some(BinValue::Integer(14)));
        assert!(matches!(
            s.accumulate(0, Some(Weight::Number(f64::NAN)), None),
            Err(HistError::BadWeight(_))
        ));
        assert!(matches!(
            s.accumulate(0, Some(Weight::Number(1e300)), None),
            Err(HistError::BadWeight(_))
        ));
        assert_eq!(s.read(0), Some(BinValue::Integer(14)));
    }

    #[test]
    fn integer_overflow_leaves_slot_untouched() {
        let mut s = BinStorage::Integer(vec![i64::MAX - 1]);
        assert!(s.accumulate(0, Some(Weight::Value(&json!(5))), None).is_err());
        assert_eq!(s.read(0), Some(BinValue::Integer(i64::MAX - 1)));
    }

    #[test]
    fn combine_rejected_for_numeric_kinds() {
        let f = |a: &GenericValue, _: &GenericValue| -> Result<GenericValue> { Ok(a.clone()) };
        let s = BinStorage::float(1);
        assert_eq!(
            s.prepare(None, Some(&f)).unwrap_err(),
            HistError::CombineNotAllowed(BinKind::Float)
        );
        let s = BinStorage::integer(1);
        assert_eq!(
            s.prepare(None, Some(&f)).unwrap_err(),
            HistError::CombineNotAllowed(BinKind::Integer)
        );
    }

    #[test]
    fn generic_combine_function() {
        let mut s = BinStorage::generic(2, json!([]), None);
        let push = |old: &GenericValue, w: &GenericValue| -> Result<GenericValue> {
            let mut items = old.as_array().cloned().unwrap_or_default();
            items.push(w.clone());
            Ok(GenericValue::Array(items))
        };
        s.accumulate(0, Some(Weight::Value(&json!("a"))), Some(&push)).unwrap();
        s.accumulate(0, Some(Weight::Number(2.0)), Some(&push)).unwrap();
        assert_eq!(s.read(0), Some(BinValue::Generic(&json!(["a", 2.0]))));
        assert_eq!(s.read(1), Some(BinValue::Generic(&json!([]))));
    }

    #[test]
    fn generic_failing_combine_keeps_value() {
        let mut s = BinStorage::generic(1, json!(7), None);
        let fail = |_: &GenericValue, _: &GenericValue| -> Result<GenericValue> {
            Err(HistError::Combine("nope".into()))
        };
        let err = s.accumulate(0, Some(Weight::Number(1.0)), Some(&fail)).unwrap_err();
        assert_eq!(err, HistError::Combine("nope".into()));
        assert_eq!(s.read(0), Some(BinValue::Generic(&json!(7))));
    }

    #[test]
    fn generic_unit_weight() {
        let mut s = BinStorage::generic(1, json!(0), Some(json!(1)));
        s.accumulate(0, None, None).unwrap();
        s.accumulate(0, None, None).unwrap();
        assert_eq!(s.read(0).unwrap().as_i64(), Some(2));

        let mut s = BinStorage::generic(1, GenericValue::Null, None);
        assert_eq!(s.accumulate(0, None, None).unwrap_err(), HistError::MissingWeight);
    }

    #[test]
    fn generic_additive_fallback() {
        let mut s = BinStorage::generic(1, GenericValue::Null, None);
        s.accumulate(0, Some(Weight::Value(&json!("ab"))), None).unwrap();
        s.accumulate(0, Some(Weight::Value(&json!("cd"))), None).unwrap();
        assert_eq!(s.read(0), Some(BinValue::Generic(&json!("abcd"))));

        let err = s.accumulate(0, Some(Weight::Value(&json!({"k": 1}))), None).unwrap_err();
        assert!(matches!(err, HistError::NotAdditive(_)));
        assert_eq!(s.read(0), Some(BinValue::Generic(&json!("abcd"))));
    }

    #[test]
    fn add_values_numbers() {
        assert_eq!(add_values(&json!(2), &json!(3)).unwrap(), json!(5));
        assert_eq!(add_values(&json!(0.5), &json!(2)).unwrap(), json!(2.5));
        assert_eq!(add_values(&json!([1]), &json!([2, 3])).unwrap(), json!([1, 2, 3]));
        assert!(add_values(&json!(true), &json!(1)).is_err());
        assert!(add_values(&json!([1]), &json!(1)).is_err());
    }

    #[test]
    fn merge_float_and_shape_checks() {
        let mut a = BinStorage::Float(vec![1.0, 2.0]);
        let b = BinStorage::Float(vec![0.5, 0.5]);
        a.merge_from(&b, None).unwrap();
        assert_eq!(a.as_f64_slice().unwrap(), &[1.5, 2.5]);

        let c = BinStorage::float(3);
        assert!(matches!(a.merge_from(&c, None), Err(HistError::ShapeMismatch(_))));
        let d = BinStorage::integer(2);
        assert!(matches!(a.merge_from(&d, None), Err(HistError::ShapeMismatch(_))));
    }

    #[test]
    fn merge_generic_is_all_or_nothing() {
        let mut a = BinStorage::Generic(GenericBins {
            values: vec![json!(1), json!("x")],
            initial: GenericValue::Null,
            unit: None,
        });
        let b = BinStorage::Generic(GenericBins {
            values: vec![json!(2), json!(3)],
            initial: GenericValue::Null,
            unit: None,
        });
        assert!(matches!(a.merge_from(&b, None), Err(HistError::NotAdditive(_))));
        assert_eq!(a.as_generic_slice().unwrap(), &[json!(1), json!("x")]);

        let c = BinStorage::Generic(GenericBins {
            values: vec![json!(2), GenericValue::Null],
            initial: GenericValue::Null,
            unit: None,
        });
        a.merge_from(&c, None).unwrap();
        assert_eq!(a.as_generic_slice().unwrap(), &[json!(3), json!("x")]);
    }

    #[test]
    fn identity_and_reset() {
        let mut s = BinStorage::generic(2, json!(10), Some(json!(1)));
        s.accumulate(1, None, None).unwrap();
        let id = s.identity_like();
        assert_eq!(id.as_generic_slice().unwrap(), &[GenericValue::Null, GenericValue::Null]);
        s.reset();
        assert_eq!(s.as_generic_slice().unwrap(), &[json!(10), json!(10)]);
    }

    #[test]
    fn serde_layout() {
        let s = BinStorage::Integer(vec![1, 2]);
        assert_eq!(serde_json::to_value(&s).unwrap(), json!({"integer": [1, 2]}));
    }
}
