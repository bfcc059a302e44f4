//! Updater cadence.
//!
//! A [`Period`] is either a fixed step count or a [`VariablePeriod`]: a
//! function from the current step to the number of steps until the next
//! execution, used for non-uniform (typically logarithmic) schedules.
//!
//! Variable periods compare by identity, so a schedule record can tell
//! whether the backend still holds the exact function it was given.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

use crate::error::OpError;
use crate::param::ParamValue;

type PeriodFn = dyn Fn(u64) -> u64 + Send + Sync;

/// A shared step → interval function.
///
/// Cloning shares the function; equality is pointer identity of the
/// shared function, not behavioural equality.
#[derive(Clone)]
pub struct VariablePeriod(Arc<PeriodFn>);

impl VariablePeriod {
    /// Wrap a step → interval function.
    pub fn new(f: impl Fn(u64) -> u64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Steps until the next execution after `step`, never less than 1.
    pub fn interval(&self, step: u64) -> u64 {
        (self.0)(step).max(1)
    }

    /// Whether both values share the same function.
    pub fn same_fn(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for VariablePeriod {
    fn eq(&self, other: &Self) -> bool {
        self.same_fn(other)
    }
}

impl fmt::Debug for VariablePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariablePeriod({:p})", Arc::as_ptr(&self.0))
    }
}

/// How often an updater runs.
#[derive(Clone, Debug, PartialEq)]
pub enum Period {
    /// Every `n` steps.
    Fixed(NonZeroU64),
    /// According to a step-dependent function.
    Variable(VariablePeriod),
}

impl Period {
    /// Fixed cadence of `n` steps. Zero is an invalid argument.
    pub fn every(n: u64) -> Result<Self, OpError> {
        NonZeroU64::new(n)
            .map(Self::Fixed)
            .ok_or_else(|| OpError::invalid("period must be a positive step count, got 0"))
    }

    /// Variable cadence driven by `f(step)`.
    pub fn variable(f: impl Fn(u64) -> u64 + Send + Sync + 'static) -> Self {
        Self::Variable(VariablePeriod::new(f))
    }

    /// Logarithmic cadence: `per_decade` executions in each power-of-ten
    /// span of steps (at least one step apart).
    pub fn log_spaced(per_decade: u64) -> Result<Self, OpError> {
        if per_decade == 0 {
            return Err(OpError::invalid("log_spaced needs at least one execution per decade"));
        }
        Ok(Self::variable(move |step| {
            let mut decade = 1u64;
            while decade <= step / 10 {
                decade *= 10;
            }
            (decade.saturating_mul(9) / per_decade).max(1)
        }))
    }

    /// Steps until the next execution after `step`.
    pub fn interval(&self, step: u64) -> u64 {
        match self {
            Self::Fixed(n) => n.get(),
            Self::Variable(f) => f.interval(step),
        }
    }

    /// The fixed step count, if this is a fixed period.
    pub fn fixed(&self) -> Option<u64> {
        match self {
            Self::Fixed(n) => Some(n.get()),
            Self::Variable(_) => None,
        }
    }
}

impl From<NonZeroU64> for Period {
    fn from(n: NonZeroU64) -> Self {
        Self::Fixed(n)
    }
}

impl From<VariablePeriod> for Period {
    fn from(f: VariablePeriod) -> Self {
        Self::Variable(f)
    }
}

/// Dynamic period input (e.g. from a declarative spec). Only a positive
/// integer is a valid period; anything else is reported, not dropped.
impl TryFrom<ParamValue> for Period {
    type Error = OpError;

    fn try_from(value: ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::Int(n) if n > 0 => Period::every(n as u64),
            ParamValue::Int(n) => Err(OpError::invalid(format!(
                "period must be a positive step count, got {n}"
            ))),
            other => Err(OpError::invalid(format!(
                "period must be an integer step count or a function, got {} {other}",
                other.kind()
            ))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "every {n} steps"),
            Self::Variable(_) => f.write_str("variable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_period_rejected() {
        assert!(matches!(Period::every(0), Err(OpError::InvalidArgument { .. })));
        assert_eq!(Period::every(500).unwrap().fixed(), Some(500));
    }

    #[test]
    fn variable_periods_compare_by_identity() {
        let a = Period::variable(|n| n * 2);
        let b = Period::variable(|n| n * 2);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a, Period::every(2).unwrap());
    }

    #[test]
    fn variable_interval_clamped_to_one() {
        let p = Period::variable(|_| 0);
        assert_eq!(p.interval(17), 1);
    }

    #[test]
    fn param_values_convert() {
        assert_eq!(
            Period::try_from(ParamValue::Int(10)).unwrap(),
            Period::every(10).unwrap()
        );
        assert!(Period::try_from(ParamValue::Int(-3)).is_err());
        let err = Period::try_from(ParamValue::Str("often".into())).unwrap_err();
        assert!(err.to_string().contains("str"), "{err}");
        assert!(Period::try_from(ParamValue::Float(10.0)).is_err());
    }

    #[test]
    fn log_spaced_grows_with_decade() {
        let p = Period::log_spaced(9).unwrap();
        assert_eq!(p.interval(0), 1);
        assert_eq!(p.interval(9), 1);
        assert_eq!(p.interval(10), 10);
        assert_eq!(p.interval(150), 100);
        assert!(Period::log_spaced(0).is_err());
    }

    #[test]
    fn log_spaced_saturates_in_the_last_decade() {
        let p = Period::log_spaced(1).unwrap();
        assert_eq!(p.interval(u64::MAX), u64::MAX);
        assert_eq!(Period::log_spaced(9).unwrap().interval(u64::MAX), u64::MAX / 9);
    }

    proptest! {
        #[test]
        fn log_spaced_interval_is_positive(step in any::<u64>(), per in 1u64..1000) {
            let p = Period::log_spaced(per).unwrap();
            prop_assert!(p.interval(step) >= 1);
        }
    }
}
