//! Spline enums and value traits.

use std::fmt;

use num_traits::{Float, NumCast};
use strum::{Display, EnumCount, FromRepr};

/// Spline time, in the same units as layer time codes.
pub type Time = f64;

/// How a segment is interpolated from its starting knot to the next one.
#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumCount, Display)]
pub enum InterpMode {
    /// No value in this segment.
    ValueBlock = 0,
    #[default]
    Held = 1,
    Linear = 2,
    /// Bezier or Hermite, depending on the spline's [`CurveType`].
    Curve = 3,
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumCount, Display)]
pub enum CurveType {
    /// Free tangent widths.
    #[default]
    Bezier = 0,
    /// Tangent widths fixed at one third of the segment.
    Hermite = 1,
}

/// What a spline does before its first knot and after its last.
#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumCount, Display)]
pub enum ExtrapMode {
    ValueBlock = 0,
    #[default]
    Held = 1,
    /// Continues the slope of the edge segment.
    Linear = 2,
    /// Continues with [`Extrapolation::slope`].
    Sloped = 3,
    /// Knot range repeated, offset so that the ends meet.
    LoopRepeat = 4,
    /// Knot range repeated exactly.
    LoopReset = 5,
    /// Knot range repeated, every other copy reversed.
    LoopOscillate = 6,
}

/// Which limit to take at a discontinuity.
#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumCount, Display)]
pub enum Side {
    Left = 0,
    #[default]
    Right = 1,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Extrapolation {
    pub mode: ExtrapMode,
    /// Only used by [`ExtrapMode::Sloped`].
    pub slope: f64,
}

impl Extrapolation {
    pub fn new(mode: ExtrapMode) -> Self {
        Self { mode, slope: 0.0 }
    }

    pub fn sloped(slope: f64) -> Self {
        Self {
            mode: ExtrapMode::Sloped,
            slope,
        }
    }

    pub fn is_looping(&self) -> bool {
        matches!(
            self.mode,
            ExtrapMode::LoopRepeat | ExtrapMode::LoopReset | ExtrapMode::LoopOscillate
        )
    }
}

impl From<ExtrapMode> for Extrapolation {
    fn from(mode: ExtrapMode) -> Self {
        Extrapolation::new(mode)
    }
}

/// Scalar types a spline can hold: `f64`, `f32` and [`half::f16`].
///
/// Evaluation runs in `f64` and converts back at the end, so every value type
/// sees the same curve.
pub trait SplineValue: Float + Default + fmt::Debug + Send + Sync + 'static {}

impl<T> SplineValue for T where T: Float + Default + fmt::Debug + Send + Sync + 'static {}

#[inline]
pub(crate) fn to_f64<T: SplineValue>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Converts back to the value type, saturating to infinity when the result is
/// out of range.
#[inline]
pub(crate) fn from_f64<T: SplineValue>(value: f64) -> T {
    <T as NumCast>::from(value).unwrap_or_else(|| {
        if value.is_sign_negative() {
            T::neg_infinity()
        } else {
            T::infinity()
        }
    })
}

#[cfg(test)]
mod tests {
    use half::f16;

    use super::*;

    #[test]
    fn fixed_discriminants() {
        assert_eq!(InterpMode::from_repr(3), Some(InterpMode::Curve));
        assert_eq!(CurveType::from_repr(1), Some(CurveType::Hermite));
        assert_eq!(ExtrapMode::from_repr(6), Some(ExtrapMode::LoopOscillate));
        assert_eq!(ExtrapMode::from_repr(7), None);
        assert_eq!(Side::default(), Side::Right);
        assert_eq!(ExtrapMode::LoopRepeat.to_string(), "LoopRepeat");
    }

    #[test]
    fn looping_modes() {
        assert!(Extrapolation::new(ExtrapMode::LoopReset).is_looping());
        assert!(!Extrapolation::sloped(2.0).is_looping());
        assert_eq!(Extrapolation::default().mode, ExtrapMode::Held);
    }

    #[test]
    fn value_conversions() {
        assert_eq!(from_f64::<f32>(0.5), 0.5_f32);
        assert_eq!(from_f64::<f16>(1e6), f16::INFINITY);
        assert_eq!(to_f64(f16::from_f32(0.25)), 0.25);
    }
}
