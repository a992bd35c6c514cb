//! Animation splines.
//!
//! A [`Spline`] is an ordered set of [`Knot`]s with per-segment interpolation
//! and extrapolation beyond its ends. [`Spline::eval`] evaluates it directly,
//! while an [`Evaluator`] snapshots it and caches per-segment coefficients
//! for repeated queries.

mod evaluator;
mod knot;
mod segment;
mod spline;
mod types;

pub use evaluator::{EvalCache, Evaluator, SegmentWarning};
pub use knot::{Knot, Tangent};
pub use segment::SegmentError;
pub use spline::Spline;
pub use types::{CurveType, ExtrapMode, Extrapolation, InterpMode, Side, SplineValue, Time};
