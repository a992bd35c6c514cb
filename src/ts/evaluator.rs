//! Cached spline evaluation.

use std::{fmt, marker::PhantomData, sync::Arc};

use super::{
    knot::Knot,
    segment::{Segment, SegmentError},
    spline::Spline,
    types::{from_f64, CurveType, Side, SplineValue, Time},
};

/// Precomputed coefficients for the segment between two adjacent knots.
pub struct EvalCache<T> {
    segment: Segment,
    _value: PhantomData<fn() -> T>,
}

impl<T: SplineValue> EvalCache<T> {
    pub fn new(left: &Knot<T>, right: &Knot<T>, curve_type: CurveType) -> Result<Self, SegmentError> {
        Ok(Self {
            segment: Segment::new(left, right, curve_type)?,
            _value: PhantomData,
        })
    }

    /// Start and end time of the segment.
    pub fn time_range(&self) -> (Time, Time) {
        (self.segment.start(), self.segment.end())
    }

    /// Value at `time`, clamped to the segment. `None` for value blocks.
    pub fn eval(&self, time: Time) -> Option<T> {
        self.segment.eval(time).map(from_f64)
    }
}

impl<T> fmt::Debug for EvalCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalCache").field("segment", &self.segment).finish()
    }
}

/// A segment that couldn't be cached. Queries in it fall back to direct
/// evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentWarning {
    /// Index of the segment's first knot.
    pub index: usize,
    pub error: SegmentError,
}

impl fmt::Display for SegmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment {}: {}", self.index, self.error)
    }
}

/// Evaluates a spline snapshot, caching the coefficients of every segment.
///
/// Caches are only built when the spline has curve segments, since held and
/// linear segments are as cheap to evaluate directly. Only right-side queries
/// inside the knot range use the cache; everything else (left-side queries,
/// extrapolation, segments that failed to build) is evaluated directly on the
/// snapshot. Empty or blocked results come back as zero.
///
/// The evaluator is immutable after construction and can be shared between
/// threads.
pub struct Evaluator<T> {
    spline: Arc<Spline<T>>,
    /// One slot per knot gap; a slot is empty when its segment failed.
    segments: Vec<Option<EvalCache<T>>>,
    warnings: Vec<SegmentWarning>,
}

impl<T: SplineValue> Default for Evaluator<T> {
    fn default() -> Self {
        Self {
            spline: Arc::new(Spline::default()),
            segments: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<T: SplineValue> Evaluator<T> {
    /// Snapshots `spline`. Later edits to it don't affect the evaluator.
    pub fn new(spline: &Spline<T>) -> Self {
        Self::from_shared(Arc::new(spline.clone()))
    }

    #[tracing::instrument(skip_all, fields(knots = spline.len()))]
    pub fn from_shared(spline: Arc<Spline<T>>) -> Self {
        let mut segments = Vec::new();
        let mut warnings = Vec::new();

        if spline.len() > 1 && spline.has_curve_segments() {
            segments.reserve(spline.len() - 1);

            for (index, pair) in spline.knots().windows(2).enumerate() {
                let [left, right] = pair else {
                    continue;
                };

                match EvalCache::new(left, right, spline.curve_type()) {
                    Ok(cache) => segments.push(Some(cache)),
                    Err(error) => {
                        tracing::warn!(index, %error, "Unable to cache spline segment");

                        segments.push(None);
                        warnings.push(SegmentWarning { index, error });
                    }
                }
            }
        }

        Self {
            spline,
            segments,
            warnings,
        }
    }

    /// Evaluates at `time`. Returns zero where the spline has no value.
    pub fn eval(&self, time: Time, side: Side) -> T {
        if let Some(value) = self.eval_cached(time, side) {
            return value;
        }

        self.spline.eval(time, side).unwrap_or_else(T::zero)
    }

    /// `None` when the query can't be served from the cache.
    fn eval_cached(&self, time: Time, side: Side) -> Option<T> {
        if side != Side::Right || self.segments.is_empty() {
            return None;
        }

        let (first, last) = self.spline.time_range()?;
        if !(first <= time && time <= last) {
            return None;
        }

        // Segment i covers [t_i, t_i+1). At the last knot there is no slot,
        // which sends the query to direct evaluation.
        let index = self
            .spline
            .knots()
            .partition_point(|knot| knot.time() <= time)
            .checked_sub(1)?;

        let cache = self.segments.get(index)?.as_ref()?;

        // A blocked segment is zero, same as direct evaluation.
        Some(cache.eval(time).unwrap_or_else(T::zero))
    }

    /// Segments that failed to build.
    pub fn warnings(&self) -> &[SegmentWarning] {
        &self.warnings
    }

    /// Number of segments served from the cache.
    pub fn cached_segments(&self) -> usize {
        self.segments.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn spline(&self) -> &Arc<Spline<T>> {
        &self.spline
    }
}

impl<T: SplineValue> fmt::Debug for Evaluator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("knots", &self.spline.knots().len())
            .field("segments", &self.segments.len())
            .field("warnings", &self.warnings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use half::f16;

    use super::*;
    use crate::ts::{ExtrapMode, InterpMode};

    fn curve_spline() -> Result<Spline<f64>> {
        let mut spline = Spline::new();

        spline.set_knot(
            Knot::new(0.0, 0.0)
                .with_interp(InterpMode::Curve)
                .with_post_tangent(0.5, 2.0),
        )?;
        spline.set_knot(
            Knot::new(2.0, 1.0)
                .with_interp(InterpMode::Curve)
                .with_pre_tangent(0.5, -1.0)
                .with_post_tangent(0.5, 0.0),
        )?;
        spline.set_knot(Knot::new(3.0, 4.0).with_pre_value(3.0).with_pre_tangent(0.25, 1.0))?;

        Ok(spline)
    }

    #[test]
    fn empty_spline_is_zero() {
        let evaluator = Evaluator::<f64>::default();

        assert_eq!(evaluator.eval(1.0, Side::Right), 0.0);
        assert_eq!(evaluator.eval(1.0, Side::Left), 0.0);
        assert_eq!(evaluator.cached_segments(), 0);
        assert!(evaluator.warnings().is_empty());
    }

    #[test]
    fn cached_matches_direct() -> Result<()> {
        let spline = curve_spline()?;
        let evaluator = Evaluator::new(&spline);

        assert_eq!(evaluator.cached_segments(), 2);

        for i in -10..=40 {
            let time = i as f64 / 10.0;

            for side in [Side::Left, Side::Right] {
                let expected = spline.eval(time, side).unwrap_or(0.0);
                assert_eq!(evaluator.eval(time, side), expected, "{time} {side}");
            }
        }

        Ok(())
    }

    #[test]
    fn midpoint_of_two_curve_knots() -> Result<()> {
        let mut spline = Spline::new();
        spline.set_knot(Knot::new(0.0, 0.0).with_interp(InterpMode::Curve))?;
        spline.set_knot(Knot::new(1.0, 1.0))?;

        let evaluator = Evaluator::new(&spline);

        assert_eq!(evaluator.cached_segments(), 1);
        assert_eq!(Some(evaluator.eval(0.5, Side::Right)), spline.eval(0.5, Side::Right));

        Ok(())
    }

    #[test]
    fn knot_boundaries() -> Result<()> {
        let spline = curve_spline()?;
        let evaluator = Evaluator::new(&spline);

        assert_eq!(evaluator.eval(0.0, Side::Right), 0.0);
        assert_eq!(evaluator.eval(2.0, Side::Right), 1.0);

        // Dual-valued last knot: left is the arriving value, right the knot.
        assert_eq!(evaluator.eval(3.0, Side::Left), 3.0);
        assert_eq!(evaluator.eval(3.0, Side::Right), 4.0);

        Ok(())
    }

    #[test]
    fn no_cache_without_curves() -> Result<()> {
        let mut spline = Spline::new();
        spline.set_knot(Knot::new(0.0, 0.0_f64).with_interp(InterpMode::Linear))?;
        spline.set_knot(Knot::new(1.0, 2.0))?;

        let evaluator = Evaluator::new(&spline);

        assert_eq!(evaluator.cached_segments(), 0);
        assert_eq!(evaluator.eval(0.5, Side::Right), 1.0);

        Ok(())
    }

    #[test]
    fn failed_segment_is_skipped() -> Result<()> {
        let mut spline = curve_spline()?;
        spline.set_knot(Knot::new(2.0, f64::NAN).with_interp(InterpMode::Curve))?;

        let evaluator = Evaluator::new(&spline);

        // The NaN knot ends segment 0 and starts segment 1.
        assert_eq!(evaluator.warnings().len(), 2);
        assert_eq!(evaluator.warnings()[0].index, 0);
        assert_eq!(evaluator.warnings()[1].error, SegmentError::NonFinite { time: 2.0 });
        assert_eq!(evaluator.cached_segments(), 0);

        // Falls back to direct evaluation, which has no value there either.
        assert_eq!(evaluator.eval(1.0, Side::Right), 0.0);
        assert_eq!(evaluator.eval(-1.0, Side::Right), 0.0);

        Ok(())
    }

    #[test]
    fn snapshot_is_isolated() -> Result<()> {
        let mut spline = curve_spline()?;
        let evaluator = Evaluator::new(&spline);
        let before = evaluator.eval(1.0, Side::Right);

        spline.set_knot(Knot::new(1.0, 100.0))?;

        assert_eq!(evaluator.eval(1.0, Side::Right), before);
        assert_eq!(evaluator.spline().len(), 3);

        Ok(())
    }

    #[test]
    fn extrapolation_is_direct() -> Result<()> {
        let mut spline = curve_spline()?;
        spline.set_post_extrapolation(ExtrapMode::LoopReset);

        let evaluator = Evaluator::new(&spline);

        assert_eq!(evaluator.eval(4.0, Side::Right), spline.eval(4.0, Side::Right).unwrap_or(0.0));
        assert_eq!(evaluator.eval(5.0, Side::Right), evaluator.eval(2.0, Side::Right));

        Ok(())
    }

    #[test]
    fn debug_summary() -> Result<()> {
        let evaluator = Evaluator::new(&curve_spline()?);

        assert_eq!(
            format!("{:?}", evaluator),
            "Evaluator { knots: 3, segments: 2, warnings: [] }"
        );

        Ok(())
    }

    #[test]
    fn half_precision() -> Result<()> {
        let mut spline = Spline::with_curve_type(CurveType::Hermite);
        spline.set_knot(
            Knot::new(0.0, f16::from_f32(0.0))
                .with_interp(InterpMode::Curve)
                .with_post_tangent(0.0, f16::from_f32(1.0)),
        )?;
        spline.set_knot(Knot::new(1.0, f16::from_f32(1.0)).with_pre_tangent(0.0, f16::from_f32(1.0)))?;

        let evaluator = Evaluator::new(&spline);

        assert_eq!(evaluator.eval(0.5, Side::Right), f16::from_f32(0.5));
        assert_eq!(Some(evaluator.eval(0.25, Side::Right)), spline.eval(0.25, Side::Right));

        Ok(())
    }
}
