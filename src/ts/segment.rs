//! Interpolation between two adjacent knots.

use super::{
    knot::Knot,
    types::{to_f64, CurveType, InterpMode, SplineValue, Time},
};

/// Reason a segment couldn't be built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SegmentError {
    #[error("segment [{start}, {end}] has no duration")]
    EmptyInterval { start: Time, end: Time },
    #[error("knot at time {time} has a non-finite value or tangent")]
    NonFinite { time: Time },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Blocked,
    Held(f64),
    Linear {
        from: f64,
        to: f64,
    },
    /// Cubic Bezier in both time and value.
    Curve {
        times: [f64; 4],
        values: [f64; 4],
        slopes: [f64; 2],
    },
}

/// Evaluation-ready form of one knot interval.
///
/// Direct spline evaluation and the evaluator cache both go through this type,
/// so both produce bit-identical results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Segment {
    start: Time,
    end: Time,
    shape: Shape,
}

const MAX_ITERATIONS: usize = 64;

/// Relative to the segment duration.
const TIME_TOLERANCE: f64 = 1e-12;

fn finite<T: SplineValue>(value: T, time: Time) -> Result<f64, SegmentError> {
    let value = to_f64(value);

    if value.is_finite() {
        Ok(value)
    } else {
        Err(SegmentError::NonFinite { time })
    }
}

impl Segment {
    pub fn new<T: SplineValue>(left: &Knot<T>, right: &Knot<T>, curve_type: CurveType) -> Result<Self, SegmentError> {
        let (start, end) = (left.time(), right.time());

        let duration = end - start;
        if !(duration > 0.0 && duration.is_finite()) {
            return Err(SegmentError::EmptyInterval { start, end });
        }

        let from = finite(left.value(), start)?;

        let shape = match left.next_interp() {
            InterpMode::ValueBlock => Shape::Blocked,
            InterpMode::Held => Shape::Held(from),
            InterpMode::Linear => Shape::Linear {
                from,
                to: finite(right.pre_value(), end)?,
            },
            InterpMode::Curve => {
                let to = finite(right.pre_value(), end)?;

                let (post, pre) = (left.post_tangent(), right.pre_tangent());
                let out_slope = finite(post.slope, start)?;
                let in_slope = finite(pre.slope, end)?;

                let (mut out_width, mut in_width) = match curve_type {
                    CurveType::Bezier => (post.width.max(0.0), pre.width.max(0.0)),
                    CurveType::Hermite => (duration / 3.0, duration / 3.0),
                };

                if !(out_width.is_finite() && in_width.is_finite()) {
                    return Err(SegmentError::NonFinite { time: start });
                }

                // Tangents longer than the interval would make time run
                // backwards; shrink both, keeping their ratio.
                let total = out_width + in_width;
                if total > duration {
                    let scale = duration / total;
                    out_width *= scale;
                    in_width *= scale;
                }

                Shape::Curve {
                    times: [start, start + out_width, end - in_width, end],
                    values: [from, from + out_slope * out_width, to - in_slope * in_width, to],
                    slopes: [out_slope, in_slope],
                }
            }
        };

        Ok(Segment { start, end, shape })
    }

    #[inline]
    pub fn start(&self) -> Time {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Time {
        self.end
    }

    /// Value at `time`, clamped to the segment. At the end time this is the
    /// limit from the left. `None` for value blocks.
    pub fn eval(&self, time: Time) -> Option<f64> {
        match self.shape {
            Shape::Blocked => None,
            Shape::Held(value) => Some(value),
            Shape::Linear { from, to } => {
                let u = ((time - self.start) / (self.end - self.start)).clamp(0.0, 1.0);
                Some(from + (to - from) * u)
            }
            Shape::Curve { times, values, .. } => Some(bezier(&values, solve(&times, time))),
        }
    }

    /// Slope the segment leaves its first knot with.
    pub fn start_slope(&self) -> f64 {
        match self.shape {
            Shape::Blocked | Shape::Held(_) => 0.0,
            Shape::Linear { from, to } => (to - from) / (self.end - self.start),
            Shape::Curve { slopes, .. } => slopes[0],
        }
    }

    /// Slope the segment arrives at its second knot with.
    pub fn end_slope(&self) -> f64 {
        match self.shape {
            Shape::Blocked | Shape::Held(_) => 0.0,
            Shape::Linear { from, to } => (to - from) / (self.end - self.start),
            Shape::Curve { slopes, .. } => slopes[1],
        }
    }
}

fn bezier(p: &[f64; 4], u: f64) -> f64 {
    let v = 1.0 - u;
    p[0] * v * v * v + 3.0 * p[1] * u * v * v + 3.0 * p[2] * u * u * v + p[3] * u * u * u
}

fn bezier_derivative(p: &[f64; 4], u: f64) -> f64 {
    let v = 1.0 - u;
    3.0 * ((p[1] - p[0]) * v * v + 2.0 * (p[2] - p[1]) * u * v + (p[3] - p[2]) * u * u)
}

/// Finds the curve parameter whose time is `time`.
///
/// The time curve is non-decreasing, so Newton steps that leave the current
/// bracket fall back to bisection.
fn solve(times: &[f64; 4], time: Time) -> f64 {
    let (first, last) = (times[0], times[3]);

    if time <= first {
        return 0.0;
    }
    if time >= last {
        return 1.0;
    }

    let tolerance = TIME_TOLERANCE * (last - first);

    let (mut lo, mut hi) = (0.0, 1.0);
    let mut u = (time - first) / (last - first);

    for _ in 0..MAX_ITERATIONS {
        let error = bezier(times, u) - time;
        if error.abs() <= tolerance {
            break;
        }

        if error > 0.0 {
            hi = u;
        } else {
            lo = u;
        }

        let slope = bezier_derivative(times, u);
        let next = u - error / slope;

        u = if slope > 0.0 && next > lo && next < hi {
            next
        } else {
            0.5 * (lo + hi)
        };
    }

    u
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    fn curve(left: Knot<f64>, right: Knot<f64>, curve_type: CurveType) -> Result<Segment> {
        Ok(Segment::new(&left.with_interp(InterpMode::Curve), &right, curve_type)?)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn held_and_linear() -> Result<()> {
        let left = Knot::new(0.0, 1.0_f64);
        let right = Knot::new(2.0, 5.0).with_pre_value(3.0);

        let held = Segment::new(&left, &right, CurveType::Bezier)?;
        assert_eq!(held.eval(1.9), Some(1.0));
        assert_eq!(held.end_slope(), 0.0);

        // Linear runs toward the pre-value of a dual-valued knot.
        let linear = Segment::new(&left.with_interp(InterpMode::Linear), &right, CurveType::Bezier)?;
        assert_eq!(linear.eval(1.0), Some(2.0));
        assert_eq!(linear.eval(2.0), Some(3.0));
        assert_eq!(linear.start_slope(), 1.0);

        let blocked = Segment::new(&left.with_interp(InterpMode::ValueBlock), &right, CurveType::Bezier)?;
        assert_eq!(blocked.eval(1.0), None);

        Ok(())
    }

    #[test]
    fn hermite_with_matching_slopes_is_a_line() -> Result<()> {
        let segment = curve(
            Knot::new(0.0, 0.0).with_post_tangent(5.0, 1.0),
            Knot::new(1.0, 1.0).with_pre_tangent(5.0, 1.0),
            CurveType::Hermite,
        )?;

        for t in [0.0, 0.1, 0.25, 0.5, 0.8, 1.0] {
            assert_close(segment.eval(t).unwrap_or(f64::NAN), t);
        }

        Ok(())
    }

    #[test]
    fn bezier_ease() -> Result<()> {
        let segment = curve(
            Knot::new(0.0, 0.0).with_post_tangent(1.0 / 3.0, 0.0),
            Knot::new(1.0, 1.0).with_pre_tangent(1.0 / 3.0, 0.0),
            CurveType::Bezier,
        )?;

        // Time is linear in the curve parameter here, so value is 3u^2 - 2u^3.
        assert_close(segment.eval(0.5).unwrap_or(f64::NAN), 0.5);
        assert_close(segment.eval(0.25).unwrap_or(f64::NAN), 0.15625);

        Ok(())
    }

    #[test]
    fn overlong_tangents_stay_monotonic() -> Result<()> {
        let segment = curve(
            Knot::new(0.0, 0.0).with_post_tangent(2.0, 0.0),
            Knot::new(1.0, 1.0).with_pre_tangent(2.0, 0.0),
            CurveType::Bezier,
        )?;

        assert_close(segment.eval(0.5).unwrap_or(f64::NAN), 0.5);

        let samples = (0..=100)
            .map(|i| segment.eval(i as f64 / 100.0).unwrap_or(f64::NAN))
            .collect::<Vec<_>>();

        assert!(samples.windows(2).all(|w| w[0] <= w[1] + 1e-12));

        Ok(())
    }

    #[test]
    fn zero_width_tangents() -> Result<()> {
        let segment = curve(Knot::new(0.0, 0.0), Knot::new(4.0, 8.0), CurveType::Bezier)?;

        assert_close(segment.eval(0.0).unwrap_or(f64::NAN), 0.0);
        assert_close(segment.eval(2.0).unwrap_or(f64::NAN), 4.0);
        assert_close(segment.eval(4.0).unwrap_or(f64::NAN), 8.0);

        Ok(())
    }

    #[test]
    fn construction_errors() {
        let left = Knot::new(1.0, 0.0_f64);

        assert_eq!(
            Segment::new(&left, &Knot::new(1.0, 1.0), CurveType::Bezier),
            Err(SegmentError::EmptyInterval { start: 1.0, end: 1.0 })
        );

        assert_eq!(
            Segment::new(&left.with_interp(InterpMode::Linear), &Knot::new(2.0, f64::NAN), CurveType::Bezier),
            Err(SegmentError::NonFinite { time: 2.0 })
        );
    }
}
