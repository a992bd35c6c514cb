use anyhow::{ensure, Result};

use super::{
    knot::Knot,
    segment::Segment,
    types::{from_f64, to_f64, CurveType, ExtrapMode, Extrapolation, InterpMode, Side, SplineValue, Time},
};

/// Time-ordered knots plus the rules for evaluating between and beyond them.
///
/// At most one knot exists per time. Evaluation works directly on the knots;
/// [`crate::ts::Evaluator`] adds a per-segment cache on top.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline<T> {
    knots: Vec<Knot<T>>,
    curve_type: CurveType,
    pre_extrapolation: Extrapolation,
    post_extrapolation: Extrapolation,
}

impl<T> Default for Spline<T> {
    fn default() -> Self {
        Self {
            knots: Vec::new(),
            curve_type: CurveType::default(),
            pre_extrapolation: Extrapolation::default(),
            post_extrapolation: Extrapolation::default(),
        }
    }
}

impl<T: SplineValue> Spline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_curve_type(curve_type: CurveType) -> Self {
        Self {
            curve_type,
            ..Self::default()
        }
    }

    #[inline]
    pub fn curve_type(&self) -> CurveType {
        self.curve_type
    }

    pub fn set_curve_type(&mut self, curve_type: CurveType) {
        self.curve_type = curve_type;
    }

    /// Inserts a knot, replacing any knot at the same time.
    pub fn set_knot(&mut self, knot: Knot<T>) -> Result<()> {
        let time = knot.time();
        ensure!(time.is_finite(), "Knot time must be finite, got {}", time);

        for width in [knot.pre_tangent().width, knot.post_tangent().width] {
            ensure!(
                width.is_finite() && width >= 0.0,
                "Tangent width must be non-negative, got {} at time {}",
                width,
                time
            );
        }

        let index = self.knots.partition_point(|k| k.time() < time);

        match self.knots.get_mut(index) {
            Some(existing) if existing.time() == time => *existing = knot,
            _ => self.knots.insert(index, knot),
        }

        Ok(())
    }

    pub fn remove_knot(&mut self, time: Time) -> Option<Knot<T>> {
        let index = self.knots.iter().position(|k| k.time() == time)?;
        Some(self.knots.remove(index))
    }

    #[inline]
    pub fn knots(&self) -> &[Knot<T>] {
        &self.knots
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.knots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn pre_extrapolation(&self) -> Extrapolation {
        self.pre_extrapolation
    }

    pub fn post_extrapolation(&self) -> Extrapolation {
        self.post_extrapolation
    }

    pub fn set_pre_extrapolation(&mut self, extrapolation: impl Into<Extrapolation>) {
        self.pre_extrapolation = extrapolation.into();
    }

    pub fn set_post_extrapolation(&mut self, extrapolation: impl Into<Extrapolation>) {
        self.post_extrapolation = extrapolation.into();
    }

    /// Returns `true` if any segment is a Bezier or Hermite curve.
    pub fn has_curve_segments(&self) -> bool {
        let segments = self.knots.len().saturating_sub(1);

        self.knots[..segments]
            .iter()
            .any(|knot| knot.next_interp() == InterpMode::Curve)
    }

    /// First and last knot times.
    pub fn time_range(&self) -> Option<(Time, Time)> {
        Some((self.knots.first()?.time(), self.knots.last()?.time()))
    }

    /// Segment starting at knot `index`, or `None` if it can't be built.
    fn segment(&self, index: usize) -> Option<Segment> {
        match self.knots.get(index..index + 2)? {
            [left, right] => Segment::new(left, right, self.curve_type).ok(),
            _ => None,
        }
    }

    /// Evaluates the spline at `time`.
    ///
    /// `side` only matters at discontinuities: dual-valued knots, value block
    /// boundaries and loop joins. Returns `None` for empty splines and value
    /// blocks.
    pub fn eval(&self, time: Time, side: Side) -> Option<T> {
        self.eval_f64(time, side).map(from_f64)
    }

    fn eval_f64(&self, time: Time, side: Side) -> Option<f64> {
        let (first, last) = self.time_range()?;

        if time.is_nan() {
            return None;
        }

        if time < first || time > last {
            return self.extrapolate(time, side);
        }

        self.eval_knots(time, side)
    }

    /// Evaluation inside the knot range.
    fn eval_knots(&self, time: Time, side: Side) -> Option<f64> {
        let index = self.knots.partition_point(|k| k.time() <= time).checked_sub(1)?;
        let knot = &self.knots[index];

        if side == Side::Left && knot.time() == time {
            if index == 0 {
                return Some(to_f64(knot.pre_value()));
            }

            return self.segment(index - 1)?.eval(time);
        }

        if index + 1 == self.knots.len() {
            return Some(to_f64(knot.value()));
        }

        self.segment(index)?.eval(time)
    }

    fn extrapolate(&self, time: Time, side: Side) -> Option<f64> {
        let (first, last) = (self.knots.first()?, self.knots.last()?);

        let before = time < first.time();

        let (extrapolation, anchor_time, anchor_value) = if before {
            (self.pre_extrapolation, first.time(), to_f64(first.pre_value()))
        } else {
            (self.post_extrapolation, last.time(), to_f64(last.value()))
        };

        let offset = time - anchor_time;

        match extrapolation.mode {
            ExtrapMode::ValueBlock => None,
            ExtrapMode::Held => Some(anchor_value),
            ExtrapMode::Linear => Some(anchor_value + self.edge_slope(before) * offset),
            ExtrapMode::Sloped => Some(anchor_value + extrapolation.slope * offset),
            ExtrapMode::LoopRepeat | ExtrapMode::LoopReset | ExtrapMode::LoopOscillate => {
                let period = last.time() - first.time();

                // A single knot has nothing to repeat.
                if !(period > 0.0) {
                    return Some(anchor_value);
                }

                self.eval_looped(time, side, extrapolation.mode, period)
            }
        }
    }

    /// Slope of the first segment (`before`) or the last one.
    fn edge_slope(&self, before: bool) -> f64 {
        let count = self.knots.len();
        if count < 2 {
            return 0.0;
        }

        let segment = if before {
            self.segment(0).map(|s| s.start_slope())
        } else {
            self.segment(count - 2).map(|s| s.end_slope())
        };

        segment.unwrap_or(0.0)
    }

    /// Maps `time` into the knot range and evaluates the copy it lands in.
    fn eval_looped(&self, time: Time, side: Side, mode: ExtrapMode, period: f64) -> Option<f64> {
        let (first, last) = (self.knots.first()?, self.knots.last()?);
        let (start, end) = (first.time(), last.time());

        let mut cycle = ((time - start) / period).floor();
        let mut local = (time - cycle * period).clamp(start, end);
        let mut side = side;

        // The left limit at a join belongs to the end of the previous copy.
        if side == Side::Left && local <= start {
            cycle -= 1.0;
            local = end;
        }

        let offset = match mode {
            ExtrapMode::LoopRepeat => cycle * (to_f64(last.value()) - to_f64(first.value())),
            _ => 0.0,
        };

        if mode == ExtrapMode::LoopOscillate && cycle.rem_euclid(2.0) == 1.0 {
            local = start + end - local;
            side = match side {
                Side::Left => Side::Right,
                Side::Right => Side::Left,
            };
        }

        self.eval_knots(local, side).map(|value| value + offset)
    }
}

#[cfg(test)]
mod tests {
    use half::f16;

    use super::*;

    fn linear_ramp() -> Result<Spline<f64>> {
        let mut spline = Spline::new();
        spline.set_knot(Knot::new(0.0, 0.0).with_interp(InterpMode::Linear))?;
        spline.set_knot(Knot::new(2.0, 4.0))?;
        Ok(spline)
    }

    #[test]
    fn empty_spline() {
        let spline = Spline::<f64>::new();

        assert!(spline.is_empty());
        assert_eq!(spline.time_range(), None);
        assert_eq!(spline.eval(0.0, Side::Right), None);
        assert!(!spline.has_curve_segments());
    }

    #[test]
    fn set_knot_keeps_order() -> Result<()> {
        let mut spline = Spline::<f64>::new();

        spline.set_knot(Knot::new(3.0, 3.0))?;
        spline.set_knot(Knot::new(1.0, 1.0))?;
        spline.set_knot(Knot::new(2.0, 2.0))?;
        spline.set_knot(Knot::new(1.0, 10.0))?;

        let times = spline.knots().iter().map(Knot::time).collect::<Vec<_>>();
        assert_eq!(times, [1.0, 2.0, 3.0]);
        assert_eq!(spline.knots()[0].value(), 10.0);

        assert!(spline.remove_knot(2.0).is_some());
        assert!(spline.remove_knot(2.0).is_none());
        assert_eq!(spline.time_range(), Some((1.0, 3.0)));

        Ok(())
    }

    #[test]
    fn set_knot_rejects_invalid() {
        let mut spline = Spline::<f64>::new();

        assert!(spline.set_knot(Knot::new(f64::NAN, 0.0)).is_err());
        assert!(spline.set_knot(Knot::new(f64::INFINITY, 0.0)).is_err());
        assert!(spline.set_knot(Knot::new(0.0, 0.0).with_post_tangent(-1.0, 0.0)).is_err());
        assert!(spline.is_empty());
    }

    #[test]
    fn single_knot() -> Result<()> {
        let mut spline = Spline::<f64>::new();
        spline.set_knot(Knot::new(1.0, 7.0))?;
        spline.set_post_extrapolation(ExtrapMode::LoopRepeat);

        assert_eq!(spline.eval(-5.0, Side::Right), Some(7.0));
        assert_eq!(spline.eval(1.0, Side::Left), Some(7.0));
        assert_eq!(spline.eval(5.0, Side::Right), Some(7.0));

        Ok(())
    }

    #[test]
    fn dual_valued_knot() -> Result<()> {
        let mut spline = Spline::<f64>::new();
        spline.set_knot(Knot::new(0.0, 0.0).with_interp(InterpMode::Linear))?;
        spline.set_knot(Knot::new(1.0, 10.0).with_pre_value(5.0))?;
        spline.set_knot(Knot::new(2.0, 0.0))?;

        assert_eq!(spline.eval(0.5, Side::Right), Some(2.5));
        assert_eq!(spline.eval(1.0, Side::Left), Some(5.0));
        assert_eq!(spline.eval(1.0, Side::Right), Some(10.0));
        assert_eq!(spline.eval(1.5, Side::Right), Some(10.0));
        assert_eq!(spline.eval(2.0, Side::Left), Some(10.0));
        assert_eq!(spline.eval(2.0, Side::Right), Some(0.0));

        Ok(())
    }

    #[test]
    fn value_block_segment() -> Result<()> {
        let mut spline = Spline::<f64>::new();
        spline.set_knot(Knot::new(0.0, 1.0).with_interp(InterpMode::ValueBlock))?;
        spline.set_knot(Knot::new(1.0, 2.0))?;

        assert_eq!(spline.eval(0.0, Side::Right), None);
        assert_eq!(spline.eval(0.5, Side::Right), None);
        assert_eq!(spline.eval(1.0, Side::Left), None);
        assert_eq!(spline.eval(1.0, Side::Right), Some(2.0));

        Ok(())
    }

    #[test]
    #[rustfmt::skip]
    fn extrapolation() -> Result<()> {
        let cases = [
            (Extrapolation::new(ExtrapMode::Held),       -1.0, Some(0.0), 3.0, Some(4.0)),
            (Extrapolation::new(ExtrapMode::Linear),     -1.0, Some(-2.0), 3.0, Some(6.0)),
            (Extrapolation::sloped(0.5),                 -2.0, Some(-1.0), 4.0, Some(5.0)),
            (Extrapolation::new(ExtrapMode::ValueBlock), -1.0, None, 3.0, None),
        ];

        for (extrapolation, before, expected_before, after, expected_after) in cases {
            let mut spline = linear_ramp()?;
            spline.set_pre_extrapolation(extrapolation);
            spline.set_post_extrapolation(extrapolation);

            assert_eq!(spline.eval(before, Side::Right), expected_before, "{extrapolation:?}");
            assert_eq!(spline.eval(after, Side::Right), expected_after, "{extrapolation:?}");
        }

        Ok(())
    }

    #[test]
    fn loop_repeat() -> Result<()> {
        let mut spline = linear_ramp()?;
        spline.set_pre_extrapolation(ExtrapMode::LoopRepeat);
        spline.set_post_extrapolation(ExtrapMode::LoopRepeat);

        assert_eq!(spline.eval(3.0, Side::Right), Some(6.0));
        assert_eq!(spline.eval(4.0, Side::Right), Some(8.0));
        assert_eq!(spline.eval(-1.0, Side::Right), Some(-2.0));

        Ok(())
    }

    #[test]
    fn loop_reset() -> Result<()> {
        let mut spline = linear_ramp()?;
        spline.set_post_extrapolation(ExtrapMode::LoopReset);

        assert_eq!(spline.eval(3.0, Side::Right), Some(2.0));
        assert_eq!(spline.eval(4.0, Side::Right), Some(0.0));
        assert_eq!(spline.eval(4.0, Side::Left), Some(4.0));

        Ok(())
    }

    #[test]
    fn loop_oscillate() -> Result<()> {
        let mut spline = linear_ramp()?;
        spline.set_post_extrapolation(ExtrapMode::LoopOscillate);

        assert_eq!(spline.eval(2.5, Side::Right), Some(3.0));
        assert_eq!(spline.eval(4.0, Side::Right), Some(0.0));
        assert_eq!(spline.eval(5.0, Side::Right), Some(2.0));

        Ok(())
    }

    #[test]
    fn curve_detection() -> Result<()> {
        let mut spline = linear_ramp()?;
        assert!(!spline.has_curve_segments());

        // A curve mode on the last knot starts no segment.
        spline.set_knot(Knot::new(2.0, 4.0).with_interp(InterpMode::Curve))?;
        assert!(!spline.has_curve_segments());

        spline.set_knot(Knot::new(0.0, 0.0).with_interp(InterpMode::Curve))?;
        assert!(spline.has_curve_segments());

        Ok(())
    }

    #[test]
    fn narrow_value_types() -> Result<()> {
        let mut single = Spline::<f32>::new();
        single.set_knot(Knot::new(0.0, 0.0).with_interp(InterpMode::Linear))?;
        single.set_knot(Knot::new(2.0, 4.0))?;
        assert_eq!(single.eval(1.0, Side::Right), Some(2.0));

        let mut half = Spline::<f16>::new();
        half.set_knot(Knot::new(0.0, f16::from_f32(0.0)).with_interp(InterpMode::Linear))?;
        half.set_knot(Knot::new(2.0, f16::from_f32(4.0)))?;
        assert_eq!(half.eval(1.0, Side::Right), Some(f16::from_f32(2.0)));

        Ok(())
    }
}
