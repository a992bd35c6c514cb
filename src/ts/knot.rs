use super::types::{InterpMode, SplineValue, Time};

/// Knot tangent. Width is in time units, slope in value per time unit.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Tangent<T> {
    pub width: Time,
    pub slope: T,
}

impl<T> Tangent<T> {
    pub fn new(width: Time, slope: T) -> Self {
        Self { width, slope }
    }
}

/// A spline control point.
///
/// The interpolation mode describes the segment that starts at this knot.
/// A dual-valued knot also carries a pre-value, which is the value the
/// previous segment arrives at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knot<T> {
    time: Time,
    value: T,
    pre_value: Option<T>,
    next_interp: InterpMode,
    pre_tangent: Tangent<T>,
    post_tangent: Tangent<T>,
}

impl<T: SplineValue> Knot<T> {
    pub fn new(time: Time, value: T) -> Self {
        Self {
            time,
            value,
            pre_value: None,
            next_interp: InterpMode::default(),
            pre_tangent: Tangent::default(),
            post_tangent: Tangent::default(),
        }
    }

    pub fn with_interp(mut self, interp: InterpMode) -> Self {
        self.next_interp = interp;
        self
    }

    pub fn with_pre_value(mut self, value: T) -> Self {
        self.pre_value = Some(value);
        self
    }

    pub fn with_pre_tangent(mut self, width: Time, slope: T) -> Self {
        self.pre_tangent = Tangent::new(width, slope);
        self
    }

    pub fn with_post_tangent(mut self, width: Time, slope: T) -> Self {
        self.post_tangent = Tangent::new(width, slope);
        self
    }

    #[inline]
    pub fn time(&self) -> Time {
        self.time
    }

    /// Value at and after the knot.
    #[inline]
    pub fn value(&self) -> T {
        self.value
    }

    /// Value the previous segment arrives at. Equal to [`Knot::value`] unless
    /// the knot is dual-valued.
    #[inline]
    pub fn pre_value(&self) -> T {
        self.pre_value.unwrap_or(self.value)
    }

    pub fn is_dual_valued(&self) -> bool {
        self.pre_value.is_some()
    }

    #[inline]
    pub fn next_interp(&self) -> InterpMode {
        self.next_interp
    }

    pub fn pre_tangent(&self) -> Tangent<T> {
        self.pre_tangent
    }

    pub fn post_tangent(&self) -> Tangent<T> {
        self.post_tangent
    }
}
