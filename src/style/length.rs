/// Width/height (and min/max) value in one of the supported unit spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeValue {
    /// Device pixels, never rescaled.
    Pixels(f32),
    /// DPI-independent points, multiplied by the surface scale.
    Points(f32),
    /// Percent of the parent's children area, two decimal digits of precision.
    Percent(f32),
    /// Extent of visible Auto-positioned children.
    AutoToChildren,
    /// Built-in fallback size.
    Default,
}

impl SizeValue {
    pub const fn px(value: f32) -> Self {
        Self::Pixels(value)
    }

    pub const fn pt(value: f32) -> Self {
        Self::Points(value)
    }

    /// Percentages keep at most two decimal digits.
    pub fn percent(value: f32) -> Self {
        Self::Percent(quantize_percent(value))
    }

    pub const fn is_percent(self) -> bool {
        matches!(self, Self::Percent(_))
    }

    pub const fn is_auto(self) -> bool {
        matches!(self, Self::AutoToChildren)
    }

    pub(crate) fn normalized(self) -> Self {
        match self {
            Self::Percent(value) => Self::Percent(quantize_percent(value)),
            other => other,
        }
    }
}

impl Default for SizeValue {
    fn default() -> Self {
        Self::Default
    }
}

/// A min or max bound. `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeBound(pub Option<SizeValue>);

impl SizeBound {
    pub const NONE: SizeBound = SizeBound(None);

    pub fn new(value: SizeValue) -> Self {
        Self(Some(value.normalized()))
    }
}

impl From<SizeValue> for SizeBound {
    fn from(value: SizeValue) -> Self {
        Self::new(value)
    }
}

impl From<Option<SizeValue>> for SizeBound {
    fn from(value: Option<SizeValue>) -> Self {
        Self(value.map(SizeValue::normalized))
    }
}

fn quantize_percent(value: f32) -> f32 {
    if value.is_finite() {
        (value * 100.0).round() / 100.0
    } else {
        value
    }
}

/// Malformed ratios resolve to the nearest valid value.
pub(crate) fn sanitize_ratio(value: f32) -> f32 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else if value.is_infinite() {
        f32::MAX
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::{SizeValue, sanitize_ratio};

    #[test]
    fn percent_keeps_two_decimal_digits() {
        assert_eq!(SizeValue::percent(33.3333), SizeValue::Percent(33.33));
        assert_eq!(SizeValue::percent(45.678), SizeValue::Percent(45.68));
    }

    #[test]
    fn nan_percent_is_kept_until_resolution() {
        let SizeValue::Percent(value) = SizeValue::percent(f32::NAN) else {
            panic!("expected percent");
        };
        assert!(value.is_nan());
        assert_eq!(sanitize_ratio(value), 0.0);
        assert_eq!(sanitize_ratio(-5.0), 0.0);
    }
}
