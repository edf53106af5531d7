use crate::geometry::Axis;

/// Dots per inch, per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dpi {
    pub x: f32,
    pub y: f32,
}

impl Dpi {
    pub const STANDARD: Dpi = Dpi { x: 96.0, y: 96.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn uniform(value: f32) -> Self {
        Self { x: value, y: value }
    }

    pub fn along(self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }
}

impl Default for Dpi {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Point-to-pixel multiplier of one surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DpiScale {
    pub x: f32,
    pub y: f32,
}

impl DpiScale {
    pub const IDENTITY: DpiScale = DpiScale { x: 1.0, y: 1.0 };

    /// `surface / base` per axis; unusable DPI values scale by 1.
    pub fn between(surface: Dpi, base: Dpi) -> Self {
        Self {
            x: axis_scale(surface.x, base.x),
            y: axis_scale(surface.y, base.y),
        }
    }

    pub fn along(self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }

    pub fn points_to_pixels(self, axis: Axis, points: f32) -> f32 {
        points * self.along(axis)
    }

    pub fn pixels_to_points(self, axis: Axis, pixels: f32) -> f32 {
        pixels / self.along(axis)
    }
}

impl Default for DpiScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn axis_scale(surface: f32, base: f32) -> f32 {
    let usable = |v: f32| v.is_finite() && v > 0.0;
    if usable(surface) && usable(base) {
        surface / base
    } else {
        1.0
    }
}
