use bitflags::bitflags;

use crate::geometry::{Axis, Position, Rect, Size};
use crate::view::text::{FontHandle, TextLayout};

bitflags! {
    /// Layout properties awaiting resolution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InvalidFlags: u8 {
        const WIDTH = 1 << 0;
        const HEIGHT = 1 << 1;
        const POSITION = 1 << 2;
        const TEXT = 1 << 3;

        const SIZE = Self::WIDTH.bits() | Self::HEIGHT.bits();
        const LAYOUT = Self::SIZE.bits() | Self::POSITION.bits();
    }
}

impl InvalidFlags {
    pub const fn size(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => Self::WIDTH,
            Axis::Vertical => Self::HEIGHT,
        }
    }
}

/// Resolved geometry of one element, in pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutState {
    pub size: Size,
    /// Relative to the parent's outer origin (or the surface origin for roots).
    pub relative: Position,
    pub absolute: Position,
    pub invalid: InvalidFlags,
    pub(crate) in_invalid_list: bool,
    pub(crate) absolute_invalid: bool,
    pub(crate) size_changed: bool,
    pub(crate) position_changed: bool,
    pub(crate) painted_rect: Option<Rect>,
    pub font: Option<FontHandle>,
    pub text: Option<TextLayout>,
}

impl LayoutState {
    pub fn new() -> Self {
        Self {
            invalid: InvalidFlags::LAYOUT | InvalidFlags::TEXT,
            ..Self::default()
        }
    }

    pub fn outer_rect(&self) -> Rect {
        Rect::new(
            self.absolute.x,
            self.absolute.y,
            self.size.width,
            self.size.height,
        )
    }

    pub fn size_along(&self, axis: Axis) -> f32 {
        self.size.along(axis)
    }

    pub(crate) fn set_size_along(&mut self, axis: Axis, value: f32) -> bool {
        let slot = match axis {
            Axis::Horizontal => &mut self.size.width,
            Axis::Vertical => &mut self.size.height,
        };
        if approx_eq(*slot, value) {
            return false;
        }
        *slot = value;
        self.size_changed = true;
        true
    }

    pub(crate) fn set_relative(&mut self, position: Position) -> bool {
        if approx_eq(self.relative.x, position.x) && approx_eq(self.relative.y, position.y) {
            return false;
        }
        self.relative = position;
        self.position_changed = true;
        true
    }
}

pub(crate) fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.0001
}
