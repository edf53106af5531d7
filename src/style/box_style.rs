use smol_str::SmolStr;

use crate::geometry::{Axis, EdgeInsets, Rect};
use crate::style::color::Color;
use crate::style::length::{SizeBound, SizeValue};
use crate::view::text::FontRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Positioning {
    /// Sequential flow along the parent's child axis.
    #[default]
    Auto,
    /// Edge offsets inside the parent's origin rect.
    Relative,
    /// Offset from the parent's outer rect, outside the flow.
    Absolute,
}

/// Which box of an element is meant: content, padding box or border box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxBoundary {
    #[default]
    Inner,
    InnerBorder,
    Outer,
}

/// Box that holds an element's children, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildrenBoundary {
    #[default]
    Inner,
    InnerBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClippingMode {
    /// Children are clipped to the clipping boundary.
    #[default]
    Auto,
    /// Children may paint outside this element.
    Disabled,
    /// Children are clipped to a rect in points, relative to the element's outer origin.
    Custom(Rect),
}

/// Alignment of children along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Start,
    Center,
    End,
    /// Main axis only; acts as `Start` on the cross axis.
    SpaceBetween,
    /// Main axis only; acts as `Start` on the cross axis.
    SpaceAround,
}

/// Edge offsets of a Relative element, in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RelativeOffsets {
    pub left: Option<f32>,
    pub top: Option<f32>,
    pub right: Option<f32>,
    pub bottom: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxStyle {
    pub width: SizeValue,
    pub height: SizeValue,
    pub min_width: SizeBound,
    pub max_width: SizeBound,
    pub min_height: SizeBound,
    pub max_height: SizeBound,
    pub margin: EdgeInsets<f32>,
    pub padding: EdgeInsets<f32>,
    pub border: EdgeInsets<f32>,
    pub positioning: Positioning,
    pub absolute_x: f32,
    pub absolute_y: f32,
    pub relative: RelativeOffsets,
    pub relative_origin: BoxBoundary,
    pub child_axis: Axis,
    pub child_spacing: f32,
    pub horizontal_alignment: Alignment,
    pub vertical_alignment: Alignment,
    pub children_width_boundary: ChildrenBoundary,
    pub children_height_boundary: ChildrenBoundary,
    pub clipping_boundary: BoxBoundary,
    pub clipping_mode: ClippingMode,
    pub flex_percent_width: bool,
    pub flex_percent_height: bool,
    pub visible: bool,
    pub cursor_pass_through: bool,
    pub text: Option<SmolStr>,
    pub font: Option<FontRequest>,
    pub background_color: Color,
    pub border_colors: EdgeInsets<Color>,
    pub text_color: Color,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            width: SizeValue::Default,
            height: SizeValue::Default,
            min_width: SizeBound::NONE,
            max_width: SizeBound::NONE,
            min_height: SizeBound::NONE,
            max_height: SizeBound::NONE,
            margin: EdgeInsets::uniform(0.0),
            padding: EdgeInsets::uniform(0.0),
            border: EdgeInsets::uniform(0.0),
            positioning: Positioning::Auto,
            absolute_x: 0.0,
            absolute_y: 0.0,
            relative: RelativeOffsets::default(),
            relative_origin: BoxBoundary::Inner,
            child_axis: Axis::Vertical,
            child_spacing: 0.0,
            horizontal_alignment: Alignment::Start,
            vertical_alignment: Alignment::Start,
            children_width_boundary: ChildrenBoundary::Inner,
            children_height_boundary: ChildrenBoundary::Inner,
            clipping_boundary: BoxBoundary::Inner,
            clipping_mode: ClippingMode::Auto,
            flex_percent_width: false,
            flex_percent_height: false,
            visible: true,
            cursor_pass_through: false,
            text: None,
            font: None,
            background_color: Color::TRANSPARENT,
            border_colors: EdgeInsets::uniform(Color::BLACK),
            text_color: Color::BLACK,
        }
    }
}

impl BoxStyle {
    pub fn size(&self, axis: Axis) -> SizeValue {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    pub fn bounds(&self, axis: Axis) -> (SizeBound, SizeBound) {
        match axis {
            Axis::Horizontal => (self.min_width, self.max_width),
            Axis::Vertical => (self.min_height, self.max_height),
        }
    }

    pub fn alignment(&self, axis: Axis) -> Alignment {
        match axis {
            Axis::Horizontal => self.horizontal_alignment,
            Axis::Vertical => self.vertical_alignment,
        }
    }

    pub fn children_boundary(&self, axis: Axis) -> ChildrenBoundary {
        match axis {
            Axis::Horizontal => self.children_width_boundary,
            Axis::Vertical => self.children_height_boundary,
        }
    }

    pub fn flexes(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.flex_percent_width,
            Axis::Vertical => self.flex_percent_height,
        }
    }

    /// Takes part in the parent's flow and auto-size.
    pub fn is_in_flow(&self) -> bool {
        self.visible && self.positioning == Positioning::Auto
    }

    pub fn has_text(&self) -> bool {
        self.text.as_ref().is_some_and(|text| !text.is_empty())
    }
}
