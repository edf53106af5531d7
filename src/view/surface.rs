use std::any::Any;
use std::fmt;

use smol_str::SmolStr;

use crate::geometry::Rect;
use crate::view::dpi::Dpi;
use crate::view::store::ElementId;

/// A root drawing target: pixel size, DPI, roots and dirty rects.
pub struct Surface {
    pub(crate) name: Option<SmolStr>,
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) dpi: Dpi,
    pub(crate) roots: Vec<ElementId>,
    pub(crate) invalid_rects: Vec<Rect>,
    pub(crate) aux_data: Option<Box<dyn Any>>,
    /// A repaint request was posted and no paint covered it yet.
    pub(crate) repaint_requested: bool,
}

impl Surface {
    pub(crate) fn new(width: f32, height: f32, dpi: Dpi) -> Self {
        let mut surface = Self {
            name: None,
            width: sanitize_extent(width),
            height: sanitize_extent(height),
            dpi,
            roots: Vec::new(),
            invalid_rects: Vec::new(),
            aux_data: None,
            repaint_requested: false,
        };
        surface.invalidate_all();
        surface
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn dpi(&self) -> Dpi {
        self.dpi
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub fn invalid_rects(&self) -> &[Rect] {
        &self.invalid_rects
    }

    pub fn needs_repaint(&self) -> bool {
        !self.invalid_rects.is_empty()
    }

    pub(crate) fn resize(&mut self, width: f32, height: f32) -> bool {
        let (width, height) = (sanitize_extent(width), sanitize_extent(height));
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.invalidate_all();
        true
    }

    /// Appends `rect` clipped to the surface; empty rects are dropped. Overlap is
    /// left for [`Surface::mark_painted`].
    pub(crate) fn invalidate_rect(&mut self, rect: Rect) {
        let rect = rect.intersect(self.bounds());
        if !rect.is_empty() {
            self.invalid_rects.push(rect);
        }
    }

    pub(crate) fn invalidate_all(&mut self) {
        self.invalid_rects.clear();
        let bounds = self.bounds();
        if !bounds.is_empty() {
            self.invalid_rects.push(bounds);
        }
    }

    /// Drops the dirty rects that `painted` fully covers.
    pub(crate) fn mark_painted(&mut self, painted: Rect) {
        self.invalid_rects.retain(|rect| !painted.contains_rect(*rect));
        if self.invalid_rects.is_empty() {
            self.repaint_requested = false;
        }
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dpi", &self.dpi)
            .field("roots", &self.roots.len())
            .field("invalid_rects", &self.invalid_rects)
            .finish()
    }
}

fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::Surface;
    use crate::geometry::Rect;
    use crate::view::dpi::Dpi;

    #[test]
    fn new_surface_is_fully_invalid() {
        let surface = Surface::new(200.0, 100.0, Dpi::STANDARD);
        assert_eq!(surface.invalid_rects(), &[Rect::from_size(200.0, 100.0)]);
    }

    #[test]
    fn overlapping_rects_are_kept_until_painted() {
        let mut surface = Surface::new(200.0, 100.0, Dpi::STANDARD);
        surface.mark_painted(surface.bounds());
        surface.invalidate_rect(Rect::new(10.0, 10.0, 5.0, 5.0));
        surface.invalidate_rect(Rect::new(0.0, 0.0, 50.0, 50.0));
        surface.invalidate_rect(Rect::new(10.0, 10.0, 5.0, 5.0));
        assert_eq!(surface.invalid_rects().len(), 3);

        surface.mark_painted(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert!(!surface.needs_repaint());
    }

    #[test]
    fn painting_removes_only_contained_rects() {
        let mut surface = Surface::new(200.0, 100.0, Dpi::STANDARD);
        surface.mark_painted(surface.bounds());
        surface.invalidate_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        surface.invalidate_rect(Rect::new(150.0, 0.0, 10.0, 10.0));
        surface.mark_painted(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(surface.invalid_rects(), &[Rect::new(150.0, 0.0, 10.0, 10.0)]);
    }

    #[test]
    fn rects_outside_the_surface_are_ignored() {
        let mut surface = Surface::new(200.0, 100.0, Dpi::STANDARD);
        surface.mark_painted(surface.bounds());
        surface.invalidate_rect(Rect::new(300.0, 0.0, 10.0, 10.0));
        assert!(!surface.needs_repaint());
    }
}
