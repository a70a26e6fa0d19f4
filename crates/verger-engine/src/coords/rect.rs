use super::Vec2;

/// Axis-aligned rectangle.
///
/// Sprites use it as a source region in texture pixels, with the origin at the
/// texture's top-left pixel.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub const ZERO: Rect = Rect::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Rectangle anchored at the origin covering `size`.
    #[inline]
    pub const fn from_size(size: Vec2) -> Self {
        Self { origin: Vec2::ZERO, size }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.is_degenerate()
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin.is_finite() && self.size.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_rects_are_empty() {
        assert!(Rect::ZERO.is_empty());
        assert!(Rect::new(4.0, 4.0, 0.0, 8.0).is_empty());
        assert!(Rect::new(4.0, 4.0, 8.0, -1.0).is_empty());
        assert!(!Rect::new(4.0, 4.0, 8.0, 8.0).is_empty());
    }

    #[test]
    fn max_is_origin_plus_size() {
        let r = Rect::new(16.0, 32.0, 8.0, 4.0);
        assert_eq!(r.max(), Vec2::new(24.0, 36.0));
        assert_eq!(Rect::from_size(Vec2::new(3.0, 5.0)).max(), Vec2::new(3.0, 5.0));
    }

    #[test]
    fn non_finite_rect_detected() {
        assert!(!Rect::new(f32::NAN, 0.0, 1.0, 1.0).is_finite());
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_finite());
    }
}
