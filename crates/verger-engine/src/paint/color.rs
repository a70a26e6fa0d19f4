/// Straight-alpha linear RGBA color.
///
/// Used for sprite tints (multiplied with the sampled texel) and camera
/// background colors. The sprite pipeline blends with `SrcAlpha,
/// OneMinusSrcAlpha`, so channels are *not* premultiplied.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const CORNFLOWER_BLUE: Color = Color::rgba(0.392, 0.584, 0.929, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Creates a color from straight 8-bit channels (`0`–`255`).
    #[inline]
    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Same color with a different alpha.
    #[inline]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self.a >= 1.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_opaque_white() {
        assert_eq!(Color::default(), Color::WHITE);
        assert!(Color::default().is_opaque());
    }

    #[test]
    fn u8_channels_are_normalized() {
        let c = Color::from_rgba_u8(255, 0, 51, 255);
        assert_eq!(c.to_array(), [1.0, 0.0, 0.2, 1.0]);
    }

    #[test]
    fn with_alpha_keeps_rgb() {
        let c = Color::rgb(0.5, 0.25, 0.125).with_alpha(0.5);
        assert_eq!(c, Color::rgba(0.5, 0.25, 0.125, 0.5));
        assert!(!c.is_opaque());
    }
}
