/// Straight-alpha RGBA color, `f32` channels in `[0, 1]`.
///
/// Channels are stored as given. Vertex colors are replicated bit-for-bit into
/// the vertex buffer, so no clamping or premultiplication happens here.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb_f32(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb_f32(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb_f32(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb_f32(0.0, 0.0, 1.0);

    /// Opaque color from RGB components.
    #[inline]
    pub const fn rgb_f32(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[inline]
    pub const fn transparent() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }
    }

    #[inline]
    pub const fn rgb(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Converts to the `f64` clear color wgpu expects.
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

impl From<[f32; 3]> for Color {
    #[inline]
    fn from(v: [f32; 3]) -> Self {
        Color::rgb_f32(v[0], v[1], v[2])
    }
}

impl From<(f32, f32, f32)> for Color {
    #[inline]
    fn from((r, g, b): (f32, f32, f32)) -> Self {
        Color::rgb_f32(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_conversion_is_opaque() {
        let c = Color::from((0.25, 0.5, 0.75));
        assert_eq!(c.rgb(), [0.25, 0.5, 0.75]);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn clear_color_widens_channels() {
        let c = Color::BLUE.to_wgpu();
        assert_eq!((c.r, c.g, c.b, c.a), (0.0, 0.0, 1.0, 1.0));
        assert_eq!(Color::transparent().to_wgpu().a, 0.0);
    }
}
