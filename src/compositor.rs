//! Turns the raw dye field into displayable pixels.
//!
//! Dye color is unbounded and linear; it is tone-mapped here and nowhere
//! earlier. Cells without coverage produce fully transparent output, so the
//! page underneath is never painted over.

use crate::capability::Filtering;
use crate::error::EngineError;
use crate::field::{for_each_row, Field};
use glam::Vec2;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMapping {
    pub exposure: f32,
    pub gamma: f32,
    pub alpha_scale: f32,
    /// Upper bound on output opacity; below 1 keeps the effect translucent.
    pub alpha_cap: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self {
            exposure: 1.15,
            gamma: 0.95,
            alpha_scale: 0.85,
            alpha_cap: 0.85,
        }
    }
}

impl ToneMapping {
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |field: &'static str, reason: &str| EngineError::InvalidConfig {
            field,
            reason: reason.to_string(),
        };
        if !(self.exposure > 0.0) {
            return Err(invalid("tone.exposure", "must be positive"));
        }
        if !(self.gamma > 0.0) {
            return Err(invalid("tone.gamma", "must be positive"));
        }
        if !(self.alpha_scale >= 0.0) {
            return Err(invalid("tone.alpha_scale", "must not be negative"));
        }
        if !(self.alpha_cap >= 0.0 && self.alpha_cap < 1.0) {
            return Err(invalid("tone.alpha_cap", "must be in [0, 1)"));
        }
        Ok(())
    }

    /// `1 - exp(-rgb * exposure)` then a gamma curve; alpha is a capped
    /// fraction of coverage.
    #[inline]
    pub fn apply(&self, texel: [f32; 4]) -> ([f32; 3], f32) {
        let mut rgb = [0.0; 3];
        for c in 0..3 {
            let v = 1.0 - (-texel[c].max(0.0) * self.exposure).exp();
            rgb[c] = v.powf(self.gamma);
        }
        let alpha = (texel[3] * self.alpha_scale).clamp(0.0, self.alpha_cap);
        (rgb, alpha)
    }
}

/// How the effect combines with what is already on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Screen,
    Lighten,
    Additive,
}

impl BlendMode {
    /// Blends `src` at opacity `alpha` over `dst`, all in `[0, 1]`.
    #[inline]
    pub fn blend(self, dst: f32, src: f32, alpha: f32) -> f32 {
        match self {
            BlendMode::Screen => dst + alpha * src * (1.0 - dst),
            BlendMode::Lighten => dst + alpha * (dst.max(src) - dst),
            BlendMode::Additive => (dst + alpha * src).min(1.0),
        }
    }

    /// The CSS `mix-blend-mode` that blends a canvas layer the same way.
    pub fn css_mix_blend_mode(self) -> &'static str {
        match self {
            BlendMode::Screen => "screen",
            BlendMode::Lighten => "lighten",
            BlendMode::Additive => "plus-lighter",
        }
    }
}

/// Straight-alpha RGBA8 pixels, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 4]>,
}

impl Overlay {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 4]; width * height],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        self.pixels[y * self.width + x]
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| p[3] == 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compositor {
    pub tone: ToneMapping,
    pub blend: BlendMode,
}

impl Compositor {
    pub fn new(tone: ToneMapping, blend: BlendMode) -> Self {
        Self { tone, blend }
    }

    /// Tone-maps every dye cell into `out`, resizing it to the dye grid.
    /// Blending with the page is left to the host.
    pub fn render_overlay(&self, dye: &Field, out: &mut Overlay) {
        if out.width != dye.width || out.height != dye.height {
            *out = Overlay::new(dye.width, dye.height);
        }
        let tone = self.tone;
        let height = dye.height;

        for_each_row(&mut out.pixels, dye.width, |row, pixels| {
            let y = height - 1 - row;
            for (x, px) in pixels.iter_mut().enumerate() {
                let (rgb, alpha) = tone.apply(dye.texel(x, y));
                *px = if alpha > 0.0 {
                    [to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]), to_u8(alpha)]
                } else {
                    [0; 4]
                };
            }
        });
    }

    /// Blends the dye field over an existing image at the image's own
    /// resolution. Pixels with no coverage are not written.
    pub fn composite_onto(&self, dye: &Field, filtering: Filtering, target: &mut RgbaImage) {
        let (width, height) = target.dimensions();
        let (width, height) = (width as usize, height as usize);
        if width == 0 || height == 0 {
            return;
        }
        let Compositor { tone, blend } = *self;

        for_each_row(&mut **target, width * 4, |row, pixels| {
            let v = 1.0 - (row as f32 + 0.5) / height as f32;
            for (x, px) in pixels.chunks_exact_mut(4).enumerate() {
                let u = (x as f32 + 0.5) / width as f32;
                let (rgb, alpha) = tone.apply(dye.sample(Vec2::new(u, v), filtering));
                if alpha <= 0.0 {
                    continue;
                }
                for c in 0..3 {
                    let dst = px[c] as f32 / 255.0;
                    px[c] = to_u8(blend.blend(dst, rgb[c], alpha));
                }
                let dst_a = px[3] as f32 / 255.0;
                px[3] = to_u8(dst_a + alpha * (1.0 - dst_a));
            }
        });
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::GridSize;
    use image::Rgba;

    #[test]
    fn test_tone_map_stays_in_display_range() {
        let tone = ToneMapping::default();
        let (rgb, alpha) = tone.apply([50.0, 1000.0, 0.0, 5.0]);
        assert!(rgb[0] <= 1.0 && rgb[1] <= 1.0);
        assert_eq!(rgb[2], 0.0);
        assert_eq!(alpha, 0.85);
    }

    #[test]
    fn test_tone_map_is_monotonic() {
        let tone = ToneMapping::default();
        let mut last = -1.0;
        for i in 0..20 {
            let (rgb, _) = tone.apply([i as f32 * 0.25, 0.0, 0.0, 0.0]);
            assert!(rgb[0] > last);
            last = rgb[0];
        }
    }

    #[test]
    fn test_blend_modes_leave_zero_alpha_untouched() {
        for mode in [BlendMode::Screen, BlendMode::Lighten, BlendMode::Additive] {
            assert_eq!(mode.blend(0.3, 0.9, 0.0), 0.3);
        }
    }

    #[test]
    fn test_screen_never_darkens() {
        for dst in [0.0, 0.2, 0.8, 1.0] {
            assert!(BlendMode::Screen.blend(dst, 0.0, 0.85) >= dst);
        }
    }

    #[test]
    fn test_overlay_is_transparent_without_coverage() {
        let mut dye = Field::new(GridSize::new(4, 4), 4);
        dye.set(1, 0, 0, 3.0);
        let mut overlay = Overlay::new(1, 1);
        let compositor = Compositor::new(ToneMapping::default(), BlendMode::Screen);
        compositor.render_overlay(&dye, &mut overlay);
        assert_eq!(overlay.width, 4);
        assert!(overlay.is_blank());
    }

    #[test]
    fn test_overlay_flips_rows() {
        let mut dye = Field::new(GridSize::new(2, 2), 4);
        dye.set(0, 0, 0, 2.0);
        dye.set(0, 0, 3, 1.0);
        let mut overlay = Overlay::new(2, 2);
        let compositor = Compositor::new(ToneMapping::default(), BlendMode::Screen);
        compositor.render_overlay(&dye, &mut overlay);
        // Bottom-left dye cell lands in the bottom-left pixel.
        assert!(overlay.pixel(0, 1)[3] > 0);
        assert_eq!(overlay.pixel(0, 0), [0; 4]);
        assert_eq!(overlay.as_bytes().len(), 16);
    }

    #[test]
    fn test_composite_leaves_background_outside_dye() {
        let mut dye = Field::new(GridSize::new(8, 8), 4);
        dye.set(0, 0, 0, 4.0);
        dye.set(0, 0, 3, 1.0);
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([20, 40, 60, 255]));
        Compositor::new(ToneMapping::default(), BlendMode::Screen).composite_onto(
            &dye,
            Filtering::Nearest,
            &mut img,
        );
        assert_eq!(img.get_pixel(15, 0), &Rgba([20, 40, 60, 255]));
        let hit = img.get_pixel(0, 15);
        assert!(hit[0] > 20);
        assert_eq!(hit[3], 255);
    }
}
