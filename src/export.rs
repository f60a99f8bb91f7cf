use crate::capability::Filtering;
use crate::compositor::Compositor;
use crate::error::EngineError;
use crate::field::Field;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Renders solver state into standalone images.
pub struct ImageExporter {
    compositor: Compositor,
    width: u32,
    height: u32,
    background: Rgba<u8>,
}

impl ImageExporter {
    pub fn new(compositor: Compositor, width: u32, height: u32) -> Self {
        Self {
            compositor,
            width,
            height,
            background: Rgba([12, 12, 16, 255]),
        }
    }

    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    /// The effect blended over a flat background.
    pub fn render(&self, dye: &Field, filtering: Filtering) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(self.width, self.height, self.background);
        self.compositor.composite_onto(dye, filtering, &mut img);
        img
    }

    /// Velocity magnitude per axis: red for x, green for y.
    pub fn render_velocity_field(&self, velocity: &Field, scale: f32) -> RgbImage {
        let mut img = ImageBuffer::new(self.width, self.height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let sim_x = (x as usize * velocity.width / self.width as usize).min(velocity.width - 1);
            let sim_y = velocity.height
                - 1
                - (y as usize * velocity.height / self.height as usize).min(velocity.height - 1);
            let r = (velocity.get(sim_x, sim_y, 0).abs() * scale * 255.0).min(255.0) as u8;
            let g = (velocity.get(sim_x, sim_y, 1).abs() * scale * 255.0).min(255.0) as u8;
            *pixel = Rgb([r, g, 128]);
        }
        img
    }

    pub fn export_png(
        &self,
        dye: &Field,
        filtering: Filtering,
        path: &Path,
    ) -> Result<(), EngineError> {
        self.render(dye, filtering).save(path)?;
        Ok(())
    }

    pub fn export_velocity_png(
        &self,
        velocity: &Field,
        scale: f32,
        path: &Path,
    ) -> Result<(), EngineError> {
        self.render_velocity_field(velocity, scale).save(path)?;
        Ok(())
    }

    /// PNG snapshot as a `data:image/png;base64,...` URL.
    pub fn to_data_url(&self, dye: &Field, filtering: Filtering) -> Result<String, EngineError> {
        let img = self.render(dye, filtering);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(&bytes)))
    }
}
