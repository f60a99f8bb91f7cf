//! Drawing-surface sizing and the host surface seam.

use crate::capability::PlatformCapabilities;
use crate::config::FluidConfig;
use crate::error::EngineError;
use crate::field::GridSize;
use glam::Vec2;

/// Logical viewport as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }
}

/// On-screen box of the surface in client coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Maps client coordinates to normalized surface coordinates with y = 0
    /// at the bottom edge. `None` for a collapsed rect.
    pub fn normalize(&self, client_x: f32, client_y: f32) -> Option<Vec2> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return None;
        }
        let x = (client_x - self.left) / self.width;
        let y = 1.0 - (client_y - self.top) / self.height;
        Some(Vec2::new(x, y))
    }
}

/// Whatever the engine draws into. Hosts implement this over a browser
/// canvas, a native window, or nothing at all for headless runs.
pub trait SurfaceHandle {
    fn capabilities(&self) -> PlatformCapabilities;
    fn viewport(&self) -> Viewport;
    fn bounding_rect(&self) -> SurfaceRect;
}

/// Sizes derived from one viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceLayout {
    pub viewport: Viewport,
    pub physical_width: u32,
    pub physical_height: u32,
    pub sim: GridSize,
    pub dye: GridSize,
}

impl SurfaceLayout {
    pub fn grids_match(&self, other: &SurfaceLayout) -> bool {
        self.sim == other.sim && self.dye == other.dye
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceManager {
    sim_resolution: usize,
    dye_resolution: usize,
    max_pixel_ratio: f32,
    max_grid_cells: usize,
}

impl SurfaceManager {
    pub fn new(config: &FluidConfig) -> Self {
        Self {
            sim_resolution: config.sim_resolution,
            dye_resolution: config.dye_resolution,
            max_pixel_ratio: config.max_pixel_ratio,
            max_grid_cells: config.max_grid_cells,
        }
    }

    /// Physical buffer size is the logical size times the pixel ratio, the
    /// ratio capped at `max_pixel_ratio`. Each grid puts its base resolution
    /// on the shorter logical axis and stretches the longer one to keep the
    /// viewport's aspect ratio. A viewport so elongated that either grid
    /// would exceed `max_grid_cells` is rejected.
    pub fn configure(
        &self,
        width: f32,
        height: f32,
        device_pixel_ratio: f32,
    ) -> Result<SurfaceLayout, EngineError> {
        if !(width.is_finite() && height.is_finite() && width >= 1.0 && height >= 1.0) {
            return Err(EngineError::InvalidSurface { width, height });
        }

        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio.min(self.max_pixel_ratio)
        } else {
            1.0
        };

        let physical_width = ((width * dpr).round() as u32).max(1);
        let physical_height = ((height * dpr).round() as u32).max(1);

        let grid = |base| {
            grid_for(base, width, height, self.max_grid_cells)
                .ok_or(EngineError::InvalidSurface { width, height })
        };

        Ok(SurfaceLayout {
            viewport: Viewport::new(width, height, device_pixel_ratio),
            physical_width,
            physical_height,
            sim: grid(self.sim_resolution)?,
            dye: grid(self.dye_resolution)?,
        })
    }
}

fn grid_for(base: usize, width: f32, height: f32, max_cells: usize) -> Option<GridSize> {
    // aspect <= 1: shorter over longer
    let aspect = width.min(height) / width.max(height);
    let long = ((base as f32 / aspect).round() as usize).max(base);
    if base.checked_mul(long)? > max_cells {
        return None;
    }
    Some(if width >= height {
        GridSize::new(long, base)
    } else {
        GridSize::new(base, long)
    })
}

/// A surface with no window behind it, for tests, benches and offline runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessSurface {
    pub viewport: Viewport,
    pub capabilities: PlatformCapabilities,
}

impl HeadlessSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            viewport: Viewport::new(width, height, 1.0),
            capabilities: PlatformCapabilities::cpu(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.width = width;
        self.viewport.height = height;
    }
}

impl SurfaceHandle for HeadlessSurface {
    fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn bounding_rect(&self) -> SurfaceRect {
        SurfaceRect::new(0.0, 0.0, self.viewport.width, self.viewport.height)
    }
}
