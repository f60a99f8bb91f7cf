//! Tunable constants for the cursor fluid effect.

use crate::compositor::{BlendMode, ToneMapping};
use crate::error::EngineError;
use crate::pointer::ColorCycle;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default palette: cyan, purple, green, blue, pink, orange, yellow.
pub const DEFAULT_PALETTE: [[f32; 3]; 7] = [
    [56.0 / 255.0, 189.0 / 255.0, 248.0 / 255.0],
    [168.0 / 255.0, 85.0 / 255.0, 247.0 / 255.0],
    [34.0 / 255.0, 197.0 / 255.0, 94.0 / 255.0],
    [59.0 / 255.0, 130.0 / 255.0, 246.0 / 255.0],
    [236.0 / 255.0, 72.0 / 255.0, 153.0 / 255.0],
    [249.0 / 255.0, 115.0 / 255.0, 22.0 / 255.0],
    [250.0 / 255.0, 204.0 / 255.0, 21.0 / 255.0],
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    /// Velocity/pressure cells along the shorter surface axis.
    pub sim_resolution: usize,
    /// Dye cells along the shorter surface axis.
    pub dye_resolution: usize,
    pub max_pixel_ratio: f32,
    /// Largest grid, in cells, a viewport may ask for.
    pub max_grid_cells: usize,
    pub dt: f32,
    pub velocity_dissipation: f32,
    pub dye_dissipation: f32,
    pub pressure_iterations: usize,
    pub curl_strength: f32,
    /// Gaussian falloff in squared normalized units.
    pub splat_radius: f32,
    pub splat_force: f32,
    pub dye_radius_scale: f32,
    pub dye_boost: f32,
    pub coverage_gain: f32,
    pub tone: ToneMapping,
    pub blend: BlendMode,
    pub color_cycle: ColorCycle,
    pub palette: Vec<[f32; 3]>,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            sim_resolution: 128,
            dye_resolution: 512,
            max_pixel_ratio: 2.0,
            max_grid_cells: 1 << 22,
            dt: 0.016,
            velocity_dissipation: 0.985,
            dye_dissipation: 0.992,
            pressure_iterations: 14,
            curl_strength: 18.0,
            splat_radius: 0.0009,
            splat_force: 520.0,
            dye_radius_scale: 0.75,
            dye_boost: 1.35,
            coverage_gain: 0.35,
            tone: ToneMapping::default(),
            blend: BlendMode::default(),
            color_cycle: ColorCycle::default(),
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl FluidConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: FluidConfig =
            serde_json::from_str(json).map_err(|e| EngineError::ConfigLoad(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::ConfigLoad(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        fn invalid(field: &'static str, reason: &str) -> EngineError {
            EngineError::InvalidConfig {
                field,
                reason: reason.to_string(),
            }
        }

        if self.sim_resolution < 2 {
            return Err(invalid("sim_resolution", "must be at least 2"));
        }
        if self.dye_resolution < 2 {
            return Err(invalid("dye_resolution", "must be at least 2"));
        }
        let square = |n: usize| n.checked_mul(n).unwrap_or(usize::MAX);
        if self.max_grid_cells < square(self.sim_resolution.max(self.dye_resolution)) {
            return Err(invalid("max_grid_cells", "must fit a square grid at both resolutions"));
        }
        if !(self.max_pixel_ratio > 0.0) {
            return Err(invalid("max_pixel_ratio", "must be positive"));
        }
        if !(self.dt > 0.0) {
            return Err(invalid("dt", "must be positive"));
        }
        for (field, value) in [
            ("velocity_dissipation", self.velocity_dissipation),
            ("dye_dissipation", self.dye_dissipation),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(invalid(field, "must be in (0, 1)"));
            }
        }
        if self.pressure_iterations == 0 {
            return Err(invalid("pressure_iterations", "must be at least 1"));
        }
        if !(self.curl_strength >= 0.0) {
            return Err(invalid("curl_strength", "must not be negative"));
        }
        if !(self.splat_radius > 0.0) {
            return Err(invalid("splat_radius", "must be positive"));
        }
        if !(self.dye_radius_scale > 0.0) {
            return Err(invalid("dye_radius_scale", "must be positive"));
        }
        if self.palette.is_empty() {
            return Err(invalid("palette", "needs at least one color"));
        }
        if let ColorCycle::Timed { period_frames: 0 } = self.color_cycle {
            return Err(invalid("color_cycle", "period_frames must be at least 1"));
        }
        self.tone.validate()?;
        Ok(())
    }
}
