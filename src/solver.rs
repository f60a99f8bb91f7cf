use crate::capability::{Filtering, RenderFormat};
use crate::config::FluidConfig;
use crate::field::{DoubleField, Field, GridSize};
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    pub dt: f32,
    pub velocity_dissipation: f32,
    pub dye_dissipation: f32,
    pub pressure_iterations: usize,
    pub curl_strength: f32,
}

impl From<&FluidConfig> for SolverParams {
    fn from(config: &FluidConfig) -> Self {
        Self {
            dt: config.dt,
            velocity_dissipation: config.velocity_dissipation,
            dye_dissipation: config.dye_dissipation,
            pressure_iterations: config.pressure_iterations,
            curl_strength: config.curl_strength,
        }
    }
}

/// Stable-fluids solver on a coarse velocity grid carrying a finer dye grid.
///
/// Velocities are in velocity-grid cells per unit time. Every neighbor read
/// clamps to the edge of its grid.
#[derive(Debug, Clone)]
pub struct FluidSolver {
    pub velocity: DoubleField,
    pub dye: DoubleField,
    pub pressure: DoubleField,
    pub divergence: Field,
    pub curl: Field,
    pub params: SolverParams,
    pub filtering: Filtering,
}

impl FluidSolver {
    pub fn new(sim: GridSize, dye: GridSize, params: SolverParams, format: RenderFormat) -> Self {
        Self {
            velocity: DoubleField::new(sim, 2),
            dye: DoubleField::new(dye, 4),
            pressure: DoubleField::new(sim, 1),
            divergence: Field::new(sim, 1),
            curl: Field::new(sim, 1),
            params,
            filtering: format.filtering,
        }
    }

    pub fn sim_size(&self) -> GridSize {
        self.velocity.size()
    }

    pub fn dye_size(&self) -> GridSize {
        self.dye.size()
    }

    /// One full step. Runs whether or not anything was splatted so existing
    /// motion keeps moving and fading.
    pub fn step(&mut self) {
        self.compute_curl();
        self.apply_vorticity();
        self.compute_divergence();
        self.relax_pressure();
        self.subtract_pressure_gradient();
        self.advect_velocity();
        self.advect_dye();
    }

    pub fn compute_curl(&mut self) {
        let velocity = self.velocity.read();
        self.curl.for_each_row_mut(|y, row| {
            let y = y as isize;
            for (x, out) in row.iter_mut().enumerate() {
                let x = x as isize;
                let l = velocity.fetch(x - 1, y, 1);
                let r = velocity.fetch(x + 1, y, 1);
                let b = velocity.fetch(x, y - 1, 0);
                let t = velocity.fetch(x, y + 1, 0);
                *out = r - l - t + b;
            }
        });
    }

    /// Vorticity confinement: pushes flow up the gradient of |curl|, scaled
    /// by the local curl, returning rotation that coarse advection smears away.
    pub fn apply_vorticity(&mut self) {
        let SolverParams {
            dt, curl_strength, ..
        } = self.params;
        let curl = &self.curl;
        let (read, write) = self.velocity.read_write();

        write.for_each_row_mut(|y, row| {
            let yi = y as isize;
            for (x, out) in row.chunks_exact_mut(2).enumerate() {
                let xi = x as isize;
                let l = curl.fetch(xi - 1, yi, 0).abs();
                let r = curl.fetch(xi + 1, yi, 0).abs();
                let b = curl.fetch(xi, yi - 1, 0).abs();
                let t = curl.fetch(xi, yi + 1, 0).abs();
                let c = curl.get(x, y, 0);

                let mut force = 0.5 * Vec2::new(r - l, t - b);
                force /= force.length() + 1e-5;
                force *= curl_strength * c;

                out[0] = read.get(x, y, 0) + force.x * dt;
                out[1] = read.get(x, y, 1) + force.y * dt;
            }
        });
        self.velocity.swap();
    }

    pub fn compute_divergence(&mut self) {
        let velocity = self.velocity.read();
        self.divergence.for_each_row_mut(|y, row| {
            let y = y as isize;
            for (x, out) in row.iter_mut().enumerate() {
                let x = x as isize;
                let l = velocity.fetch(x - 1, y, 0);
                let r = velocity.fetch(x + 1, y, 0);
                let b = velocity.fetch(x, y - 1, 1);
                let t = velocity.fetch(x, y + 1, 1);
                *out = 0.5 * (r - l + t - b);
            }
        });
    }

    /// Jacobi iterations on the pressure Poisson equation, starting from last
    /// frame's pressure.
    pub fn relax_pressure(&mut self) {
        for _ in 0..self.params.pressure_iterations {
            let divergence = &self.divergence;
            let (read, write) = self.pressure.read_write();
            write.for_each_row_mut(|y, row| {
                let yi = y as isize;
                for (x, out) in row.iter_mut().enumerate() {
                    let xi = x as isize;
                    let l = read.fetch(xi - 1, yi, 0);
                    let r = read.fetch(xi + 1, yi, 0);
                    let b = read.fetch(xi, yi - 1, 0);
                    let t = read.fetch(xi, yi + 1, 0);
                    *out = (l + r + b + t - divergence.get(x, y, 0)) * 0.25;
                }
            });
            self.pressure.swap();
        }
    }

    pub fn subtract_pressure_gradient(&mut self) {
        let pressure = self.pressure.read();
        let (read, write) = self.velocity.read_write();
        write.for_each_row_mut(|y, row| {
            let yi = y as isize;
            for (x, out) in row.chunks_exact_mut(2).enumerate() {
                let xi = x as isize;
                let l = pressure.fetch(xi - 1, yi, 0);
                let r = pressure.fetch(xi + 1, yi, 0);
                let b = pressure.fetch(xi, yi - 1, 0);
                let t = pressure.fetch(xi, yi + 1, 0);
                out[0] = read.get(x, y, 0) - 0.5 * (r - l);
                out[1] = read.get(x, y, 1) - 0.5 * (t - b);
            }
        });
        self.velocity.swap();
    }

    pub fn advect_velocity(&mut self) {
        let SolverParams {
            dt,
            velocity_dissipation,
            ..
        } = self.params;
        let filtering = self.filtering;
        let (read, write) = self.velocity.read_write();
        let texel = read.texel_size();

        write.for_each_row_mut(|y, row| {
            for (x, out) in row.chunks_exact_mut(2).enumerate() {
                let vel = Vec2::new(read.get(x, y, 0), read.get(x, y, 1));
                let coord = read.cell_uv(x, y) - dt * vel * texel;
                let s = read.sample(coord, filtering);
                out[0] = s[0] * velocity_dissipation;
                out[1] = s[1] * velocity_dissipation;
            }
        });
        self.velocity.swap();
    }

    /// Same backtrace as velocity, at dye resolution. The trace distance is
    /// measured in velocity-grid cells, so dye and flow move together.
    pub fn advect_dye(&mut self) {
        let SolverParams {
            dt,
            dye_dissipation,
            ..
        } = self.params;
        let filtering = self.filtering;
        let velocity = self.velocity.read();
        let texel = velocity.texel_size();
        let (read, write) = self.dye.read_write();

        write.for_each_row_mut(|y, row| {
            for (x, out) in row.chunks_exact_mut(4).enumerate() {
                let uv = read.cell_uv(x, y);
                let v = velocity.sample(uv, filtering);
                let coord = uv - dt * Vec2::new(v[0], v[1]) * texel;
                let s = read.sample(coord, filtering);
                for c in 0..4 {
                    out[c] = s[c] * dye_dissipation;
                }
            }
        });
        self.dye.swap();
    }
}
