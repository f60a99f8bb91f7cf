use crate::field::Field;
use crate::solver::FluidSolver;

/// Mean absolute central-difference divergence of a 2-channel field.
pub fn mean_abs_divergence(velocity: &Field) -> f32 {
    let mut total = 0.0;
    for y in 0..velocity.height as isize {
        for x in 0..velocity.width as isize {
            let div = 0.5
                * (velocity.fetch(x + 1, y, 0) - velocity.fetch(x - 1, y, 0)
                    + velocity.fetch(x, y + 1, 1)
                    - velocity.fetch(x, y - 1, 1));
            total += div.abs();
        }
    }
    total / (velocity.width * velocity.height) as f32
}

/// Sum of per-cell velocity magnitudes.
pub fn total_velocity(velocity: &Field) -> f32 {
    velocity
        .data
        .chunks_exact(2)
        .map(|v| (v[0] * v[0] + v[1] * v[1]).sqrt())
        .sum()
}

#[derive(Debug, Clone)]
pub struct FluidMetrics {
    pub total_velocity: f32,
    pub max_velocity: f32,
    pub kinetic_energy: f32,
    pub mean_abs_divergence: f32,
    pub mean_abs_curl: f32,
    pub total_coverage: f32,
    pub max_dye_intensity: f32,
    pub frame: usize,
}

impl FluidMetrics {
    pub fn analyze(solver: &FluidSolver, frame: usize) -> Self {
        let velocity = solver.velocity.read();
        let dye = solver.dye.read();

        let mut max_velocity: f32 = 0.0;
        let mut kinetic_energy = 0.0;
        let mut total_curl = 0.0;
        for y in 0..velocity.height as isize {
            for x in 0..velocity.width as isize {
                let vx = velocity.get(x as usize, y as usize, 0);
                let vy = velocity.get(x as usize, y as usize, 1);
                let speed_sq = vx * vx + vy * vy;
                max_velocity = max_velocity.max(speed_sq.sqrt());
                kinetic_energy += 0.5 * speed_sq;

                let curl = velocity.fetch(x + 1, y, 1) - velocity.fetch(x - 1, y, 1)
                    - velocity.fetch(x, y + 1, 0)
                    + velocity.fetch(x, y - 1, 0);
                total_curl += curl.abs();
            }
        }

        let max_dye_intensity = dye
            .data
            .chunks_exact(4)
            .map(|t| t[0].max(t[1]).max(t[2]))
            .fold(0.0f32, f32::max);

        Self {
            total_velocity: total_velocity(velocity),
            max_velocity,
            kinetic_energy,
            mean_abs_divergence: mean_abs_divergence(velocity),
            mean_abs_curl: total_curl / (velocity.width * velocity.height) as f32,
            total_coverage: dye.channel_sum(3),
            max_dye_intensity,
            frame,
        }
    }

    pub fn print_summary(&self) {
        println!("Frame {} Metrics:", self.frame);
        println!("  Total Velocity: {:.6}", self.total_velocity);
        println!("  Max Velocity: {:.6}", self.max_velocity);
        println!("  Kinetic Energy: {:.6}", self.kinetic_energy);
        println!("  Mean |Divergence|: {:.6}", self.mean_abs_divergence);
        println!("  Mean |Curl|: {:.6}", self.mean_abs_curl);
        println!("  Dye Coverage: {:.6}", self.total_coverage);
        println!("  Max Dye Intensity: {:.6}", self.max_dye_intensity);
        println!();
    }
}

#[derive(Debug, Default)]
pub struct AnalysisRecorder {
    pub metrics_history: Vec<FluidMetrics>,
}

impl AnalysisRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, solver: &FluidSolver, frame: usize) -> &FluidMetrics {
        self.metrics_history.push(FluidMetrics::analyze(solver, frame));
        &self.metrics_history[self.metrics_history.len() - 1]
    }

    pub fn print_trends(&self) {
        let (Some(first), Some(last)) = (self.metrics_history.first(), self.metrics_history.last())
        else {
            return;
        };
        if self.metrics_history.len() < 2 {
            return;
        }

        println!("=== TREND ANALYSIS ===");
        println!(
            "Coverage change: {:.6} -> {:.6} ({:+.3}%)",
            first.total_coverage,
            last.total_coverage,
            percent_change(first.total_coverage, last.total_coverage)
        );
        println!(
            "Kinetic Energy change: {:.6} -> {:.6} ({:+.3}%)",
            first.kinetic_energy,
            last.kinetic_energy,
            percent_change(first.kinetic_energy, last.kinetic_energy)
        );
        println!(
            "Divergence change: {:.6} -> {:.6} ({:+.3}%)",
            first.mean_abs_divergence,
            last.mean_abs_divergence,
            percent_change(first.mean_abs_divergence, last.mean_abs_divergence)
        );
    }
}

fn percent_change(from: f32, to: f32) -> f32 {
    (to - from) / from.max(0.001) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::GridSize;

    #[test]
    fn test_uniform_flow_is_divergence_free() {
        let mut field = Field::new(GridSize::new(6, 6), 2);
        field.fill(2.0);
        assert_eq!(mean_abs_divergence(&field), 0.0);
        assert!((total_velocity(&field) - 36.0 * 8.0f32.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn test_source_has_divergence() {
        let mut field = Field::new(GridSize::new(5, 5), 2);
        field.set(3, 2, 0, 1.0);
        field.set(1, 2, 0, -1.0);
        assert!(mean_abs_divergence(&field) > 0.0);
    }

    #[test]
    fn test_recorder_keeps_history() {
        use crate::capability::{Filtering, Precision, RenderFormat};
        use crate::config::FluidConfig;
        use crate::solver::SolverParams;

        let solver = FluidSolver::new(
            GridSize::new(8, 8),
            GridSize::new(8, 8),
            SolverParams::from(&FluidConfig::default()),
            RenderFormat {
                precision: Precision::Float32,
                filtering: Filtering::Linear,
            },
        );
        let mut recorder = AnalysisRecorder::new();
        recorder.record_frame(&solver, 0);
        let metrics = recorder.record_frame(&solver, 1);
        assert_eq!(metrics.frame, 1);
        assert_eq!(recorder.metrics_history.len(), 2);
        recorder.print_trends();
    }
}
