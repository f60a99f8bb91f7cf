//! Pointer motion to field impulses.

use crate::config::FluidConfig;
use crate::field::DoubleField;
use crate::pointer::PointerTracker;
use crate::solver::FluidSolver;
use glam::Vec2;

/// Beyond `radius * SPLAT_CUTOFF` squared distance the Gaussian is below
/// 1.6e-8 and the cell is left untouched.
const SPLAT_CUTOFF: f32 = 18.0;

/// Adds a Gaussian impulse centered at `point` into every channel of
/// `field`. The x distance is scaled by the grid aspect so the splat is
/// round on screen. With `coverage_gain`, channel 3 additionally rises by
/// `influence * gain`, saturating at 1.
pub fn splat(
    field: &mut DoubleField,
    point: Vec2,
    radius: f32,
    value: [f32; 3],
    coverage_gain: Option<f32>,
) {
    let (read, write) = field.read_write();
    let aspect = read.width as f32 / read.height as f32;
    let channels = read.channels;
    let cutoff = radius * SPLAT_CUTOFF;

    write.for_each_row_mut(|y, row| {
        for (x, out) in row.chunks_exact_mut(channels).enumerate() {
            let base = read.texel(x, y);
            let mut p = read.cell_uv(x, y) - point;
            p.x *= aspect;
            let d = p.dot(p);
            let influence = if d > cutoff { 0.0 } else { (-d / radius).exp() };

            for c in 0..channels.min(3) {
                out[c] = base[c] + value[c] * influence;
            }
            if channels == 4 {
                out[3] = match coverage_gain {
                    Some(gain) => (base[3] + influence * gain).min(1.0),
                    None => base[3],
                };
            }
        }
    });
    field.swap();
}

/// Writes one velocity splat and one dye splat for every pressed pointer
/// that moved since the last frame, then clears its `moved` flag.
/// Returns how many pointers splatted.
pub fn inject(
    pointers: &mut PointerTracker,
    solver: &mut FluidSolver,
    config: &FluidConfig,
) -> usize {
    let mut count = 0;
    for pointer in pointers.iter_mut() {
        if !pointer.pressed || !pointer.moved {
            continue;
        }
        pointer.moved = false;

        let force = pointer.delta * config.splat_force;
        splat(
            &mut solver.velocity,
            pointer.position,
            config.splat_radius,
            [force.x, force.y, 0.0],
            None,
        );

        let color = pointer.color.map(|c| c * config.dye_boost);
        splat(
            &mut solver.dye,
            pointer.position,
            config.splat_radius * config.dye_radius_scale,
            color,
            Some(config.coverage_gain),
        );
        count += 1;
    }
    count
}
