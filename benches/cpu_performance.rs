use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fluidcursor::{
    BlendMode, Compositor, Filtering, FluidConfig, FluidSolver, GridSize, Overlay, Precision,
    RenderFormat, SolverParams, ToneMapping,
};
use glam::Vec2;

fn stirred_solver(sim: usize, dye: usize) -> FluidSolver {
    let config = FluidConfig::default();
    let mut solver = FluidSolver::new(
        GridSize::new(sim, sim),
        GridSize::new(dye, dye),
        SolverParams::from(&config),
        RenderFormat {
            precision: Precision::Float32,
            filtering: Filtering::Linear,
        },
    );

    // A few strokes across the middle to get realistic state
    for i in 0..5 {
        let point = Vec2::new(0.3 + i as f32 * 0.1, 0.5);
        fluidcursor::splat::splat(
            &mut solver.velocity,
            point,
            config.splat_radius,
            [10.0, 4.0, 0.0],
            None,
        );
        fluidcursor::splat::splat(
            &mut solver.dye,
            point,
            config.splat_radius * config.dye_radius_scale,
            [1.35, 0.4, 0.9],
            Some(config.coverage_gain),
        );
        solver.step();
    }
    solver
}

fn benchmark_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_step");

    for &(sim, dye) in [(64, 256), (128, 512)].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(sim), &(sim, dye), |b, &(sim, dye)| {
            let mut solver = stirred_solver(sim, dye);
            b.iter(|| {
                solver.step();
                black_box(&solver);
            });
        });
    }
    group.finish();
}

fn benchmark_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("operations");
    let solver = stirred_solver(128, 512);

    group.bench_function("relax_pressure", |b| {
        let mut solver = solver.clone();
        solver.compute_divergence();
        b.iter(|| {
            solver.relax_pressure();
            black_box(&solver.pressure);
        });
    });

    group.bench_function("advect_dye", |b| {
        let mut solver = solver.clone();
        b.iter(|| {
            solver.advect_dye();
            black_box(&solver.dye);
        });
    });

    group.bench_function("render_overlay", |b| {
        let compositor = Compositor::new(ToneMapping::default(), BlendMode::Screen);
        let mut overlay = Overlay::new(512, 512);
        b.iter(|| {
            compositor.render_overlay(solver.dye.read(), &mut overlay);
            black_box(&overlay);
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_step, benchmark_operations);
criterion_main!(benches);
