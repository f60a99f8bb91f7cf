#[cfg(not(target_arch = "wasm32"))]
use fluidcursor::{
    AnalysisRecorder, Compositor, DesktopApp, FluidConfig, FluidEngine, HeadlessSurface,
    HostPreferences, ImageExporter, MOUSE_POINTER_ID,
};
#[cfg(not(target_arch = "wasm32"))]
use rand::{rngs::StdRng, Rng, SeedableRng};
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

#[cfg(not(target_arch = "wasm32"))]
struct Options {
    headless: bool,
    frames: usize,
    config: Option<PathBuf>,
    out_dir: PathBuf,
    reduced_motion: bool,
}

#[cfg(not(target_arch = "wasm32"))]
fn parse_args() -> Result<Options, Box<dyn std::error::Error>> {
    let mut options = Options {
        headless: false,
        frames: 120,
        config: None,
        out_dir: PathBuf::from("."),
        reduced_motion: false,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "test" => options.headless = true,
            "--frames" => {
                options.frames = args.next().ok_or("--frames needs a value")?.parse()?;
            }
            "--config" => {
                options.config = Some(args.next().ok_or("--config needs a path")?.into());
            }
            "--out" => {
                options.out_dir = args.next().ok_or("--out needs a directory")?.into();
            }
            "--reduced-motion" => options.reduced_motion = true,
            other => return Err(format!("unknown argument: {}", other).into()),
        }
    }
    Ok(options)
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = parse_args()?;
    let config = match &options.config {
        Some(path) => FluidConfig::load(path)?,
        None => FluidConfig::default(),
    };

    if options.headless {
        run_headless_test(config, &options)?;
    } else {
        run_gui_app(
            config,
            HostPreferences {
                reduced_motion: options.reduced_motion,
            },
        )?;
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}

/// Drags a mouse along a jittered figure-eight and records what the fluid
/// does with it.
#[cfg(not(target_arch = "wasm32"))]
fn run_headless_test(
    config: FluidConfig,
    options: &Options,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Running headless fluid cursor test for {} frames...", options.frames);

    let (width, height) = (800.0, 600.0);
    let mut engine = FluidEngine::new(config)?;
    engine.start(HeadlessSurface::new(width, height), HostPreferences::default())?;

    let mut recorder = AnalysisRecorder::new();
    let mut rng = StdRng::seed_from_u64(7);
    std::fs::create_dir_all(&options.out_dir)?;

    for frame in 0..options.frames {
        let t = frame as f32 * 0.05;
        let x = width * (0.5 + 0.35 * t.sin()) + rng.gen_range(-3.0..3.0);
        let y = height * (0.5 + 0.3 * (2.0 * t).sin()) + rng.gen_range(-3.0..3.0);
        engine.on_pointer_move(MOUSE_POINTER_ID, x, y, true)?;
        engine.frame()?;

        if let Some(solver) = engine.solver() {
            let metrics = recorder.record_frame(solver, frame);
            if frame % 20 == 0 {
                metrics.print_summary();
            }
        }

        if frame % 10 == 0 {
            export_frame(&engine, frame, &options.out_dir)?;
        }
    }

    recorder.print_trends();
    engine.stop();

    println!(
        "Test completed! {} frames simulated, snapshots written to {}",
        options.frames,
        options.out_dir.display()
    );
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn export_frame(
    engine: &FluidEngine<HeadlessSurface>,
    frame: usize,
    out_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(solver), Some(format), Some(layout)) =
        (engine.solver(), engine.format(), engine.layout())
    else {
        return Ok(());
    };
    let config = engine.config();
    let exporter = ImageExporter::new(
        Compositor::new(config.tone, config.blend),
        layout.physical_width,
        layout.physical_height,
    );
    exporter.export_png(
        solver.dye.read(),
        format.filtering,
        &out_dir.join(format!("test_frame_{:04}.png", frame)),
    )?;
    exporter.export_velocity_png(
        solver.velocity.read(),
        0.02,
        &out_dir.join(format!("test_velocity_{:04}.png", frame)),
    )?;
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn run_gui_app(
    config: FluidConfig,
    prefs: HostPreferences,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = DesktopApp::new(config, prefs)?;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 640.0])
            .with_title("fluidcursor"),
        ..Default::default()
    };

    eframe::run_native("fluidcursor", options, Box::new(move |_cc| Box::new(app)))?;
    Ok(())
}
