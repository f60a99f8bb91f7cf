use fluidcursor::{
    BlendMode, ColorCycle, EngineError, FluidConfig, FluidEngine, HeadlessSurface,
    HostPreferences, PlatformCapabilities, MOUSE_POINTER_ID,
};
use image::{Rgba, RgbaImage};

fn config() -> FluidConfig {
    FluidConfig {
        sim_resolution: 16,
        dye_resolution: 32,
        ..FluidConfig::default()
    }
}

fn running(width: f32, height: f32) -> FluidEngine<HeadlessSurface> {
    let mut engine = FluidEngine::new(config()).unwrap();
    engine
        .start(HeadlessSurface::new(width, height), HostPreferences::default())
        .unwrap();
    engine
}

#[test]
fn test_mouse_trail_shows_up_in_overlay() {
    let mut engine = running(200.0, 100.0);
    engine.on_pointer_move(MOUSE_POINTER_ID, 90.0, 50.0, true).unwrap();
    engine.on_pointer_move(MOUSE_POINTER_ID, 110.0, 50.0, true).unwrap();

    let overlay = engine.frame().unwrap();
    assert_eq!((overlay.width, overlay.height), (64, 32));
    assert!(!overlay.is_blank());
    assert_eq!(overlay.pixel(0, 0), [0; 4]);
    assert_eq!(overlay.pixel(63, 31), [0; 4]);
}

#[test]
fn test_no_input_renders_transparent_frames() {
    let mut engine = running(120.0, 80.0);
    for _ in 0..5 {
        assert!(engine.frame().unwrap().is_blank());
    }
}

#[test]
fn test_overlay_fades_after_pointer_stops() {
    let mut engine = running(100.0, 100.0);
    engine.on_pointer_move(2, 50.0, 50.0, true).unwrap();
    engine.frame().unwrap();
    let early = engine.solver().unwrap().dye.read().channel_sum(3);
    for _ in 0..200 {
        engine.frame().unwrap();
    }
    let late = engine.solver().unwrap().dye.read().channel_sum(3);
    assert!(late < early * 0.5);
}

#[test]
fn test_touch_contacts_are_tracked_separately() {
    let mut engine = running(100.0, 100.0);
    engine.on_pointer_move(0, 20.0, 20.0, true).unwrap();
    engine.on_pointer_move(1, 80.0, 80.0, true).unwrap();
    assert_eq!(engine.pointers().unwrap().len(), 2);

    engine.on_pointer_end(0).unwrap();
    assert_eq!(engine.pointers().unwrap().len(), 1);
    assert!(engine.pointers().unwrap().get(1).is_some());
}

#[test]
fn test_timed_color_cycle_from_config() {
    let mut engine = FluidEngine::new(FluidConfig {
        color_cycle: ColorCycle::Timed { period_frames: 100 },
        ..config()
    })
    .unwrap();
    engine
        .start(HeadlessSurface::new(100.0, 100.0), HostPreferences::default())
        .unwrap();

    engine.on_pointer_move(1, 10.0, 10.0, true).unwrap();
    let first = engine.pointers().unwrap().get(1).unwrap().color;
    engine.on_pointer_move(1, 20.0, 10.0, true).unwrap();
    assert_eq!(engine.pointers().unwrap().get(1).unwrap().color, first);
}

#[test]
fn test_resize_to_new_aspect_reallocates() {
    let mut engine = running(100.0, 100.0);
    engine.on_pointer_move(1, 50.0, 50.0, true).unwrap();
    engine.frame().unwrap();
    assert!(engine.solver().unwrap().dye.read().channel_sum(3) > 0.0);

    engine.surface_mut().unwrap().resize(300.0, 100.0);
    engine.on_resize().unwrap();
    let solver = engine.solver().unwrap();
    assert_eq!(solver.sim_size().width, 48);
    assert_eq!(solver.dye_size().width, 96);
    assert_eq!(solver.dye.read().channel_sum(3), 0.0);

    let overlay = engine.frame().unwrap();
    assert_eq!((overlay.width, overlay.height), (96, 32));
}

#[test]
fn test_collapsed_surface_keeps_previous_layout() {
    let mut engine = running(100.0, 100.0);
    engine.surface_mut().unwrap().resize(0.0, 0.0);
    assert!(matches!(
        engine.on_resize(),
        Err(EngineError::InvalidSurface { .. })
    ));
    assert_eq!(engine.layout().unwrap().physical_width, 100);
    assert!(engine.frame().is_ok());
}

#[test]
fn test_extreme_strip_never_starts() {
    let mut engine = FluidEngine::new(FluidConfig::default()).unwrap();
    assert!(matches!(
        engine.start(HeadlessSurface::new(1920.0, 2.0), HostPreferences::default()),
        Err(EngineError::InvalidSurface { .. })
    ));
    assert!(engine.solver().is_none());
    assert!(!engine.try_start(HeadlessSurface::new(1920.0, 2.0), HostPreferences::default()));
}

#[test]
fn test_resize_to_extreme_strip_keeps_previous_layout() {
    let mut engine = running(100.0, 100.0);
    engine.surface_mut().unwrap().resize(100_000.0, 10.0);
    assert!(matches!(
        engine.on_resize(),
        Err(EngineError::InvalidSurface { .. })
    ));
    assert_eq!(engine.solver().unwrap().dye_size().width, 32);
}

#[test]
fn test_platform_without_context_never_starts() {
    let mut engine: FluidEngine<HeadlessSurface> = FluidEngine::new(config()).unwrap();
    let surface =
        HeadlessSurface::new(100.0, 100.0).with_capabilities(PlatformCapabilities::none());
    assert_eq!(
        engine.start(surface, HostPreferences::default()),
        Err(EngineError::NoRenderingContext)
    );
    assert!(engine.layout().is_none());
    assert!(engine.overlay().is_none());
}

#[test]
fn test_platform_without_float_storage_never_starts() {
    let mut engine: FluidEngine<HeadlessSurface> = FluidEngine::new(config()).unwrap();
    let surface = HeadlessSurface::new(100.0, 100.0).with_capabilities(PlatformCapabilities {
        rendering_context: true,
        ..PlatformCapabilities::none()
    });
    assert!(matches!(
        engine.start(surface, HostPreferences::default()),
        Err(EngineError::UnsupportedPlatform { .. })
    ));
    assert!(!engine.is_running());
}

#[test]
fn test_half_float_platform_runs_with_nearest_filtering() {
    let mut engine: FluidEngine<HeadlessSurface> = FluidEngine::new(config()).unwrap();
    let surface = HeadlessSurface::new(100.0, 100.0).with_capabilities(PlatformCapabilities {
        rendering_context: true,
        float16_storage: true,
        ..PlatformCapabilities::none()
    });
    engine.start(surface, HostPreferences::default()).unwrap();
    let format = engine.format().unwrap();
    assert_eq!(format.precision, fluidcursor::Precision::Float16);
    assert_eq!(format.filtering, fluidcursor::Filtering::Nearest);

    engine.on_pointer_move(1, 50.0, 50.0, true).unwrap();
    assert!(!engine.frame().unwrap().is_blank());
}

#[test]
fn test_composite_preserves_page_outside_dye() {
    let mut engine = FluidEngine::new(FluidConfig {
        blend: BlendMode::Lighten,
        ..config()
    })
    .unwrap();
    engine
        .start(HeadlessSurface::new(100.0, 100.0), HostPreferences::default())
        .unwrap();
    engine.on_pointer_move(1, 50.0, 50.0, true).unwrap();
    engine.frame().unwrap();

    let page = Rgba([30, 30, 40, 255]);
    let mut image = RgbaImage::from_pixel(100, 100, page);
    engine.composite_onto(&mut image).unwrap();
    assert_eq!(image.get_pixel(0, 0), &page);
    assert_eq!(image.get_pixel(99, 99), &page);
    assert_ne!(image.get_pixel(50, 50), &page);
}

#[test]
fn test_stop_releases_everything() {
    let mut engine = running(100.0, 100.0);
    engine.on_pointer_move(1, 50.0, 50.0, true).unwrap();
    engine.frame().unwrap();
    engine.stop();

    assert!(engine.solver().is_none());
    assert!(engine.pointers().is_none());
    assert!(engine.surface().is_none());
    assert_eq!(engine.frames(), 0);
    let mut image = RgbaImage::new(4, 4);
    assert_eq!(engine.composite_onto(&mut image), Err(EngineError::NotRunning));
    assert_eq!(engine.on_resize(), Err(EngineError::NotRunning));
}

#[test]
fn test_config_file_round_trip_through_disk() {
    let path = std::env::temp_dir().join(format!("fluidcursor-config-{}.json", std::process::id()));
    let config = FluidConfig {
        curl_strength: 30.0,
        blend: BlendMode::Additive,
        ..config()
    };
    std::fs::write(&path, config.to_json_string().unwrap()).unwrap();
    let loaded = FluidConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.curl_strength, 30.0);
    assert_eq!(loaded.blend, BlendMode::Additive);
    assert_eq!(loaded.sim_resolution, 16);
}

#[test]
fn test_missing_config_file_is_a_load_error() {
    let result = FluidConfig::load(std::path::Path::new("/nonexistent/fluidcursor.json"));
    assert!(matches!(result, Err(EngineError::ConfigLoad(_))));
}
