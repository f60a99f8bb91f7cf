//! Owned-resource lifecycle around the solver: start, feed pointers, render
//! frames, resize, stop.

use crate::capability::{negotiate, RenderFormat};
use crate::compositor::{Compositor, Overlay};
use crate::config::FluidConfig;
use crate::error::EngineError;
use crate::pointer::{PointerId, PointerTracker};
use crate::solver::{FluidSolver, SolverParams};
use crate::splat;
use crate::surface::{SurfaceHandle, SurfaceLayout, SurfaceManager, SurfaceRect};
use image::RgbaImage;

/// Preferences the host page passes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostPreferences {
    pub reduced_motion: bool,
}

struct Running<S> {
    surface: S,
    rect: SurfaceRect,
    layout: SurfaceLayout,
    format: RenderFormat,
    solver: FluidSolver,
    pointers: PointerTracker,
    overlay: Overlay,
    frames: u64,
}

enum EngineState<S> {
    Idle,
    Running(Box<Running<S>>),
    Stopped,
}

pub struct FluidEngine<S: SurfaceHandle> {
    config: FluidConfig,
    surfaces: SurfaceManager,
    compositor: Compositor,
    state: EngineState<S>,
}

impl<S: SurfaceHandle> FluidEngine<S> {
    pub fn new(config: FluidConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            surfaces: SurfaceManager::new(&config),
            compositor: Compositor::new(config.tone, config.blend),
            config,
            state: EngineState::Idle,
        })
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Acquires the surface and allocates every field. Nothing is kept if
    /// any step fails.
    pub fn start(&mut self, surface: S, prefs: HostPreferences) -> Result<(), EngineError> {
        match self.state {
            EngineState::Idle => {}
            EngineState::Running(_) => return Err(EngineError::AlreadyRunning),
            EngineState::Stopped => return Err(EngineError::TornDown),
        }
        if prefs.reduced_motion {
            return Err(EngineError::ReducedMotion);
        }

        let format = negotiate(&surface.capabilities())?;
        let viewport = surface.viewport();
        let layout =
            self.surfaces
                .configure(viewport.width, viewport.height, viewport.device_pixel_ratio)?;

        let solver = FluidSolver::new(
            layout.sim,
            layout.dye,
            SolverParams::from(&self.config),
            format,
        );
        let overlay = Overlay::new(layout.dye.width, layout.dye.height);
        let pointers = PointerTracker::new(self.config.palette.clone(), self.config.color_cycle);

        log::info!(
            "fluid engine started: {}x{} physical, sim {}x{}, dye {}x{}, {:?}",
            layout.physical_width,
            layout.physical_height,
            layout.sim.width,
            layout.sim.height,
            layout.dye.width,
            layout.dye.height,
            format
        );

        self.state = EngineState::Running(Box::new(Running {
            rect: surface.bounding_rect(),
            surface,
            layout,
            format,
            solver,
            pointers,
            overlay,
            frames: 0,
        }));
        Ok(())
    }

    /// Like `start`, but any failure only leaves the effect off.
    pub fn try_start(&mut self, surface: S, prefs: HostPreferences) -> bool {
        match self.start(surface, prefs) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("fluid effect disabled: {}", e);
                false
            }
        }
    }

    fn running(&self) -> Result<&Running<S>, EngineError> {
        match &self.state {
            EngineState::Running(running) => Ok(&**running),
            _ => Err(EngineError::NotRunning),
        }
    }

    fn running_mut(&mut self) -> Result<&mut Running<S>, EngineError> {
        match &mut self.state {
            EngineState::Running(running) => Ok(&mut **running),
            _ => Err(EngineError::NotRunning),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, EngineState::Running(_))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.state, EngineState::Stopped)
    }

    pub fn surface(&self) -> Option<&S> {
        self.running().ok().map(|r| &r.surface)
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.running_mut().ok().map(|r| &mut r.surface)
    }

    pub fn layout(&self) -> Option<&SurfaceLayout> {
        self.running().ok().map(|r| &r.layout)
    }

    pub fn format(&self) -> Option<RenderFormat> {
        self.running().ok().map(|r| r.format)
    }

    pub fn solver(&self) -> Option<&FluidSolver> {
        self.running().ok().map(|r| &r.solver)
    }

    pub fn solver_mut(&mut self) -> Option<&mut FluidSolver> {
        self.running_mut().ok().map(|r| &mut r.solver)
    }

    pub fn pointers(&self) -> Option<&PointerTracker> {
        self.running().ok().map(|r| &r.pointers)
    }

    pub fn frames(&self) -> u64 {
        self.running().map(|r| r.frames).unwrap_or(0)
    }

    /// Re-reads the surface. All fields are reallocated together when either
    /// grid changed; otherwise simulation state is kept.
    pub fn on_resize(&mut self) -> Result<(), EngineError> {
        let surfaces = self.surfaces;
        let params = SolverParams::from(&self.config);
        let running = self.running_mut()?;

        let viewport = running.surface.viewport();
        let layout =
            surfaces.configure(viewport.width, viewport.height, viewport.device_pixel_ratio)?;
        running.rect = running.surface.bounding_rect();

        if !layout.grids_match(&running.layout) {
            log::info!(
                "surface resized to {}x{}: sim {}x{}, dye {}x{}",
                viewport.width,
                viewport.height,
                layout.sim.width,
                layout.sim.height,
                layout.dye.width,
                layout.dye.height
            );
            running.solver = FluidSolver::new(layout.sim, layout.dye, params, running.format);
            running.overlay = Overlay::new(layout.dye.width, layout.dye.height);
        }
        running.layout = layout;
        Ok(())
    }

    /// Feeds one contact event in client coordinates.
    pub fn on_pointer_move(
        &mut self,
        id: PointerId,
        client_x: f32,
        client_y: f32,
        pressed: bool,
    ) -> Result<(), EngineError> {
        let running = self.running_mut()?;
        if let Some(position) = running.rect.normalize(client_x, client_y) {
            running.pointers.update(id, position, pressed);
        }
        Ok(())
    }

    pub fn on_pointer_end(&mut self, id: PointerId) -> Result<(), EngineError> {
        let running = self.running_mut()?;
        running.pointers.end(id);
        Ok(())
    }

    /// Splats pending pointer motion, advances the solver one step and
    /// renders the overlay.
    pub fn frame(&mut self) -> Result<&Overlay, EngineError> {
        let running = match &mut self.state {
            EngineState::Running(running) => &mut **running,
            _ => return Err(EngineError::NotRunning),
        };

        running.pointers.tick();
        splat::inject(&mut running.pointers, &mut running.solver, &self.config);
        running.solver.step();
        self.compositor
            .render_overlay(running.solver.dye.read(), &mut running.overlay);
        running.frames += 1;
        Ok(&running.overlay)
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.running().ok().map(|r| &r.overlay)
    }

    /// Blends the current dye state over `background`, at its resolution.
    pub fn composite_onto(&self, background: &mut RgbaImage) -> Result<(), EngineError> {
        let running = self.running()?;
        self.compositor.composite_onto(
            running.solver.dye.read(),
            running.format.filtering,
            background,
        );
        Ok(())
    }

    /// Releases the surface, every field and all pointer state. Further
    /// frames fail with `NotRunning`.
    pub fn stop(&mut self) {
        let previous = std::mem::replace(&mut self.state, EngineState::Stopped);
        if let EngineState::Running(running) = previous {
            log::info!("fluid engine stopped after {} frames", running.frames);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::PlatformCapabilities;
    use crate::surface::HeadlessSurface;

    fn small_config() -> FluidConfig {
        FluidConfig {
            sim_resolution: 16,
            dye_resolution: 32,
            ..FluidConfig::default()
        }
    }

    fn engine() -> FluidEngine<HeadlessSurface> {
        FluidEngine::new(small_config()).unwrap()
    }

    #[test]
    fn test_start_allocates_fields() {
        let mut e = engine();
        e.start(HeadlessSurface::new(200.0, 100.0), HostPreferences::default())
            .unwrap();
        let solver = e.solver().unwrap();
        assert_eq!(solver.sim_size().width, 32);
        assert_eq!(solver.sim_size().height, 16);
        assert_eq!(solver.dye_size().width, 64);
    }

    #[test]
    fn test_reduced_motion_never_starts() {
        let mut e = engine();
        let result = e.start(
            HeadlessSurface::new(100.0, 100.0),
            HostPreferences {
                reduced_motion: true,
            },
        );
        assert_eq!(result, Err(EngineError::ReducedMotion));
        assert!(!e.is_running());
        assert!(e.frame().is_err());
    }

    #[test]
    fn test_unsupported_platform_degrades_silently() {
        let mut e = engine();
        let surface =
            HeadlessSurface::new(100.0, 100.0).with_capabilities(PlatformCapabilities::none());
        assert!(!e.try_start(surface, HostPreferences::default()));
        assert!(!e.is_running());
        assert!(e.solver().is_none());
    }

    #[test]
    fn test_double_start_is_rejected() {
        let mut e = engine();
        let surface = HeadlessSurface::new(100.0, 100.0);
        e.start(surface, HostPreferences::default()).unwrap();
        assert_eq!(
            e.start(surface, HostPreferences::default()),
            Err(EngineError::AlreadyRunning)
        );
    }

    #[test]
    fn test_stop_is_terminal() {
        let mut e = engine();
        let surface = HeadlessSurface::new(100.0, 100.0);
        e.start(surface, HostPreferences::default()).unwrap();
        e.frame().unwrap();
        e.stop();
        assert!(e.is_stopped());
        assert!(matches!(e.frame(), Err(EngineError::NotRunning)));
        assert!(e.on_pointer_move(1, 1.0, 1.0, true).is_err());
        assert_eq!(
            e.start(surface, HostPreferences::default()),
            Err(EngineError::TornDown)
        );
        e.stop();
    }

    #[test]
    fn test_resize_keeps_state_when_grids_unchanged() {
        let mut e = engine();
        e.start(HeadlessSurface::new(100.0, 100.0), HostPreferences::default())
            .unwrap();
        e.on_pointer_move(1, 50.0, 50.0, true).unwrap();
        e.frame().unwrap();

        e.surface_mut().unwrap().viewport.device_pixel_ratio = 2.0;
        e.on_resize().unwrap();
        assert_eq!(e.layout().unwrap().physical_width, 200);
        assert!(e.solver().unwrap().dye.read().channel_sum(3) > 0.0);
    }

    #[test]
    fn test_frame_counts_up() {
        let mut e = engine();
        e.start(HeadlessSurface::new(64.0, 64.0), HostPreferences::default())
            .unwrap();
        for _ in 0..3 {
            e.frame().unwrap();
        }
        assert_eq!(e.frames(), 3);
    }
}
