use crate::capability::PlatformCapabilities;
use crate::compositor::Compositor;
use crate::config::FluidConfig;
use crate::engine::{FluidEngine, HostPreferences};
use crate::error::EngineError;
use crate::export::ImageExporter;
use crate::pointer::{PointerId, MOUSE_POINTER_ID};
use crate::surface::{SurfaceHandle, SurfaceRect, Viewport};
use eframe::egui;
use std::path::Path;

const BURST_POINTER_ID: PointerId = -2;

/// The native window, seen as a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesktopSurface {
    viewport: Viewport,
    rect: SurfaceRect,
}

impl DesktopSurface {
    pub fn from_context(ctx: &egui::Context) -> Self {
        let screen = ctx.screen_rect();
        Self {
            viewport: Viewport::new(screen.width(), screen.height(), ctx.pixels_per_point()),
            rect: SurfaceRect::new(screen.left(), screen.top(), screen.width(), screen.height()),
        }
    }
}

impl SurfaceHandle for DesktopSurface {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities::cpu()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn bounding_rect(&self) -> SurfaceRect {
        self.rect
    }
}

pub struct DesktopApp {
    engine: FluidEngine<DesktopSurface>,
    prefs: HostPreferences,
    start_attempted: bool,
    texture: Option<egui::TextureHandle>,
    paused: bool,
    status: String,
}

impl DesktopApp {
    pub fn new(config: FluidConfig, prefs: HostPreferences) -> Result<Self, EngineError> {
        Ok(Self {
            engine: FluidEngine::new(config)?,
            prefs,
            start_attempted: false,
            texture: None,
            paused: false,
            status: String::new(),
        })
    }

    fn sync_surface(&mut self, ctx: &egui::Context) {
        let current = DesktopSurface::from_context(ctx);
        let Some(surface) = self.engine.surface_mut() else {
            return;
        };
        if *surface != current {
            *surface = current;
            if let Err(e) = self.engine.on_resize() {
                log::warn!("resize ignored: {}", e);
            }
        }
    }

    fn forward_input(&mut self, ctx: &egui::Context) {
        let events = ctx.input(|i| i.events.clone());
        for event in events {
            let result = match event {
                egui::Event::PointerMoved(pos) => {
                    self.engine.on_pointer_move(MOUSE_POINTER_ID, pos.x, pos.y, true)
                }
                egui::Event::PointerGone => self.engine.on_pointer_end(MOUSE_POINTER_ID),
                egui::Event::Touch { id, phase, pos, .. } => {
                    let id = id.0 as PointerId;
                    match phase {
                        egui::TouchPhase::Start | egui::TouchPhase::Move => {
                            self.engine.on_pointer_move(id, pos.x, pos.y, true)
                        }
                        egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                            self.engine.on_pointer_end(id)
                        }
                    }
                }
                _ => Ok(()),
            };
            if result.is_err() {
                return;
            }
        }
    }

    /// A short stroke at a random spot, as if a pointer flicked across it.
    fn burst(&mut self) {
        let Some(rect) = self.engine.surface().map(|s| s.bounding_rect()) else {
            return;
        };
        let x = rect.left + rand::random::<f32>() * rect.width;
        let y = rect.top + rand::random::<f32>() * rect.height;
        let angle = rand::random::<f32>() * std::f32::consts::TAU;
        let reach = 0.06 * rect.width.min(rect.height);

        let _ = self.engine.on_pointer_end(BURST_POINTER_ID);
        let _ = self.engine.on_pointer_move(BURST_POINTER_ID, x, y, true);
        let _ = self.engine.on_pointer_move(
            BURST_POINTER_ID,
            x + angle.cos() * reach,
            y + angle.sin() * reach,
            true,
        );
    }

    fn export_frame(&mut self) {
        let (Some(solver), Some(format), Some(layout)) =
            (self.engine.solver(), self.engine.format(), self.engine.layout())
        else {
            return;
        };
        let config = self.engine.config();
        let exporter = ImageExporter::new(
            Compositor::new(config.tone, config.blend),
            layout.physical_width,
            layout.physical_height,
        );
        let path = Path::new("frame.png");
        self.status = match exporter.export_png(solver.dye.read(), format.filtering, path) {
            Ok(()) => "Frame exported to frame.png".to_string(),
            Err(e) => format!("Export failed: {}", e),
        };
    }

    fn upload_overlay(&mut self, ctx: &egui::Context) {
        let overlay = match self.engine.frame() {
            Ok(overlay) => overlay,
            Err(_) => return,
        };
        let size = [overlay.width, overlay.height];
        let image = egui::ColorImage::from_rgba_unmultiplied(size, overlay.as_bytes());
        let options = egui::TextureOptions::LINEAR;
        match &mut self.texture {
            Some(texture) => texture.set(image, options),
            None => self.texture = Some(ctx.load_texture("fluid_overlay", image, options)),
        }
    }

    fn page_content(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("fluidcursor");
            ui.label("Move the mouse or drag a finger anywhere in the window.");

            ui.horizontal(|ui| {
                let running = self.engine.is_running();
                let pause_label = if self.paused { "Resume" } else { "Pause" };
                if ui.add_enabled(running, egui::Button::new(pause_label)).clicked() {
                    self.paused = !self.paused;
                }
                if ui.add_enabled(running, egui::Button::new("Burst")).clicked() {
                    self.burst();
                }
                if ui.add_enabled(running, egui::Button::new("Export PNG")).clicked() {
                    self.export_frame();
                }
                if ui.add_enabled(running, egui::Button::new("Stop")).clicked() {
                    self.engine.stop();
                    self.texture = None;
                }
            });

            ui.separator();

            match (self.engine.layout(), self.engine.format()) {
                (Some(layout), Some(format)) => {
                    ui.label(format!(
                        "Frame: {} | Sim: {}x{} | Dye: {}x{} | {:?} / {:?}",
                        self.engine.frames(),
                        layout.sim.width,
                        layout.sim.height,
                        layout.dye.width,
                        layout.dye.height,
                        format.precision,
                        format.filtering
                    ));
                }
                _ if self.prefs.reduced_motion => {
                    ui.label("Reduced motion requested: effect disabled.");
                }
                _ => {
                    ui.label("Effect not running.");
                }
            }

            if !self.status.is_empty() {
                ui.label(&self.status);
            }
        });
    }
}

impl eframe::App for DesktopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.start_attempted {
            self.start_attempted = true;
            self.engine
                .try_start(DesktopSurface::from_context(ctx), self.prefs);
        }

        self.page_content(ctx);

        if !self.engine.is_running() {
            return;
        }

        self.sync_surface(ctx);
        self.forward_input(ctx);
        if !self.paused {
            self.upload_overlay(ctx);
        }

        if let Some(texture) = &self.texture {
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("fluid_overlay"),
            ));
            painter.image(
                texture.id(),
                ctx.screen_rect(),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        ctx.request_repaint();
    }
}
