//! Browser host: drives the engine from `requestAnimationFrame` and paints
//! its overlay into a full-viewport canvas above the page.

use crate::capability::PlatformCapabilities;
use crate::compositor::Compositor;
use crate::config::FluidConfig;
use crate::engine::{FluidEngine, HostPreferences};
use crate::export::ImageExporter;
use crate::pointer::{PointerId, MOUSE_POINTER_ID};
use crate::surface::{SurfaceHandle, SurfaceRect, Viewport};
use image::Rgba;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Once;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{
    CanvasRenderingContext2d, Event, EventTarget, HtmlCanvasElement, ImageData, MouseEvent,
    TouchEvent, Window,
};

static INIT_LOGGING: Once = Once::new();

fn init_logging() {
    INIT_LOGGING.call_once(|| {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);
    });
}

/// The page canvas, seen as a drawing surface.
struct WebSurface {
    window: Window,
    canvas: HtmlCanvasElement,
    has_context: bool,
}

impl SurfaceHandle for WebSurface {
    fn capabilities(&self) -> PlatformCapabilities {
        if self.has_context {
            PlatformCapabilities::cpu()
        } else {
            PlatformCapabilities::none()
        }
    }

    fn viewport(&self) -> Viewport {
        let dimension = |v: Result<JsValue, JsValue>| {
            v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as f32
        };
        Viewport::new(
            dimension(self.window.inner_width()),
            dimension(self.window.inner_height()),
            self.window.device_pixel_ratio() as f32,
        )
    }

    fn bounding_rect(&self) -> SurfaceRect {
        let rect = self.canvas.get_bounding_client_rect();
        SurfaceRect::new(
            rect.left() as f32,
            rect.top() as f32,
            rect.width() as f32,
            rect.height() as f32,
        )
    }
}

struct WebRuntime {
    engine: FluidEngine<WebSurface>,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    staging: HtmlCanvasElement,
    staging_context: CanvasRenderingContext2d,
}

impl WebRuntime {
    fn fit_canvas(&self) {
        if let Some(layout) = self.engine.layout() {
            if self.canvas.width() != layout.physical_width {
                self.canvas.set_width(layout.physical_width);
            }
            if self.canvas.height() != layout.physical_height {
                self.canvas.set_height(layout.physical_height);
            }
        }
    }

    fn resize(&mut self) {
        if let Err(e) = self.engine.on_resize() {
            log::warn!("resize ignored: {}", e);
            return;
        }
        self.fit_canvas();
    }

    fn render(&mut self) -> Result<(), JsValue> {
        let Ok(overlay) = self.engine.frame() else {
            return Ok(());
        };
        let (width, height) = (overlay.width as u32, overlay.height as u32);
        if self.staging.width() != width || self.staging.height() != height {
            self.staging.set_width(width);
            self.staging.set_height(height);
        }
        let bytes = Clamped(overlay.as_bytes());
        let data = ImageData::new_with_u8_clamped_array_and_sh(bytes, width, height)?;
        self.staging_context.put_image_data(&data, 0.0, 0.0)?;

        let (cw, ch) = (self.canvas.width() as f64, self.canvas.height() as f64);
        self.context.clear_rect(0.0, 0.0, cw, ch);
        self.context
            .draw_image_with_html_canvas_element_and_dw_and_dh(&self.staging, 0.0, 0.0, cw, ch)
    }

    fn snapshot(&self) -> Option<String> {
        let (solver, format, layout) =
            (self.engine.solver()?, self.engine.format()?, self.engine.layout()?);
        let config = self.engine.config();
        ImageExporter::new(
            Compositor::new(config.tone, config.blend),
            layout.physical_width,
            layout.physical_height,
        )
        .with_background(Rgba([0, 0, 0, 0]))
        .to_data_url(solver.dye.read(), format.filtering)
        .ok()
    }
}

struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

type SharedRuntime = Rc<RefCell<Option<WebRuntime>>>;

/// Returned to the page. Freeing it stops the effect the same way `stop`
/// does.
#[wasm_bindgen]
pub struct FluidCursorHandle {
    runtime: SharedRuntime,
    frame_loop: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
    frame_request: Rc<Cell<Option<i32>>>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl FluidCursorHandle {
    fn inactive() -> Self {
        Self {
            runtime: Rc::new(RefCell::new(None)),
            frame_loop: Rc::new(RefCell::new(None)),
            frame_request: Rc::new(Cell::new(None)),
            listeners: Vec::new(),
        }
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.runtime
            .borrow()
            .as_ref()
            .is_some_and(|rt| rt.engine.is_running())
    }

    /// Current effect as a transparent PNG `data:` URL.
    #[wasm_bindgen(js_name = snapshotDataUrl)]
    pub fn snapshot_data_url(&self) -> Option<String> {
        self.runtime.borrow().as_ref().and_then(WebRuntime::snapshot)
    }

    /// Cancels the pending frame, removes every listener and releases all
    /// engine state. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(window) = web_sys::window() {
            if let Some(id) = self.frame_request.take() {
                let _ = window.cancel_animation_frame(id);
            }
        }
        self.frame_loop.borrow_mut().take();

        for listener in self.listeners.drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.kind,
                listener.callback.as_ref().unchecked_ref(),
            );
        }

        if let Some(mut rt) = self.runtime.borrow_mut().take() {
            rt.engine.stop();
            let (w, h) = (rt.canvas.width() as f64, rt.canvas.height() as f64);
            rt.context.clear_rect(0.0, 0.0, w, h);
        }
    }
}

impl Drop for FluidCursorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
}

fn prefers_reduced_motion(window: &Window) -> bool {
    window
        .match_media("(prefers-reduced-motion: reduce)")
        .ok()
        .flatten()
        .is_some_and(|query| query.matches())
}

fn listen(
    target: &EventTarget,
    kind: &'static str,
    runtime: &SharedRuntime,
    mut handler: impl FnMut(&mut WebRuntime, Event) + 'static,
) -> Result<Listener, JsValue> {
    let runtime = runtime.clone();
    let callback = Closure::wrap(Box::new(move |event: Event| {
        if let Some(rt) = runtime.borrow_mut().as_mut() {
            handler(rt, event);
        }
    }) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
    Ok(Listener {
        target: target.clone(),
        kind,
        callback,
    })
}

fn for_each_changed_touch(event: &Event, mut f: impl FnMut(PointerId, f32, f32)) {
    let Some(event) = event.dyn_ref::<TouchEvent>() else {
        return;
    };
    let touches = event.changed_touches();
    for i in 0..touches.length() {
        if let Some(touch) = touches.get(i) {
            f(
                touch.identifier() as PointerId,
                touch.client_x() as f32,
                touch.client_y() as f32,
            );
        }
    }
}

/// Starts the effect on `canvas`. Never throws: on reduced motion, a missing
/// 2D context or any setup failure the returned handle is simply inactive.
#[wasm_bindgen(js_name = startFluidCursor)]
pub fn start_fluid_cursor(
    canvas: HtmlCanvasElement,
    config_json: Option<String>,
) -> FluidCursorHandle {
    init_logging();
    match try_start(canvas, config_json) {
        Ok(handle) => handle,
        Err(e) => {
            log::warn!("fluid cursor disabled: {:?}", e);
            FluidCursorHandle::inactive()
        }
    }
}

fn try_start(
    canvas: HtmlCanvasElement,
    config_json: Option<String>,
) -> Result<FluidCursorHandle, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let config = match config_json {
        Some(json) => {
            FluidConfig::from_json_str(&json).map_err(|e| JsValue::from_str(&e.to_string()))?
        }
        None => FluidConfig::default(),
    };
    let prefs = HostPreferences {
        reduced_motion: prefers_reduced_motion(&window),
    };

    let context = context_2d(&canvas);
    let mut engine = FluidEngine::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let surface = WebSurface {
        window: window.clone(),
        canvas: canvas.clone(),
        has_context: context.is_some(),
    };
    if !engine.try_start(surface, prefs) {
        return Ok(FluidCursorHandle::inactive());
    }
    let Some(context) = context else {
        return Ok(FluidCursorHandle::inactive());
    };

    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
    let staging: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    let staging_context =
        context_2d(&staging).ok_or_else(|| JsValue::from_str("no staging context"))?;

    let style = canvas.style();
    style.set_property("pointer-events", "none")?;
    style.set_property("mix-blend-mode", engine.config().blend.css_mix_blend_mode())?;

    let runtime = WebRuntime {
        engine,
        canvas,
        context,
        staging,
        staging_context,
    };
    runtime.fit_canvas();

    // From here on an early return drops the handle, which detaches whatever
    // was already registered.
    let mut handle = FluidCursorHandle::inactive();
    *handle.runtime.borrow_mut() = Some(runtime);

    let target: &EventTarget = window.as_ref();
    let shared = &handle.runtime;
    handle.listeners.push(listen(target, "mousemove", shared, |rt, event| {
        if let Some(event) = event.dyn_ref::<MouseEvent>() {
            let _ = rt.engine.on_pointer_move(
                MOUSE_POINTER_ID,
                event.client_x() as f32,
                event.client_y() as f32,
                true,
            );
        }
    })?);
    for kind in ["touchstart", "touchmove"] {
        handle.listeners.push(listen(target, kind, shared, |rt, event| {
            for_each_changed_touch(&event, |id, x, y| {
                let _ = rt.engine.on_pointer_move(id, x, y, true);
            });
        })?);
    }
    for kind in ["touchend", "touchcancel"] {
        handle.listeners.push(listen(target, kind, shared, |rt, event| {
            for_each_changed_touch(&event, |id, _, _| {
                let _ = rt.engine.on_pointer_end(id);
            });
        })?);
    }
    handle
        .listeners
        .push(listen(target, "resize", shared, |rt, _| rt.resize())?);

    let frame_loop = handle.frame_loop.clone();
    let frame_request = handle.frame_request.clone();
    let runtime = handle.runtime.clone();
    let loop_window = window.clone();
    *handle.frame_loop.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        frame_request.set(None);
        let running = match runtime.borrow_mut().as_mut() {
            Some(rt) => {
                if let Err(e) = rt.render() {
                    log::warn!("frame failed: {:?}", e);
                }
                rt.engine.is_running()
            }
            None => false,
        };
        if !running {
            return;
        }
        if let Some(callback) = frame_loop.borrow().as_ref() {
            if let Ok(id) = loop_window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                frame_request.set(Some(id));
            }
        }
    }) as Box<dyn FnMut()>));

    if let Some(callback) = handle.frame_loop.borrow().as_ref() {
        let id = window.request_animation_frame(callback.as_ref().unchecked_ref())?;
        handle.frame_request.set(Some(id));
    }

    log::info!("fluid cursor attached");
    Ok(handle)
}
