//! Real-time fluid cursor effect: pointer motion stirs a small stable-fluids
//! simulation whose dye is blended over the host page.

pub mod analysis;
pub mod capability;
pub mod compositor;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod field;
pub mod pointer;
pub mod solver;
pub mod splat;
pub mod surface;

#[cfg(not(target_arch = "wasm32"))]
pub mod desktop;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use analysis::{AnalysisRecorder, FluidMetrics};
pub use capability::{negotiate, Filtering, PlatformCapabilities, Precision, RenderFormat};
pub use compositor::{BlendMode, Compositor, Overlay, ToneMapping};
pub use config::FluidConfig;
pub use engine::{FluidEngine, HostPreferences};
pub use error::EngineError;
pub use export::ImageExporter;
pub use field::{DoubleField, Field, GridSize};
pub use pointer::{ColorCycle, Pointer, PointerId, PointerTracker, MOUSE_POINTER_ID};
pub use solver::{FluidSolver, SolverParams};
pub use surface::{
    HeadlessSurface, SurfaceHandle, SurfaceLayout, SurfaceManager, SurfaceRect, Viewport,
};

#[cfg(not(target_arch = "wasm32"))]
pub use desktop::{DesktopApp, DesktopSurface};

#[cfg(target_arch = "wasm32")]
pub use web::{start_fluid_cursor, FluidCursorHandle};
