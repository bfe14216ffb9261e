//! Renderer crate for sunveil.
//!
//! Glues the procedural field from the `field` crate to a host surface:
//!
//! ```text
//!   CLI / sunveil
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowHost + GpuBackend ──▶ Backdrop::tick ──▶ GPU UBO
//!          │
//!          └─▶ (Export) reference::export_png ──▶ PNG on disk
//! ```
//!
//! [`host`] holds the host-agnostic part: target resolution, the overlay,
//! listeners, pointer smoothing and the start/stop/destroy lifecycle. The
//! winit window in [`window`] is one implementation of [`host::Host`]; tests
//! provide their own.

pub mod compile;
mod gpu;
pub mod host;
pub mod reference;
pub mod runtime;
mod types;
pub mod window;

use anyhow::Result;

pub use compile::field_shader_source;
pub use gpu::FieldUniforms;
pub use host::{
    Backdrop, BackdropBuilder, BackdropError, ElementId, FrameRequest, Host, HostEvent,
    LifecycleState, ListenerId, ListenerKind, OverlayId, PointerState, RenderBackend, SurfaceSize,
    SurfaceTarget,
};
pub use runtime::{
    time_source_for_policy, BoxedTimeSource, FixedTimeSource, FrameScheduler, RenderPolicy,
    SystemTimeSource, TimeSample, TimeSource, SOFTWARE_FPS_CAP,
};
pub use types::{AdapterProfile, Antialiasing, ColorSpaceMode, RendererConfig};
pub use window::{WindowHost, WINDOW_ELEMENT};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Exports a still for [`RenderPolicy::Export`]; opens the window for
    /// everything else and blocks until it closes.
    pub fn run(&mut self) -> Result<()> {
        match &self.config.policy {
            RenderPolicy::Export { time, path } => {
                let (width, height) = self.config.surface_size;
                reference::export_png(
                    path,
                    SurfaceSize::new(width, height),
                    *time,
                    &self.config.params,
                )
            }
            RenderPolicy::Animate { .. } | RenderPolicy::Still { .. } => {
                window::run_window(self.config.clone())
            }
        }
    }
}
