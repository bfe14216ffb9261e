use field::params::DEFAULT_POINTER_SMOOTHING;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{
    ElementId, FrameRequest, Host, HostEvent, ListenerId, ListenerKind, OverlayId, PointerState,
    RenderBackend, SurfaceSize, SurfaceTarget,
};
use crate::gpu::FieldUniforms;
use crate::runtime::{BoxedTimeSource, SystemTimeSource};

/// Failures while constructing a [`Backdrop`].
#[derive(Debug, Error)]
pub enum BackdropError {
    #[error("no renderer was supplied")]
    MissingRenderer,
    #[error("no target was supplied")]
    MissingTarget,
    #[error("selector `{0}` did not match any element")]
    UnresolvedSelector(String),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("host refused the overlay: {0:#}")]
    Host(anyhow::Error),
    #[error("renderer failed to initialise: {0:#}")]
    Renderer(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Stopped,
    Destroyed,
}

/// Configures and attaches a [`Backdrop`].
pub struct BackdropBuilder<R> {
    target: Option<SurfaceTarget>,
    renderer: Option<R>,
    time_source: Option<BoxedTimeSource>,
    pointer_smoothing: f32,
    autostart: bool,
}

impl<R> Default for BackdropBuilder<R> {
    fn default() -> Self {
        Self {
            target: None,
            renderer: None,
            time_source: None,
            pointer_smoothing: DEFAULT_POINTER_SMOOTHING,
            autostart: true,
        }
    }
}

impl<R: RenderBackend> BackdropBuilder<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: impl Into<SurfaceTarget>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn renderer(mut self, renderer: R) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn time_source(mut self, source: BoxedTimeSource) -> Self {
        self.time_source = Some(source);
        self
    }

    pub fn pointer_smoothing(mut self, smoothing: f32) -> Self {
        self.pointer_smoothing = smoothing;
        self
    }

    /// Whether `build` schedules the first frame. Defaults to `true`.
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn build<H: Host>(self, mut host: H) -> Result<Backdrop<H, R>, BackdropError> {
        let mut renderer = self.renderer.ok_or(BackdropError::MissingRenderer)?;
        let target = self.target.ok_or(BackdropError::MissingTarget)?;
        let element = resolve_target(&host, &target)?;
        let size = host
            .element_size(element)
            .ok_or_else(|| BackdropError::InvalidTarget(format!("{target} has no size")))?;

        let overlay = host
            .attach_overlay(element, size)
            .map_err(BackdropError::Host)?;
        if let Err(err) = renderer.configure(overlay, size) {
            host.detach_overlay(overlay);
            return Err(BackdropError::Renderer(err));
        }

        let listeners = vec![
            host.add_listener(ListenerKind::Pointer),
            host.add_listener(ListenerKind::Resize),
        ];
        debug!(surface = %target, %size, "backdrop attached");

        let mut backdrop = Backdrop {
            host,
            renderer,
            element,
            overlay: Some(overlay),
            listeners,
            pending_frame: None,
            pending_size: None,
            size,
            pointer: PointerState::new(self.pointer_smoothing),
            time_source: self
                .time_source
                .unwrap_or_else(|| Box::new(SystemTimeSource::new())),
            uniforms: FieldUniforms::new(size),
            state: LifecycleState::Stopped,
        };
        if self.autostart {
            backdrop.start();
        }
        Ok(backdrop)
    }
}

fn resolve_target<H: Host>(host: &H, target: &SurfaceTarget) -> Result<ElementId, BackdropError> {
    match target {
        SurfaceTarget::Element(id) => {
            if host.contains(*id) {
                Ok(*id)
            } else {
                Err(BackdropError::InvalidTarget(format!(
                    "element #{} does not exist",
                    id.0
                )))
            }
        }
        SurfaceTarget::Selector(selector) => {
            let selector = selector.trim();
            if selector.is_empty() {
                return Err(BackdropError::InvalidTarget("selector is blank".into()));
            }
            host.query(selector)
                .ok_or_else(|| BackdropError::UnresolvedSelector(selector.to_string()))
        }
    }
}

/// One animated background bound to a host element.
///
/// The host calls [`tick`](Self::tick) for every frame it was asked for and
/// forwards pointer and resize events through
/// [`handle_event`](Self::handle_event).
pub struct Backdrop<H, R> {
    host: H,
    renderer: R,
    element: ElementId,
    overlay: Option<OverlayId>,
    listeners: Vec<ListenerId>,
    pending_frame: Option<FrameRequest>,
    pending_size: Option<SurfaceSize>,
    size: SurfaceSize,
    pointer: PointerState,
    time_source: BoxedTimeSource,
    uniforms: FieldUniforms,
    state: LifecycleState,
}

impl<H: Host, R: RenderBackend> Backdrop<H, R> {
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn overlay(&self) -> Option<OverlayId> {
        self.overlay
    }

    pub fn uniforms(&self) -> &FieldUniforms {
        &self.uniforms
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn start(&mut self) {
        if self.state != LifecycleState::Stopped {
            return;
        }
        self.state = LifecycleState::Running;
        self.schedule();
        info!("backdrop started");
    }

    pub fn stop(&mut self) {
        if self.state != LifecycleState::Running {
            return;
        }
        self.state = LifecycleState::Stopped;
        if let Some(request) = self.pending_frame.take() {
            self.host.cancel_frame(request);
        }
        info!("backdrop stopped");
    }

    /// Tears everything down. Later calls to any method are no-ops.
    pub fn destroy(&mut self) {
        if self.state == LifecycleState::Destroyed {
            return;
        }
        self.state = LifecycleState::Destroyed;
        if let Some(request) = self.pending_frame.take() {
            self.host.cancel_frame(request);
        }
        for listener in self.listeners.drain(..) {
            self.host.remove_listener(listener);
        }
        self.renderer.release();
        if let Some(overlay) = self.overlay.take() {
            self.host.detach_overlay(overlay);
        }
        self.pending_size = None;
        info!("backdrop destroyed");
    }

    /// Returns whether the event changed any state.
    pub fn handle_event(&mut self, event: HostEvent) -> bool {
        if self.state == LifecycleState::Destroyed {
            return false;
        }
        match event {
            HostEvent::PointerMoved { x, y } => {
                let viewport = self.pending_size.unwrap_or(self.size);
                self.pointer.track(x, y, viewport);
                true
            }
            HostEvent::Resized(size) => {
                if size.is_empty() {
                    debug!(%size, "ignoring empty resize");
                    return false;
                }
                if size == self.pending_size.unwrap_or(self.size) {
                    return false;
                }
                self.pending_size = Some(size);
                true
            }
        }
    }

    /// Frame callback. Returns `true` when a frame was rendered.
    pub fn tick(&mut self) -> bool {
        self.pending_frame = None;
        if self.state != LifecycleState::Running {
            return false;
        }

        if let Some(size) = self.pending_size.take() {
            self.apply_resize(size);
        }

        let pointer = self.pointer.step();
        let sample = self.time_source.sample();
        self.uniforms.set_pointer(pointer);
        self.uniforms.set_time(sample.seconds);

        if let Err(err) = self.renderer.render(&self.uniforms) {
            error!(frame = sample.frame_index, "failed to render frame: {err:#}");
        }

        self.schedule();
        true
    }

    fn apply_resize(&mut self, size: SurfaceSize) {
        let Some(overlay) = self.overlay else {
            warn!("resize without an overlay");
            return;
        };
        self.size = size;
        self.host.resize_overlay(overlay, size);
        self.renderer.resize(size);
        self.uniforms.set_resolution(size);
        debug!(%size, "overlay resized");
    }

    fn schedule(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.host.request_frame());
        }
    }
}
