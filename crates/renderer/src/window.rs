use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use field::FieldParams;
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::{FieldUniforms, GpuState};
use crate::host::{
    BackdropBuilder, ElementId, FrameRequest, Host, HostEvent, ListenerId, ListenerKind,
    OverlayId, RenderBackend, SurfaceSize,
};
use crate::runtime::{time_source_for_policy, FrameScheduler};
use crate::types::{AdapterProfile, Antialiasing, ColorSpaceMode, RendererConfig};

/// The only element a window host exposes.
pub const WINDOW_ELEMENT: ElementId = ElementId(1);

/// A desktop window presented to the backdrop as a one-element page.
///
/// `window`, `body`, `html`, `:root` and `#<title>` all resolve to the
/// window itself.
#[derive(Debug)]
pub struct WindowHost {
    title: String,
    size: SurfaceSize,
    overlay: Option<OverlayId>,
    listeners: Vec<(ListenerId, ListenerKind)>,
    frame: Option<FrameRequest>,
    next_handle: u64,
}

impl WindowHost {
    pub fn new(title: impl Into<String>, size: SurfaceSize) -> Self {
        Self {
            title: title.into(),
            size,
            overlay: None,
            listeners: Vec::new(),
            frame: None,
            next_handle: 1,
        }
    }

    pub fn overlay(&self) -> Option<OverlayId> {
        self.overlay
    }

    pub fn has_listener(&self, kind: ListenerKind) -> bool {
        self.listeners.iter().any(|(_, registered)| *registered == kind)
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.frame
    }

    /// Claims the outstanding frame request, if the backdrop asked for one.
    pub fn take_frame(&mut self) -> Option<FrameRequest> {
        self.frame.take()
    }

    fn next_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl Host for WindowHost {
    fn query(&self, selector: &str) -> Option<ElementId> {
        let selector = selector.trim();
        let matches = match selector {
            "window" | "body" | "html" | ":root" => true,
            _ => selector
                .strip_prefix('#')
                .is_some_and(|id| id == self.title),
        };
        matches.then_some(WINDOW_ELEMENT)
    }

    fn contains(&self, element: ElementId) -> bool {
        element == WINDOW_ELEMENT
    }

    fn element_size(&self, element: ElementId) -> Option<SurfaceSize> {
        self.contains(element).then_some(self.size)
    }

    fn attach_overlay(&mut self, element: ElementId, size: SurfaceSize) -> Result<OverlayId> {
        if !self.contains(element) {
            bail!("element #{} is not part of this window", element.0);
        }
        if self.overlay.is_some() {
            bail!("window already carries an overlay");
        }
        let overlay = OverlayId(self.next_handle());
        self.overlay = Some(overlay);
        self.size = size;
        Ok(overlay)
    }

    fn resize_overlay(&mut self, overlay: OverlayId, size: SurfaceSize) {
        if self.overlay == Some(overlay) {
            self.size = size;
        }
    }

    fn detach_overlay(&mut self, overlay: OverlayId) {
        if self.overlay == Some(overlay) {
            self.overlay = None;
        }
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        let listener = ListenerId(self.next_handle());
        self.listeners.push((listener, kind));
        listener
    }

    fn remove_listener(&mut self, listener: ListenerId) {
        self.listeners.retain(|(id, _)| *id != listener);
    }

    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next_handle());
        self.frame = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.frame == Some(request) {
            self.frame = None;
        }
    }
}

/// wgpu renderer bound to the window's surface.
pub(crate) struct GpuBackend {
    // Dropped before `window`: the surface borrows the window's handles.
    gpu: Option<GpuState>,
    window: Arc<Window>,
    params: FieldParams,
    antialiasing: Antialiasing,
    color_space: ColorSpaceMode,
    out_of_memory: bool,
}

impl GpuBackend {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Self {
        Self {
            gpu: None,
            window,
            params: config.params.clone(),
            antialiasing: config.antialiasing,
            color_space: config.color_space,
            out_of_memory: false,
        }
    }

    pub(crate) fn adapter_profile(&self) -> Option<&AdapterProfile> {
        self.gpu.as_ref().map(GpuState::adapter_profile)
    }

    pub(crate) fn is_out_of_memory(&self) -> bool {
        self.out_of_memory
    }
}

impl RenderBackend for GpuBackend {
    fn configure(&mut self, _overlay: OverlayId, size: SurfaceSize) -> Result<()> {
        let gpu = GpuState::new(
            self.window.as_ref(),
            size,
            &self.params,
            self.antialiasing,
            self.color_space,
        )?;
        self.gpu = Some(gpu);
        Ok(())
    }

    fn resize(&mut self, size: SurfaceSize) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(size);
        }
    }

    fn render(&mut self, uniforms: &FieldUniforms) -> Result<()> {
        let Some(gpu) = self.gpu.as_mut() else {
            bail!("render called without GPU state");
        };
        match gpu.render(uniforms) {
            Ok(()) => Ok(()),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!(size = %gpu.size(), "surface lost or outdated; reconfiguring");
                gpu.recover_surface();
                Ok(())
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
                Ok(())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.out_of_memory = true;
                Err(anyhow!("surface out of memory"))
            }
            Err(other) => Err(anyhow!("surface error: {other:?}")),
        }
    }

    fn release(&mut self) {
        self.gpu = None;
    }
}

fn surface_size(size: PhysicalSize<u32>) -> SurfaceSize {
    SurfaceSize::new(size.width, size.height)
}

fn is_space(event: &KeyEvent) -> bool {
    matches!(event.logical_key, Key::Named(NamedKey::Space))
        || matches!(event.logical_key, Key::Character(ref value) if value.as_str() == " ")
}

/// Opens a window, attaches a backdrop to `config.target` and runs until the
/// window closes or Escape is pressed.
pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(
            config.surface_size.0,
            config.surface_size.1,
        ))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let host = WindowHost::new(config.title.clone(), surface_size(window.inner_size()));
    let mut backdrop = BackdropBuilder::new()
        .target(config.target.clone())
        .renderer(GpuBackend::new(window.clone(), &config))
        .time_source(time_source_for_policy(&config.policy))
        .pointer_smoothing(config.params.pointer_smoothing)
        .build(host)
        .context("failed to attach backdrop to window")?;

    let mut policy = config.policy.clone();
    if let Some(profile) = backdrop.renderer().adapter_profile() {
        if let Some(cap) = policy.apply_software_cap(profile) {
            warn!(
                adapter = %profile.name,
                backend = ?profile.backend,
                cap,
                "software rasterizer detected; capping to {cap} FPS (override with --fps)"
            );
        }
    }
    let mut scheduler = FrameScheduler::new(&policy);
    info!(surface = %config.target, size = %backdrop.size(), "backdrop running");

    let mut result = Ok(());
    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                backdrop.destroy();
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                if matches!(event.logical_key, Key::Named(NamedKey::Escape)) {
                    backdrop.destroy();
                    elwt.exit();
                } else if is_space(&event) {
                    if backdrop.is_running() {
                        backdrop.stop();
                    } else {
                        backdrop.start();
                        scheduler.reset();
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                backdrop.handle_event(HostEvent::PointerMoved {
                    x: position.x,
                    y: position.y,
                });
            }
            WindowEvent::Resized(new_size) => {
                let size = surface_size(new_size);
                if backdrop.handle_event(HostEvent::Resized(size)) {
                    scheduler.invalidate();
                }
            }
            WindowEvent::RedrawRequested => {
                if backdrop.host_mut().take_frame().is_none() {
                    return;
                }
                let now = Instant::now();
                if backdrop.tick() {
                    scheduler.mark_rendered(now);
                }
                if backdrop.renderer().is_out_of_memory() {
                    error!("surface out of memory; exiting");
                    backdrop.destroy();
                    result = Err(anyhow!("surface out of memory"));
                    elwt.exit();
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if backdrop.host().pending_frame().is_none() {
                elwt.set_control_flow(ControlFlow::Wait);
            } else if scheduler.ready_for_frame(now) {
                tracing::trace!("scheduler: issuing redraw now");
                window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = scheduler.next_deadline() {
                tracing::trace!(
                    deadline_ms = deadline.saturating_duration_since(now).as_millis(),
                    "scheduler: waiting until next frame"
                );
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    if let Err(err) = run_result {
        return Err(anyhow!("window event loop error: {err}"));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_window_selectors() {
        let host = WindowHost::new("sunveil", SurfaceSize::new(640, 480));
        for selector in ["window", "body", ":root", "#sunveil", " html "] {
            assert_eq!(host.query(selector), Some(WINDOW_ELEMENT), "{selector}");
        }
        assert_eq!(host.query("#other"), None);
        assert_eq!(host.query(".hero"), None);
        assert!(!host.contains(ElementId(2)));
        assert_eq!(
            host.element_size(WINDOW_ELEMENT),
            Some(SurfaceSize::new(640, 480))
        );
    }

    #[test]
    fn holds_a_single_overlay() {
        let mut host = WindowHost::new("sunveil", SurfaceSize::new(640, 480));
        let overlay = host
            .attach_overlay(WINDOW_ELEMENT, SurfaceSize::new(640, 480))
            .unwrap();
        assert!(host
            .attach_overlay(WINDOW_ELEMENT, SurfaceSize::new(640, 480))
            .is_err());
        host.detach_overlay(overlay);
        assert_eq!(host.overlay(), None);
    }

    #[test]
    fn frame_requests_can_be_cancelled_and_taken() {
        let mut host = WindowHost::new("sunveil", SurfaceSize::new(1, 1));
        let first = host.request_frame();
        host.cancel_frame(first);
        assert_eq!(host.take_frame(), None);

        let second = host.request_frame();
        assert_eq!(host.take_frame(), Some(second));
        assert_eq!(host.take_frame(), None);
    }

    #[test]
    fn listeners_are_tracked_by_kind() {
        let mut host = WindowHost::new("sunveil", SurfaceSize::new(1, 1));
        let pointer = host.add_listener(ListenerKind::Pointer);
        host.add_listener(ListenerKind::Resize);
        host.remove_listener(pointer);
        assert!(!host.has_listener(ListenerKind::Pointer));
        assert!(host.has_listener(ListenerKind::Resize));
    }
}
