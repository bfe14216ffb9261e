//! The seam between a backdrop and whatever owns the page it draws on.
//!
//! A [`Host`] resolves targets, stacks an overlay surface behind the target's
//! content, delivers pointer and resize events and schedules frame callbacks.
//! A [`RenderBackend`] turns [`FieldUniforms`] into pixels on that overlay.
//! The winit window implements the first, the wgpu state the second; tests
//! substitute recording doubles for both.

mod backdrop;
mod pointer;

use std::fmt;
use std::str::FromStr;

use crate::gpu::FieldUniforms;

pub use backdrop::{Backdrop, BackdropBuilder, BackdropError, LifecycleState};
pub use pointer::PointerState;

/// Opaque handle to a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// Handle to an overlay surface attached to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

/// Handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Handle to a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Pointer movement over the whole page.
    Pointer,
    /// Size changes of the target element.
    Resize,
}

/// Size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Events a host forwards to the backdrop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// Pointer position in page pixels, origin top-left.
    PointerMoved { x: f64, y: f64 },
    /// The target element changed size.
    Resized(SurfaceSize),
}

/// Where a backdrop attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceTarget {
    /// An element handle obtained from the host.
    Element(ElementId),
    /// A selector string the host resolves.
    Selector(String),
}

impl fmt::Display for SurfaceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceTarget::Element(id) => write!(f, "element #{}", id.0),
            SurfaceTarget::Selector(selector) => write!(f, "{selector}"),
        }
    }
}

impl FromStr for SurfaceTarget {
    type Err = std::convert::Infallible;

    /// Integers name an element handle; anything else is a selector.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Ok(match trimmed.parse::<u64>() {
            Ok(id) => SurfaceTarget::Element(ElementId(id)),
            Err(_) => SurfaceTarget::Selector(trimmed.to_string()),
        })
    }
}

impl From<ElementId> for SurfaceTarget {
    fn from(id: ElementId) -> Self {
        SurfaceTarget::Element(id)
    }
}

impl From<&str> for SurfaceTarget {
    fn from(selector: &str) -> Self {
        SurfaceTarget::Selector(selector.to_string())
    }
}

/// Page-side services a backdrop needs.
pub trait Host {
    /// Resolves a selector to an element, if one matches.
    fn query(&self, selector: &str) -> Option<ElementId>;
    /// Whether `element` is a live handle in this host.
    fn contains(&self, element: ElementId) -> bool;
    /// Current size of the element in physical pixels.
    fn element_size(&self, element: ElementId) -> Option<SurfaceSize>;

    /// Creates a surface filling `element`, stacked behind its content and
    /// transparent to pointer input.
    fn attach_overlay(&mut self, element: ElementId, size: SurfaceSize) -> anyhow::Result<OverlayId>;
    fn resize_overlay(&mut self, overlay: OverlayId, size: SurfaceSize);
    fn detach_overlay(&mut self, overlay: OverlayId);

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId;
    fn remove_listener(&mut self, listener: ListenerId);

    /// Asks for one frame callback; the host later calls [`Backdrop::tick`].
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Draws the field onto an overlay.
pub trait RenderBackend {
    /// Acquires GPU resources for `overlay`.
    fn configure(&mut self, overlay: OverlayId, size: SurfaceSize) -> anyhow::Result<()>;
    fn resize(&mut self, size: SurfaceSize);
    fn render(&mut self, uniforms: &FieldUniforms) -> anyhow::Result<()>;
    /// Drops every GPU resource. Must tolerate repeated calls.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_targets_are_element_handles() {
        assert_eq!(
            "42".parse::<SurfaceTarget>().unwrap(),
            SurfaceTarget::Element(ElementId(42))
        );
        assert_eq!(
            " #hero ".parse::<SurfaceTarget>().unwrap(),
            SurfaceTarget::Selector("#hero".into())
        );
    }

    #[test]
    fn empty_sizes_are_detected() {
        assert!(SurfaceSize::new(0, 10).is_empty());
        assert!(!SurfaceSize::new(1, 1).is_empty());
        assert_eq!(SurfaceSize::new(200, 50).to_string(), "200x50");
    }
}
