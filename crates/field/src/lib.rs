//! Procedural sky field: a sun with expanding wave rings, five fbm cloud
//! belts and film grain.
//!
//! Everything here is a pure function of pixel coordinate, time, pointer and
//! resolution. The renderer compiles the same recipe to WGSL; this crate is
//! the CPU reference used by tests and still export.

pub mod clouds;
pub mod eval;
pub mod grain;
pub mod noise;
pub mod params;
pub mod waves;

pub use clouds::{cloud_density, cloud_mask, composite_layers, CloudSample};
pub use eval::{evaluate, FrameParams, SUN_CORE_RATIO};
pub use grain::{grain_frame, grain_offset};
pub use noise::{fbm, hash, noise, FBM_OCTAVES};
pub use params::{CloudDepth, CloudLayer, FieldError, FieldParams};
pub use waves::{ring_fade, ring_offset, ring_radius, sun_center, wave_field, WaveField};

pub use glam::{Vec2, Vec3};
