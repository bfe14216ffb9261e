//! wgpu side of the renderer.
//!
//! - `context` owns instance/device/surface wiring and rebuilds the swapchain
//!   when the overlay resizes.
//! - `pipeline` compiles the generated WGSL into one fullscreen pipeline.
//! - `uniforms` mirrors the shader's `FieldUniforms` block.
//! - `state` glues everything together behind the `GpuState` API used by
//!   `window`.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
pub use uniforms::FieldUniforms;
