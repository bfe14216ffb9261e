use bytemuck::{Pod, Zeroable};
use field::{FrameParams, Vec2};

use crate::host::SurfaceSize;

/// CPU mirror of the `FieldUniforms` block in the generated WGSL.
///
/// WGSL lays the struct out as: `resolution` at 0, `pointer` at 8, `time` at
/// 16, then padding up to 32 bytes so the block is a multiple of 16.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FieldUniforms {
    pub resolution: [f32; 2],
    pub pointer: [f32; 2],
    pub time: f32,
    pub _pad0: f32,
    pub _pad1: [f32; 2],
}

impl FieldUniforms {
    pub fn new(size: SurfaceSize) -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.set_resolution(size);
        uniforms
    }

    pub fn set_resolution(&mut self, size: SurfaceSize) {
        self.resolution = [size.width as f32, size.height as f32];
    }

    pub fn set_pointer(&mut self, pointer: Vec2) {
        self.pointer = pointer.to_array();
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    /// The same frame expressed for the CPU reference evaluator.
    pub fn frame_params(&self) -> FrameParams {
        FrameParams::new(
            self.time,
            Vec2::from(self.resolution),
            Vec2::from(self.pointer),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn layout_matches_wgsl_block() {
        assert_eq!(size_of::<FieldUniforms>(), 32);
        assert_eq!(offset_of!(FieldUniforms, resolution), 0);
        assert_eq!(offset_of!(FieldUniforms, pointer), 8);
        assert_eq!(offset_of!(FieldUniforms, time), 16);
    }

    #[test]
    fn frame_params_mirror_uniforms() {
        let mut uniforms = FieldUniforms::new(SurfaceSize::new(200, 50));
        uniforms.set_pointer(Vec2::new(0.25, 0.75));
        uniforms.set_time(3.5);
        let frame = uniforms.frame_params();
        assert_eq!(frame.resolution, Vec2::new(200.0, 50.0));
        assert_eq!(frame.pointer, Vec2::new(0.25, 0.75));
        assert_eq!(frame.time, 3.5);
    }
}
