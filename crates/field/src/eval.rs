use glam::{Vec2, Vec3};

use crate::clouds::{composite_layers, CloudSample};
use crate::grain::grain_offset;
use crate::noise::smoothstep;
use crate::params::FieldParams;
use crate::waves::{sun_center, wave_field};

/// Fraction of the sun radius where the disc edge starts to soften.
pub const SUN_CORE_RATIO: f32 = 0.6;

/// Per-frame inputs of the field. Pointer `y` uses a bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub time: f32,
    pub resolution: Vec2,
    pub pointer: Vec2,
}

impl FrameParams {
    pub fn new(time: f32, resolution: Vec2, pointer: Vec2) -> Self {
        Self {
            time,
            resolution,
            pointer,
        }
    }

    pub fn aspect(&self) -> f32 {
        let resolution = self.resolution.max(Vec2::ONE);
        resolution.x / resolution.y
    }
}

/// Color of the pixel at `frag_coord` (bottom-left origin, pixel units).
///
/// Composition order: sky gradient, background clouds, sun glow and disc,
/// wave color, foreground clouds, grain. Every channel is clamped to `[0, 1]`.
pub fn evaluate(frag_coord: Vec2, frame: &FrameParams, params: &FieldParams) -> Vec3 {
    let resolution = frame.resolution.max(Vec2::ONE);
    let uv = frag_coord / resolution;
    let aspect = frame.aspect();
    let p = Vec2::new(uv.x * aspect, uv.y);

    let center = sun_center(params, aspect, frame.pointer);
    let sun_uv = p - center;
    let waves = wave_field(params, sun_uv, frame.time);

    let clouds = CloudSample {
        uv: p + waves.displacement,
        height: uv.y,
        pointer: frame.pointer,
        time: frame.time,
        time_scale: params.cloud_time_scale,
    };

    let sky_top = Vec3::from(params.sky_top);
    let sky_bottom = Vec3::from(params.sky_bottom);
    let mut color = sky_bottom.lerp(sky_top, smoothstep(0.0, 1.0, uv.y));

    color = composite_layers(color, params.background_layers(), &clouds);

    let dist = sun_uv.length();
    let glow = (-dist * params.sun_glow_falloff).exp() * params.sun_glow_strength;
    color += Vec3::from(params.glow_color) * glow;
    let disc = 1.0 - smoothstep(params.sun_radius * SUN_CORE_RATIO, params.sun_radius, dist);
    color = color.lerp(Vec3::from(params.sun_color), disc);

    color += Vec3::from(params.wave_color) * waves.intensity;

    color = composite_layers(color, params.foreground_layers(), &clouds);

    color += Vec3::splat(grain_offset(params, frag_coord, frame.time));
    color.clamp(Vec3::ZERO, Vec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(time: f32, pointer: Vec2) -> FrameParams {
        FrameParams::new(time, Vec2::new(64.0, 48.0), pointer)
    }

    #[test]
    fn output_is_clamped_and_finite() {
        let params = FieldParams::default();
        for (time, pointer) in [
            (0.0, Vec2::ZERO),
            (3.7, Vec2::splat(0.5)),
            (120.25, Vec2::new(1.4, -0.3)),
        ] {
            let frame = frame(time, pointer);
            for y in (0..48).step_by(5) {
                for x in (0..64).step_by(7) {
                    let color = evaluate(Vec2::new(x as f32 + 0.5, y as f32 + 0.5), &frame, &params);
                    assert!(color.is_finite());
                    assert!(color.min_element() >= 0.0 && color.max_element() <= 1.0);
                }
            }
        }
    }

    #[test]
    fn identical_inputs_give_identical_pixels() {
        let params = FieldParams::default();
        let frame = frame(42.5, Vec2::new(0.3, 0.8));
        let pixel = Vec2::new(17.5, 30.5);
        let a = evaluate(pixel, &frame, &params);
        let b = evaluate(pixel, &frame, &params);
        assert_eq!(a, b);
    }

    #[test]
    fn sun_disc_dominates_its_center() {
        let params = FieldParams {
            grain_amplitude: 0.0,
            ..FieldParams::default()
        };
        let frame = FrameParams::new(1.0, Vec2::new(100.0, 100.0), Vec2::splat(0.5));
        // Sun sits at the anchor when the pointer is centered.
        let center = Vec2::new(50.0, 45.0);
        let color = evaluate(center, &frame, &params);
        let sky = evaluate(Vec2::new(2.0, 98.0), &frame, &params);
        assert!(color.x + color.y + color.z > sky.x + sky.y + sky.z);
    }

    #[test]
    fn degenerate_resolution_does_not_produce_nan() {
        let params = FieldParams::default();
        let frame = FrameParams::new(0.5, Vec2::ZERO, Vec2::ZERO);
        assert!(evaluate(Vec2::ZERO, &frame, &params).is_finite());
    }
}
