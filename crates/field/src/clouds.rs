use glam::{Vec2, Vec3};

use crate::noise::{fbm, smoothstep};
use crate::params::CloudLayer;

/// Per-pixel inputs shared by every cloud layer of a frame.
#[derive(Debug, Clone, Copy)]
pub struct CloudSample {
    /// Aspect-corrected UV after wave displacement.
    pub uv: Vec2,
    /// Undisplaced vertical UV, drives the falloff belt.
    pub height: f32,
    pub pointer: Vec2,
    pub time: f32,
    pub time_scale: f32,
}

/// Turbulence density of `layer`, already shaped by its vertical falloff.
pub fn cloud_density(layer: &CloudLayer, sample: &CloudSample) -> f32 {
    let velocity = Vec2::from(layer.velocity);
    let q = sample.uv * layer.scale
        + velocity * sample.time
        + (sample.pointer - Vec2::splat(0.5)) * layer.flow;
    let density = fbm(
        q.extend(sample.time * sample.time_scale + layer.seed),
        layer.amplitude_decay,
        layer.frequency_growth,
    );
    let falloff = (layer.falloff_origin - sample.height)
        .max(0.0)
        .powf(layer.falloff_exponent);
    density * falloff
}

/// Soft coverage mask in `[0, 1]`.
pub fn cloud_mask(layer: &CloudLayer, sample: &CloudSample) -> f32 {
    let [low, high] = layer.threshold;
    smoothstep(low, high, cloud_density(layer, sample))
}

pub fn composite(color: Vec3, layer: &CloudLayer, sample: &CloudSample) -> Vec3 {
    let mask = cloud_mask(layer, sample);
    color.lerp(Vec3::from(layer.color), mask * layer.blend)
}

/// Composites `layers` back to front over `color`.
pub fn composite_layers<'a>(
    color: Vec3,
    layers: impl IntoIterator<Item = &'a CloudLayer>,
    sample: &CloudSample,
) -> Vec3 {
    layers
        .into_iter()
        .fold(color, |acc, layer| composite(acc, layer, sample))
}
