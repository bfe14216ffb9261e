use glam::Vec2;

use crate::noise::{glsl_mod, noise, smoothstep};
use crate::params::FieldParams;

/// Angular sampling frequency of the ring jitter noise.
pub const JITTER_DIRECTION_SCALE: f32 = 3.0;
/// Radial sampling frequency of the ring jitter noise.
pub const JITTER_RADIUS_SCALE: f32 = 10.0;
pub const JITTER_TIME_SCALE: f32 = 0.2;
/// Angular frequency of the ring thickness breathing.
pub const THICKNESS_TIME_SCALE: f32 = 0.5;
pub const SWIRL_RADIUS_FREQUENCY: f32 = 20.0;
pub const SWIRL_ANGLE_FREQUENCY: f32 = 2.0;
pub const SWIRL_TIME_FREQUENCY: f32 = 0.5;

/// Summed contribution of every ring at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveField {
    /// UV offset applied to all cloud sampling.
    pub displacement: Vec2,
    /// Additive wave color weight, clamped to `[0, wave_intensity_max]`.
    pub intensity: f32,
}

pub fn ring_offset(params: &FieldParams, index: u32) -> f32 {
    index as f32 * params.ring_phase_step
}

/// Radius of ring `index` at `time`. A closed-form function of time, so the
/// same instant always yields the same radius.
pub fn ring_radius(params: &FieldParams, time: f32, index: u32) -> f32 {
    glsl_mod(
        time * params.ring_speed + ring_offset(params, index),
        params.ring_max_radius,
    )
}

/// `(1 - r / max)^exponent`: 1 at the sun, exactly 0 when the ring recycles.
pub fn ring_fade(params: &FieldParams, radius: f32) -> f32 {
    (1.0 - radius / params.ring_max_radius)
        .max(0.0)
        .powf(params.ring_fade_exponent)
}

/// Band half-width of ring `index`, breathing slowly over time.
pub fn ring_thickness(params: &FieldParams, time: f32, index: u32) -> f32 {
    params.ring_thickness
        + params.ring_thickness_swing * (THICKNESS_TIME_SCALE * time + index as f32).sin()
}

/// Sun position in aspect-corrected UV space, nudged by the pointer.
pub fn sun_center(params: &FieldParams, aspect: f32, pointer: Vec2) -> Vec2 {
    let anchor = Vec2::new(params.sun_anchor[0] * aspect, params.sun_anchor[1]);
    anchor + (pointer - Vec2::splat(0.5)) * params.pointer_influence
}

/// Displacement and wave intensity at `sun_uv`, the point relative to the
/// sun center.
pub fn wave_field(params: &FieldParams, sun_uv: Vec2, time: f32) -> WaveField {
    let dist = sun_uv.length();
    // Falls back to +x where the epsilon-shifted point is itself the origin.
    let dir = (sun_uv + Vec2::splat(params.sun_epsilon))
        .try_normalize()
        .unwrap_or(Vec2::X);
    let tangent = dir.perp();
    let angle = dir.y.atan2(dir.x);
    let edge = smoothstep(0.0, params.wave_edge_falloff, dist);

    let mut displacement = Vec2::ZERO;
    let mut sum = 0.0;
    for index in 0..params.ring_count {
        let radius = ring_radius(params, time, index);
        let jitter_at = (dir * JITTER_DIRECTION_SCALE)
            .extend(radius * JITTER_RADIUS_SCALE + time * JITTER_TIME_SCALE);
        let jitter = (noise(jitter_at) - 0.5) * params.ring_jitter;
        let thickness = ring_thickness(params, time, index);
        let band = 1.0 - smoothstep(0.0, thickness, (dist + jitter - radius).abs());
        let weight = band * ring_fade(params, radius);

        let swirl = (radius * SWIRL_RADIUS_FREQUENCY + angle * SWIRL_ANGLE_FREQUENCY
            - time * SWIRL_TIME_FREQUENCY)
            .sin();
        displacement += dir * (weight * edge * params.ring_push)
            + tangent * (weight * swirl * params.ring_swirl);
        sum += weight;
    }

    WaveField {
        displacement,
        intensity: (sum * params.wave_gain).clamp(0.0, params.wave_intensity_max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FieldParams {
        FieldParams::default()
    }

    #[test]
    fn ring_offsets_step_by_phase_constant() {
        let params = params();
        assert_eq!(ring_offset(&params, 0), 0.0);
        assert!((ring_offset(&params, 3) - 3.0 * 1.39723).abs() < 1e-6);
    }

    #[test]
    fn ring_radius_repeats_every_ten_seconds() {
        let params = params();
        let period = params.ring_max_radius / params.ring_speed;
        for time in [0.3_f32, 2.5, 7.1, 31.4] {
            for index in 0..params.ring_count {
                let now = ring_radius(&params, time, index);
                let later = ring_radius(&params, time + period, index);
                let diff = (now - later).abs();
                // A sample sitting right on the wrap may land on either side.
                let wrapped = (diff - params.ring_max_radius).abs();
                assert!(
                    diff.min(wrapped) < 1e-4,
                    "ring {index} at {time}: {now} vs {later}"
                );
            }
        }
    }

    #[test]
    fn ring_radius_stays_in_range() {
        let params = params();
        for step in 0..200 {
            let time = step as f32 * 0.37;
            for index in 0..params.ring_count {
                let radius = ring_radius(&params, time, index);
                assert!(radius >= -1e-6 && radius <= params.ring_max_radius + 1e-6);
            }
        }
    }

    #[test]
    fn ring_fade_hits_both_boundaries_exactly() {
        let params = params();
        assert_eq!(ring_fade(&params, 0.0), 1.0);
        assert_eq!(ring_fade(&params, params.ring_max_radius), 0.0);
        let mid = ring_fade(&params, 0.3);
        assert!((mid - 0.5f32.powf(1.5)).abs() < 1e-6);
    }

    #[test]
    fn sun_center_follows_pointer_by_a_fraction() {
        let params = params();
        let centered = sun_center(&params, 1.0, Vec2::splat(0.5));
        assert_eq!(centered, Vec2::new(0.5, 0.45));

        let corner = sun_center(&params, 2.0, Vec2::new(1.0, 0.0));
        assert!((corner.x - (1.0 + 0.075)).abs() < 1e-6);
        assert!((corner.y - (0.45 - 0.075)).abs() < 1e-6);
    }

    #[test]
    fn wave_field_is_finite_at_the_sun_center() {
        let params = params();
        let field = wave_field(&params, Vec2::ZERO, 3.0);
        assert!(field.displacement.is_finite());
        assert!(field.intensity.is_finite());
    }

    #[test]
    fn wave_field_is_finite_where_the_epsilon_cancels() {
        let params = params();
        let field = wave_field(&params, Vec2::splat(-params.sun_epsilon), 1.0);
        assert!(field.displacement.is_finite());
        assert!(field.intensity.is_finite());
    }

    #[test]
    fn wave_intensity_is_clamped() {
        let params = FieldParams {
            wave_gain: 100.0,
            ..FieldParams::default()
        };
        for step in 0..50 {
            let sun_uv = Vec2::new(step as f32 * 0.013, 0.02);
            let field = wave_field(&params, sun_uv, step as f32 * 0.4);
            assert!((0.0..=params.wave_intensity_max).contains(&field.intensity));
        }
    }

    #[test]
    fn no_rings_means_no_displacement() {
        let params = FieldParams {
            ring_count: 0,
            ..FieldParams::default()
        };
        let field = wave_field(&params, Vec2::new(0.2, 0.1), 5.0);
        assert_eq!(field.displacement, Vec2::ZERO);
        assert_eq!(field.intensity, 0.0);
    }
}
