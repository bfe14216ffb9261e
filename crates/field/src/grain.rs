use glam::Vec2;

use crate::noise::hash;
use crate::params::FieldParams;

/// Index of the grain pattern shown at `time`.
pub fn grain_frame(params: &FieldParams, time: f32) -> f32 {
    (time * params.grain_rate).floor()
}

/// Signed film-grain offset in `[-amplitude, amplitude)` for one pixel.
pub fn grain_offset(params: &FieldParams, frag_coord: Vec2, time: f32) -> f32 {
    let seed = frag_coord.floor().extend(grain_frame(params, time));
    (hash(seed) - 0.5) * 2.0 * params.grain_amplitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_holds_within_one_grain_interval() {
        let params = FieldParams::default();
        let pixel = Vec2::new(13.5, 77.5);
        let a = grain_offset(&params, pixel, 1.001);
        let b = grain_offset(&params, pixel, 1.03);
        assert_eq!(a, b);
        assert_eq!(grain_frame(&params, 1.001), 24.0);
    }

    #[test]
    fn offsets_stay_within_amplitude() {
        let params = FieldParams::default();
        for x in 0..40 {
            for frame in 0..6 {
                let offset = grain_offset(&params, Vec2::new(x as f32, 3.0), frame as f32 / 24.0);
                assert!(offset.abs() <= params.grain_amplitude);
            }
        }
    }

    #[test]
    fn sub_pixel_positions_share_a_grain() {
        let params = FieldParams::default();
        let a = grain_offset(&params, Vec2::new(10.1, 20.2), 0.5);
        let b = grain_offset(&params, Vec2::new(10.9, 20.8), 0.5);
        assert_eq!(a, b);
    }
}
