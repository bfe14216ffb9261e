use glam::{Vec3, Vec3Swizzles};

/// Number of octaves summed by [`fbm`]. The GPU program unrolls the same count.
pub const FBM_OCTAVES: usize = 6;

/// Amplitude of the first fbm octave.
pub const FBM_BASE_AMPLITUDE: f32 = 0.5;

pub const HASH_SCALE: f32 = 0.1031;
pub const HASH_SHUFFLE_BIAS: f32 = 31.32;

/// GLSL-style `fract`: `x - floor(x)`, always in `[0, 1)` for finite input.
#[inline]
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

#[inline]
fn fract3(v: Vec3) -> Vec3 {
    v - v.floor()
}

/// GLSL-style `smoothstep` with clamped Hermite interpolation.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// GLSL-style `mod`, the result takes the sign of `y`.
#[inline]
pub fn glsl_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

#[inline]
pub(crate) fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Seed-stable pseudo random scalar in `[0, 1)` for a lattice coordinate.
///
/// Two rounds of fractional folding with a component-shuffled dot product
/// keep axis-aligned repetition out of the sampling scales we use.
pub fn hash(p: Vec3) -> f32 {
    let mut p3 = fract3(p * HASH_SCALE);
    p3 += Vec3::splat(p3.dot(p3.zyx() + Vec3::splat(HASH_SHUFFLE_BIAS)));
    fract((p3.x + p3.y) * p3.z)
}

/// Trilinear value noise over unit lattice cells.
///
/// The fractional weights are shaped with `f * f * (3 - 2f)` so the field is
/// C¹ across cell boundaries.
pub fn noise(p: Vec3) -> f32 {
    let cell = p.floor();
    let f = fract3(p);
    let u = f * f * (Vec3::splat(3.0) - 2.0 * f);

    let corner = |x: f32, y: f32, z: f32| hash(cell + Vec3::new(x, y, z));

    let x00 = mix(corner(0.0, 0.0, 0.0), corner(1.0, 0.0, 0.0), u.x);
    let x10 = mix(corner(0.0, 1.0, 0.0), corner(1.0, 1.0, 0.0), u.x);
    let x01 = mix(corner(0.0, 0.0, 1.0), corner(1.0, 0.0, 1.0), u.x);
    let x11 = mix(corner(0.0, 1.0, 1.0), corner(1.0, 1.0, 1.0), u.x);

    let y0 = mix(x00, x10, u.y);
    let y1 = mix(x01, x11, u.y);
    mix(y0, y1, u.z)
}

/// Fractal Brownian motion: [`FBM_OCTAVES`] octaves of [`noise`].
///
/// `amplitude_decay` scales each successive octave's weight and
/// `frequency_growth` its sampling frequency.
pub fn fbm(p: Vec3, amplitude_decay: f32, frequency_growth: f32) -> f32 {
    let mut value = 0.0;
    let mut amplitude = FBM_BASE_AMPLITUDE;
    let mut frequency = 1.0;
    for _ in 0..FBM_OCTAVES {
        value += amplitude * noise(p * frequency);
        amplitude *= amplitude_decay;
        frequency *= frequency_growth;
    }
    value
}
