use std::borrow::Cow;
use std::fmt::Write as _;

use anyhow::{Context, Result};
use field::noise::{FBM_BASE_AMPLITUDE, FBM_OCTAVES, HASH_SCALE, HASH_SHUFFLE_BIAS};
use field::waves::{
    JITTER_DIRECTION_SCALE, JITTER_RADIUS_SCALE, JITTER_TIME_SCALE, SWIRL_ANGLE_FREQUENCY,
    SWIRL_RADIUS_FREQUENCY, SWIRL_TIME_FREQUENCY, THICKNESS_TIME_SCALE,
};
use field::{CloudLayer, FieldParams, SUN_CORE_RATIO};

/// Entry point names shared by the pipeline and the generated module.
pub(crate) const VERTEX_ENTRY: &str = "vs_main";
pub(crate) const FRAGMENT_ENTRY: &str = "fs_main";
/// Pipeline-overridable flag set when the swapchain format is sRGB.
pub(crate) const LINEAR_OUTPUT_OVERRIDE: &str = "LINEAR_OUTPUT";

/// Builds the shader module for the field described by `params`.
pub(crate) fn compile_field_shader(
    device: &wgpu::Device,
    params: &FieldParams,
) -> Result<wgpu::ShaderModule> {
    let source = field_shader_source(params).context("failed to generate field shader")?;
    tracing::debug!(bytes = source.len(), "generated field shader");
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("sunveil field shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
    }))
}

/// Produces the complete WGSL program for `params`.
///
/// Layout of the generated module:
///
/// 1. A prelude of `const` declarations, one per tunable value.
/// 2. `background_clouds` / `foreground_clouds`, unrolled from the layer lists.
/// 3. [`SHADER_BODY`], the fixed noise, wave and compositing code.
pub fn field_shader_source(params: &FieldParams) -> Result<String> {
    params.validate()?;

    let mut out = String::with_capacity(SHADER_BODY.len() + 4096);
    write_prelude(&mut out, params);
    write_cloud_pass(&mut out, "background_clouds", params.background_layers());
    write_cloud_pass(&mut out, "foreground_clouds", params.foreground_layers());
    out.push_str(SHADER_BODY);
    Ok(out)
}

fn write_prelude(out: &mut String, params: &FieldParams) {
    out.push_str("// Generated field constants.\n");
    const_f32(out, "HASH_SCALE", HASH_SCALE);
    const_f32(out, "HASH_SHUFFLE_BIAS", HASH_SHUFFLE_BIAS);
    const_u32(out, "FBM_OCTAVES", FBM_OCTAVES as u32);
    const_f32(out, "FBM_BASE_AMPLITUDE", FBM_BASE_AMPLITUDE);

    const_vec2(out, "SUN_ANCHOR", params.sun_anchor);
    const_f32(out, "POINTER_INFLUENCE", params.pointer_influence);
    const_f32(out, "SUN_EPSILON", params.sun_epsilon);
    const_f32(out, "SUN_RADIUS", params.sun_radius);
    const_f32(out, "SUN_CORE_RATIO", SUN_CORE_RATIO);
    const_f32(out, "SUN_GLOW_FALLOFF", params.sun_glow_falloff);
    const_f32(out, "SUN_GLOW_STRENGTH", params.sun_glow_strength);

    const_u32(out, "RING_COUNT", params.ring_count);
    const_f32(out, "RING_PHASE_STEP", params.ring_phase_step);
    const_f32(out, "RING_SPEED", params.ring_speed);
    const_f32(out, "RING_MAX_RADIUS", params.ring_max_radius);
    const_f32(out, "RING_FADE_EXPONENT", params.ring_fade_exponent);
    const_f32(out, "RING_THICKNESS", params.ring_thickness);
    const_f32(out, "RING_THICKNESS_SWING", params.ring_thickness_swing);
    const_f32(out, "THICKNESS_TIME_SCALE", THICKNESS_TIME_SCALE);
    const_f32(out, "RING_JITTER", params.ring_jitter);
    const_f32(out, "JITTER_DIRECTION_SCALE", JITTER_DIRECTION_SCALE);
    const_f32(out, "JITTER_RADIUS_SCALE", JITTER_RADIUS_SCALE);
    const_f32(out, "JITTER_TIME_SCALE", JITTER_TIME_SCALE);
    const_f32(out, "RING_PUSH", params.ring_push);
    const_f32(out, "RING_SWIRL", params.ring_swirl);
    const_f32(out, "SWIRL_RADIUS_FREQUENCY", SWIRL_RADIUS_FREQUENCY);
    const_f32(out, "SWIRL_ANGLE_FREQUENCY", SWIRL_ANGLE_FREQUENCY);
    const_f32(out, "SWIRL_TIME_FREQUENCY", SWIRL_TIME_FREQUENCY);
    const_f32(out, "WAVE_EDGE_FALLOFF", params.wave_edge_falloff);
    const_f32(out, "WAVE_GAIN", params.wave_gain);
    const_f32(out, "WAVE_INTENSITY_MAX", params.wave_intensity_max);

    const_f32(out, "CLOUD_TIME_SCALE", params.cloud_time_scale);
    const_f32(out, "GRAIN_AMPLITUDE", params.grain_amplitude);
    const_f32(out, "GRAIN_RATE", params.grain_rate);

    const_vec3(out, "SKY_TOP", params.sky_top);
    const_vec3(out, "SKY_BOTTOM", params.sky_bottom);
    const_vec3(out, "SUN_COLOR", params.sun_color);
    const_vec3(out, "GLOW_COLOR", params.glow_color);
    const_vec3(out, "WAVE_COLOR", params.wave_color);
    out.push('\n');
}

fn write_cloud_pass<'a>(
    out: &mut String,
    name: &str,
    layers: impl Iterator<Item = &'a CloudLayer>,
) {
    let _ = writeln!(
        out,
        "fn {name}(color_in: vec3<f32>, uv: vec2<f32>, height: f32, pointer: vec2<f32>, time: f32) -> vec3<f32> {{"
    );
    out.push_str("    var color = color_in;\n");
    for layer in layers {
        let _ = writeln!(
            out,
            "    color = composite_cloud(color, uv, height, pointer, time, {});",
            cloud_layer_literal(layer)
        );
    }
    out.push_str("    return color;\n}\n\n");
}

fn cloud_layer_literal(layer: &CloudLayer) -> String {
    format!(
        "CloudLayer({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
        float(layer.scale),
        vec2(layer.velocity),
        float(layer.flow),
        float(layer.seed),
        float(layer.falloff_origin),
        float(layer.falloff_exponent),
        vec2(layer.threshold),
        vec3(layer.color),
        float(layer.blend),
        float(layer.amplitude_decay),
        float(layer.frequency_growth),
    )
}

// `{:?}` always prints a decimal point or exponent, and the `f` suffix pins
// the literal to f32 inside struct constructors. Callers validate finiteness.
fn float(value: f32) -> String {
    format!("{value:?}f")
}

fn vec2(value: [f32; 2]) -> String {
    format!("vec2<f32>({}, {})", float(value[0]), float(value[1]))
}

fn vec3(value: [f32; 3]) -> String {
    format!(
        "vec3<f32>({}, {}, {})",
        float(value[0]),
        float(value[1]),
        float(value[2])
    )
}

fn const_f32(out: &mut String, name: &str, value: f32) {
    let _ = writeln!(out, "const {name}: f32 = {};", float(value));
}

fn const_u32(out: &mut String, name: &str, value: u32) {
    let _ = writeln!(out, "const {name}: u32 = {value}u;");
}

fn const_vec2(out: &mut String, name: &str, value: [f32; 2]) {
    let _ = writeln!(out, "const {name}: vec2<f32> = {};", vec2(value));
}

fn const_vec3(out: &mut String, name: &str, value: [f32; 3]) {
    let _ = writeln!(out, "const {name}: vec3<f32> = {};", vec3(value));
}

/// Fixed part of the field program. The uniform block must match
/// [`crate::FieldUniforms`].
const SHADER_BODY: &str = r"
struct FieldUniforms {
    resolution: vec2<f32>,
    pointer: vec2<f32>,
    time: f32,
    _pad0: f32,
    _pad1: vec2<f32>,
};

@group(0) @binding(0) var<uniform> frame: FieldUniforms;

override LINEAR_OUTPUT: bool = false;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
};

// Fullscreen triangle: (-1, 1), (3, 1), (-1, -3).
@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);
    var clip: VertexOutput;
    clip.position = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    return clip;
}

fn hash13(p: vec3<f32>) -> f32 {
    var p3 = fract(p * HASH_SCALE);
    p3 = p3 + dot(p3, p3.zyx + HASH_SHUFFLE_BIAS);
    return fract((p3.x + p3.y) * p3.z);
}

fn value_noise(p: vec3<f32>) -> f32 {
    let cell = floor(p);
    let f = fract(p);
    let u = f * f * (3.0 - 2.0 * f);

    let x00 = mix(hash13(cell), hash13(cell + vec3<f32>(1.0, 0.0, 0.0)), u.x);
    let x10 = mix(hash13(cell + vec3<f32>(0.0, 1.0, 0.0)), hash13(cell + vec3<f32>(1.0, 1.0, 0.0)), u.x);
    let x01 = mix(hash13(cell + vec3<f32>(0.0, 0.0, 1.0)), hash13(cell + vec3<f32>(1.0, 0.0, 1.0)), u.x);
    let x11 = mix(hash13(cell + vec3<f32>(0.0, 1.0, 1.0)), hash13(cell + vec3<f32>(1.0, 1.0, 1.0)), u.x);

    let y0 = mix(x00, x10, u.y);
    let y1 = mix(x01, x11, u.y);
    return mix(y0, y1, u.z);
}

fn fbm(p: vec3<f32>, decay: f32, growth: f32) -> f32 {
    var value = 0.0;
    var amplitude = FBM_BASE_AMPLITUDE;
    var frequency = 1.0;
    for (var i = 0u; i < FBM_OCTAVES; i = i + 1u) {
        value = value + amplitude * value_noise(p * frequency);
        amplitude = amplitude * decay;
        frequency = frequency * growth;
    }
    return value;
}

fn glsl_mod(x: f32, y: f32) -> f32 {
    return x - y * floor(x / y);
}

fn ring_radius(time: f32, index: u32) -> f32 {
    return glsl_mod(time * RING_SPEED + f32(index) * RING_PHASE_STEP, RING_MAX_RADIUS);
}

fn ring_fade(radius: f32) -> f32 {
    return pow(max(1.0 - radius / RING_MAX_RADIUS, 0.0), RING_FADE_EXPONENT);
}

struct WaveField {
    displacement: vec2<f32>,
    intensity: f32,
};

fn wave_field(sun_uv: vec2<f32>, time: f32) -> WaveField {
    let dist = length(sun_uv);
    let lean = sun_uv + vec2<f32>(SUN_EPSILON);
    var dir = vec2<f32>(1.0, 0.0);
    if length(lean) > 0.0 {
        dir = normalize(lean);
    }
    let tangent = vec2<f32>(-dir.y, dir.x);
    let angle = atan2(dir.y, dir.x);
    let edge = smoothstep(0.0, WAVE_EDGE_FALLOFF, dist);

    var displacement = vec2<f32>(0.0);
    var sum = 0.0;
    for (var i = 0u; i < RING_COUNT; i = i + 1u) {
        let radius = ring_radius(time, i);
        let jitter_at = vec3<f32>(dir * JITTER_DIRECTION_SCALE, radius * JITTER_RADIUS_SCALE + time * JITTER_TIME_SCALE);
        let jitter = (value_noise(jitter_at) - 0.5) * RING_JITTER;
        let thickness = RING_THICKNESS + RING_THICKNESS_SWING * sin(THICKNESS_TIME_SCALE * time + f32(i));
        let band = 1.0 - smoothstep(0.0, thickness, abs(dist + jitter - radius));
        let weight = band * ring_fade(radius);

        let swirl = sin(radius * SWIRL_RADIUS_FREQUENCY + angle * SWIRL_ANGLE_FREQUENCY - time * SWIRL_TIME_FREQUENCY);
        displacement = displacement + dir * (weight * edge * RING_PUSH) + tangent * (weight * swirl * RING_SWIRL);
        sum = sum + weight;
    }

    return WaveField(displacement, clamp(sum * WAVE_GAIN, 0.0, WAVE_INTENSITY_MAX));
}

struct CloudLayer {
    scale: f32,
    velocity: vec2<f32>,
    flow: f32,
    seed: f32,
    falloff_origin: f32,
    falloff_exponent: f32,
    threshold: vec2<f32>,
    color: vec3<f32>,
    blend: f32,
    decay: f32,
    growth: f32,
};

fn composite_cloud(color: vec3<f32>, uv: vec2<f32>, height: f32, pointer: vec2<f32>, time: f32, layer: CloudLayer) -> vec3<f32> {
    let q = uv * layer.scale + layer.velocity * time + (pointer - vec2<f32>(0.5)) * layer.flow;
    var density = fbm(vec3<f32>(q, time * CLOUD_TIME_SCALE + layer.seed), layer.decay, layer.growth);
    density = density * pow(max(layer.falloff_origin - height, 0.0), layer.falloff_exponent);
    let mask = smoothstep(layer.threshold.x, layer.threshold.y, density);
    return mix(color, layer.color, mask * layer.blend);
}

fn shade(frag: vec2<f32>) -> vec3<f32> {
    let resolution = max(frame.resolution, vec2<f32>(1.0));
    let uv = frag / resolution;
    let aspect = resolution.x / resolution.y;
    let p = vec2<f32>(uv.x * aspect, uv.y);

    let center = vec2<f32>(SUN_ANCHOR.x * aspect, SUN_ANCHOR.y) + (frame.pointer - vec2<f32>(0.5)) * POINTER_INFLUENCE;
    let sun_uv = p - center;
    let waves = wave_field(sun_uv, frame.time);
    let cloud_uv = p + waves.displacement;

    var color = mix(SKY_BOTTOM, SKY_TOP, smoothstep(0.0, 1.0, uv.y));
    color = background_clouds(color, cloud_uv, uv.y, frame.pointer, frame.time);

    let dist = length(sun_uv);
    color = color + GLOW_COLOR * (exp(-dist * SUN_GLOW_FALLOFF) * SUN_GLOW_STRENGTH);
    let disc = 1.0 - smoothstep(SUN_RADIUS * SUN_CORE_RATIO, SUN_RADIUS, dist);
    color = mix(color, SUN_COLOR, disc);

    color = color + WAVE_COLOR * waves.intensity;
    color = foreground_clouds(color, cloud_uv, uv.y, frame.pointer, frame.time);

    let grain_frame = floor(frame.time * GRAIN_RATE);
    let grain = (hash13(vec3<f32>(floor(frag), grain_frame)) - 0.5) * 2.0 * GRAIN_AMPLITUDE;
    color = color + vec3<f32>(grain);
    return clamp(color, vec3<f32>(0.0), vec3<f32>(1.0));
}

@fragment
fn fs_main(fragment_in: VertexOutput) -> @location(0) vec4<f32> {
    // Bottom-left origin, matching UV space.
    let frag = vec2<f32>(fragment_in.position.x, frame.resolution.y - fragment_in.position.y);
    var color = shade(frag);
    if LINEAR_OUTPUT {
        // sRGB swapchains re-encode on store.
        color = pow(color, vec3<f32>(2.2));
    }
    return vec4<f32>(color, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga;

    fn validate(source: &str) {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|err| panic!("{}", err.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .expect("generated shader validates");
    }

    fn references(body: &str, name: &str) -> bool {
        let is_ident = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        body.match_indices(name).any(|(at, _)| {
            !is_ident(body[..at].chars().next_back())
                && !is_ident(body[at + name.len()..].chars().next())
        })
    }

    #[test]
    fn default_field_shader_validates() {
        let source = field_shader_source(&FieldParams::default()).unwrap();
        validate(&source);
        assert!(source.contains("fn vs_main"));
        assert!(source.contains("fn fs_main"));
    }

    #[test]
    fn shader_body_uses_every_generated_constant() {
        let source = field_shader_source(&FieldParams::default()).unwrap();
        let names: Vec<&str> = source
            .lines()
            .filter_map(|line| line.strip_prefix("const "))
            .filter_map(|rest| rest.split(':').next())
            .collect();
        assert!(names.len() > 30, "prelude shrank: {names:?}");
        let unused: Vec<&str> = names
            .into_iter()
            .filter(|name| !references(SHADER_BODY, name))
            .collect();
        assert!(unused.is_empty(), "constants the shader body ignores: {unused:?}");
    }

    #[test]
    fn ring_direction_is_guarded_against_zero_length() {
        let source = field_shader_source(&FieldParams::default()).unwrap();
        assert!(source.contains("if length(lean) > 0.0 {"));
        assert!(!source.contains("normalize(sun_uv + vec2<f32>(SUN_EPSILON))"));
    }

    #[test]
    fn prelude_names_every_tunable() {
        let source = field_shader_source(&FieldParams::default()).unwrap();
        assert!(source.contains("const RING_COUNT: u32 = 5u;"));
        assert!(source.contains("const RING_PHASE_STEP: f32 = 1.39723f;"));
        assert!(source.contains("const RING_MAX_RADIUS: f32 = 0.6f;"));
        assert!(source.contains("const SUN_ANCHOR: vec2<f32> = vec2<f32>(0.5f, 0.45f);"));
        assert!(source.contains("const FBM_OCTAVES: u32 = 6u;"));
    }

    #[test]
    fn cloud_passes_unroll_each_layer() {
        let source = field_shader_source(&FieldParams::default()).unwrap();
        assert_eq!(source.matches("composite_cloud(color, uv").count(), 5);
    }

    #[test]
    fn empty_layer_lists_still_validate() {
        let params = FieldParams {
            clouds: Vec::new(),
            ring_count: 0,
            ..FieldParams::default()
        };
        validate(&field_shader_source(&params).unwrap());
    }

    #[test]
    fn whole_number_parameters_stay_float_literals() {
        let params = FieldParams {
            grain_rate: 30.0,
            ..FieldParams::default()
        };
        let source = field_shader_source(&params).unwrap();
        assert!(source.contains("const GRAIN_RATE: f32 = 30.0f;"));
        validate(&source);
    }

    #[test]
    fn invalid_parameters_are_rejected_before_generation() {
        let params = FieldParams {
            sun_radius: f32::INFINITY,
            ..FieldParams::default()
        };
        assert!(field_shader_source(&params).is_err());
    }
}
