use serde::{Deserialize, Serialize};

pub const DEFAULT_SUN_ANCHOR: [f32; 2] = [0.5, 0.45];
pub const DEFAULT_POINTER_INFLUENCE: f32 = 0.15;
pub const DEFAULT_POINTER_SMOOTHING: f32 = 0.01;
pub const DEFAULT_SUN_EPSILON: f32 = 1e-4;
pub const DEFAULT_SUN_RADIUS: f32 = 0.07;
pub const DEFAULT_SUN_GLOW_FALLOFF: f32 = 5.5;
pub const DEFAULT_SUN_GLOW_STRENGTH: f32 = 0.55;

pub const DEFAULT_RING_COUNT: u32 = 5;
pub const DEFAULT_RING_PHASE_STEP: f32 = 1.39723;
pub const DEFAULT_RING_SPEED: f32 = 0.06;
pub const DEFAULT_RING_MAX_RADIUS: f32 = 0.6;
pub const DEFAULT_RING_FADE_EXPONENT: f32 = 1.5;
pub const DEFAULT_RING_THICKNESS: f32 = 0.015;
pub const DEFAULT_RING_THICKNESS_SWING: f32 = 0.005;
pub const DEFAULT_RING_JITTER: f32 = 0.02;
pub const DEFAULT_RING_PUSH: f32 = 0.02;
pub const DEFAULT_RING_SWIRL: f32 = 0.01;
pub const DEFAULT_WAVE_EDGE_FALLOFF: f32 = 0.5;
pub const DEFAULT_WAVE_GAIN: f32 = 0.35;
pub const DEFAULT_WAVE_INTENSITY_MAX: f32 = 0.2;

pub const DEFAULT_CLOUD_TIME_SCALE: f32 = 0.05;
pub const DEFAULT_GRAIN_AMPLITUDE: f32 = 0.025;
pub const DEFAULT_GRAIN_RATE: f32 = 24.0;

pub const DEFAULT_SKY_TOP: [f32; 3] = [0.52, 0.45, 0.66];
pub const DEFAULT_SKY_BOTTOM: [f32; 3] = [0.99, 0.79, 0.63];
pub const DEFAULT_SUN_COLOR: [f32; 3] = [1.0, 0.95, 0.82];
pub const DEFAULT_GLOW_COLOR: [f32; 3] = [1.0, 0.68, 0.42];
pub const DEFAULT_WAVE_COLOR: [f32; 3] = [1.0, 0.88, 0.7];

/// Errors raised when a parameter set cannot drive the field.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FieldError {
    #[error("field parameter `{0}` must be a finite number")]
    NotFinite(String),
    #[error("field parameter `{name}` is out of range: {reason}")]
    OutOfRange { name: String, reason: String },
}

/// Whether a cloud layer is drawn behind or in front of the sun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudDepth {
    Background,
    Foreground,
}

/// One soft cloud mask composited over the accumulated color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudLayer {
    pub depth: CloudDepth,
    /// Multiplier applied to the displaced, aspect-corrected UV.
    pub scale: f32,
    /// Constant scroll velocity in UV units per second.
    pub velocity: [f32; 2],
    /// How strongly the pointer drags this layer (parallax).
    pub flow: f32,
    /// Offset along the time axis that decorrelates layers.
    pub seed: f32,
    /// Height at which the vertical falloff reaches zero.
    pub falloff_origin: f32,
    pub falloff_exponent: f32,
    /// Low and high edge of the smoothstep turning density into a mask.
    pub threshold: [f32; 2],
    pub color: [f32; 3],
    pub blend: f32,
    pub amplitude_decay: f32,
    pub frequency_growth: f32,
}

impl CloudLayer {
    fn validate(&self, index: usize) -> Result<(), FieldError> {
        let name = |field: &str| format!("clouds[{index}].{field}");
        finite(&name("scale"), self.scale)?;
        finite_all(&name("velocity"), &self.velocity)?;
        finite(&name("flow"), self.flow)?;
        finite(&name("seed"), self.seed)?;
        finite(&name("falloff_origin"), self.falloff_origin)?;
        finite(&name("falloff_exponent"), self.falloff_exponent)?;
        finite_all(&name("threshold"), &self.threshold)?;
        finite_all(&name("color"), &self.color)?;
        finite(&name("blend"), self.blend)?;
        finite(&name("amplitude_decay"), self.amplitude_decay)?;
        finite(&name("frequency_growth"), self.frequency_growth)?;

        if self.threshold[0] >= self.threshold[1] {
            return Err(FieldError::OutOfRange {
                name: name("threshold"),
                reason: "low edge must be below high edge".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.blend) {
            return Err(FieldError::OutOfRange {
                name: name("blend"),
                reason: "expected a value in [0, 1]".into(),
            });
        }
        if self.falloff_exponent < 0.0 {
            return Err(FieldError::OutOfRange {
                name: name("falloff_exponent"),
                reason: "must be non-negative".into(),
            });
        }
        Ok(())
    }
}

/// Every tunable constant of the field.
///
/// Defaults reproduce the stock look; a config file may override any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParams {
    pub sun_anchor: [f32; 2],
    pub pointer_influence: f32,
    /// Per-frame interpolation factor for the host's smoothed pointer.
    pub pointer_smoothing: f32,
    pub sun_epsilon: f32,
    pub sun_radius: f32,
    pub sun_glow_falloff: f32,
    pub sun_glow_strength: f32,

    pub ring_count: u32,
    pub ring_phase_step: f32,
    pub ring_speed: f32,
    pub ring_max_radius: f32,
    pub ring_fade_exponent: f32,
    pub ring_thickness: f32,
    pub ring_thickness_swing: f32,
    pub ring_jitter: f32,
    pub ring_push: f32,
    pub ring_swirl: f32,
    pub wave_edge_falloff: f32,
    pub wave_gain: f32,
    pub wave_intensity_max: f32,

    pub cloud_time_scale: f32,
    pub grain_amplitude: f32,
    /// Grain patterns per second, independent of the render frame rate.
    pub grain_rate: f32,

    pub sky_top: [f32; 3],
    pub sky_bottom: [f32; 3],
    pub sun_color: [f32; 3],
    pub glow_color: [f32; 3],
    pub wave_color: [f32; 3],

    pub clouds: Vec<CloudLayer>,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            sun_anchor: DEFAULT_SUN_ANCHOR,
            pointer_influence: DEFAULT_POINTER_INFLUENCE,
            pointer_smoothing: DEFAULT_POINTER_SMOOTHING,
            sun_epsilon: DEFAULT_SUN_EPSILON,
            sun_radius: DEFAULT_SUN_RADIUS,
            sun_glow_falloff: DEFAULT_SUN_GLOW_FALLOFF,
            sun_glow_strength: DEFAULT_SUN_GLOW_STRENGTH,
            ring_count: DEFAULT_RING_COUNT,
            ring_phase_step: DEFAULT_RING_PHASE_STEP,
            ring_speed: DEFAULT_RING_SPEED,
            ring_max_radius: DEFAULT_RING_MAX_RADIUS,
            ring_fade_exponent: DEFAULT_RING_FADE_EXPONENT,
            ring_thickness: DEFAULT_RING_THICKNESS,
            ring_thickness_swing: DEFAULT_RING_THICKNESS_SWING,
            ring_jitter: DEFAULT_RING_JITTER,
            ring_push: DEFAULT_RING_PUSH,
            ring_swirl: DEFAULT_RING_SWIRL,
            wave_edge_falloff: DEFAULT_WAVE_EDGE_FALLOFF,
            wave_gain: DEFAULT_WAVE_GAIN,
            wave_intensity_max: DEFAULT_WAVE_INTENSITY_MAX,
            cloud_time_scale: DEFAULT_CLOUD_TIME_SCALE,
            grain_amplitude: DEFAULT_GRAIN_AMPLITUDE,
            grain_rate: DEFAULT_GRAIN_RATE,
            sky_top: DEFAULT_SKY_TOP,
            sky_bottom: DEFAULT_SKY_BOTTOM,
            sun_color: DEFAULT_SUN_COLOR,
            glow_color: DEFAULT_GLOW_COLOR,
            wave_color: DEFAULT_WAVE_COLOR,
            clouds: default_cloud_layers(),
        }
    }
}

impl FieldParams {
    pub fn background_layers(&self) -> impl Iterator<Item = &CloudLayer> {
        self.clouds
            .iter()
            .filter(|layer| layer.depth == CloudDepth::Background)
    }

    pub fn foreground_layers(&self) -> impl Iterator<Item = &CloudLayer> {
        self.clouds
            .iter()
            .filter(|layer| layer.depth == CloudDepth::Foreground)
    }

    /// Checks that every value is usable both on the CPU and in generated WGSL.
    pub fn validate(&self) -> Result<(), FieldError> {
        finite_all("sun_anchor", &self.sun_anchor)?;
        for (name, value) in [
            ("pointer_influence", self.pointer_influence),
            ("pointer_smoothing", self.pointer_smoothing),
            ("sun_epsilon", self.sun_epsilon),
            ("sun_radius", self.sun_radius),
            ("sun_glow_falloff", self.sun_glow_falloff),
            ("sun_glow_strength", self.sun_glow_strength),
            ("ring_phase_step", self.ring_phase_step),
            ("ring_speed", self.ring_speed),
            ("ring_max_radius", self.ring_max_radius),
            ("ring_fade_exponent", self.ring_fade_exponent),
            ("ring_thickness", self.ring_thickness),
            ("ring_thickness_swing", self.ring_thickness_swing),
            ("ring_jitter", self.ring_jitter),
            ("ring_push", self.ring_push),
            ("ring_swirl", self.ring_swirl),
            ("wave_edge_falloff", self.wave_edge_falloff),
            ("wave_gain", self.wave_gain),
            ("wave_intensity_max", self.wave_intensity_max),
            ("cloud_time_scale", self.cloud_time_scale),
            ("grain_amplitude", self.grain_amplitude),
            ("grain_rate", self.grain_rate),
        ] {
            finite(name, value)?;
        }
        for (name, color) in [
            ("sky_top", &self.sky_top),
            ("sky_bottom", &self.sky_bottom),
            ("sun_color", &self.sun_color),
            ("glow_color", &self.glow_color),
            ("wave_color", &self.wave_color),
        ] {
            finite_all(name, color)?;
        }

        if !(self.pointer_smoothing > 0.0 && self.pointer_smoothing <= 1.0) {
            return Err(FieldError::OutOfRange {
                name: "pointer_smoothing".into(),
                reason: "expected a value in (0, 1]".into(),
            });
        }
        if self.sun_epsilon <= 0.0 {
            return Err(FieldError::OutOfRange {
                name: "sun_epsilon".into(),
                reason: "must be positive".into(),
            });
        }
        for (name, value) in [
            ("sun_radius", self.sun_radius),
            ("ring_max_radius", self.ring_max_radius),
            ("wave_edge_falloff", self.wave_edge_falloff),
            ("grain_rate", self.grain_rate),
        ] {
            if value <= 0.0 {
                return Err(FieldError::OutOfRange {
                    name: name.into(),
                    reason: "must be positive".into(),
                });
            }
        }
        if self.ring_thickness - self.ring_thickness.min(self.ring_thickness_swing.abs()) <= 0.0 {
            return Err(FieldError::OutOfRange {
                name: "ring_thickness".into(),
                reason: "must stay positive across the thickness swing".into(),
            });
        }
        if self.wave_intensity_max < 0.0 {
            return Err(FieldError::OutOfRange {
                name: "wave_intensity_max".into(),
                reason: "must be non-negative".into(),
            });
        }

        for (index, layer) in self.clouds.iter().enumerate() {
            layer.validate(index)?;
        }
        Ok(())
    }
}

fn finite(name: &str, value: f32) -> Result<(), FieldError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FieldError::NotFinite(name.to_string()))
    }
}

fn finite_all(name: &str, values: &[f32]) -> Result<(), FieldError> {
    values.iter().try_for_each(|value| finite(name, *value))
}

/// Two background belts and three foreground belts, with scroll velocities
/// at irrational ratios so the layers never line up again.
pub fn default_cloud_layers() -> Vec<CloudLayer> {
    vec![
        CloudLayer {
            depth: CloudDepth::Background,
            scale: 1.2,
            velocity: [0.011, 0.0013],
            flow: 0.02,
            seed: 0.0,
            falloff_origin: 1.1,
            falloff_exponent: 1.2,
            threshold: [0.35, 0.75],
            color: [0.98, 0.78, 0.66],
            blend: 0.35,
            amplitude_decay: 0.5,
            frequency_growth: 2.0,
        },
        CloudLayer {
            depth: CloudDepth::Background,
            scale: 2.1,
            velocity: [-0.0073, 0.0021],
            flow: 0.035,
            seed: 17.3,
            falloff_origin: 1.0,
            falloff_exponent: 1.6,
            threshold: [0.4, 0.8],
            color: [0.93, 0.66, 0.6],
            blend: 0.3,
            amplitude_decay: 0.55,
            frequency_growth: 2.1,
        },
        CloudLayer {
            depth: CloudDepth::Foreground,
            scale: 2.8,
            velocity: [0.0161, -0.0017],
            flow: 0.08,
            seed: 41.7,
            falloff_origin: 0.85,
            falloff_exponent: 2.0,
            threshold: [0.3, 0.7],
            color: [1.0, 0.93, 0.86],
            blend: 0.55,
            amplitude_decay: 0.5,
            frequency_growth: 2.2,
        },
        CloudLayer {
            depth: CloudDepth::Foreground,
            scale: 3.6,
            velocity: [-0.0119, 0.0031],
            flow: 0.11,
            seed: 73.1,
            falloff_origin: 0.7,
            falloff_exponent: 2.4,
            threshold: [0.28, 0.62],
            color: [0.99, 0.86, 0.78],
            blend: 0.5,
            amplitude_decay: 0.58,
            frequency_growth: 2.3,
        },
        CloudLayer {
            depth: CloudDepth::Foreground,
            scale: 5.2,
            velocity: [0.0229, 0.0007],
            flow: 0.14,
            seed: 97.9,
            falloff_origin: 0.55,
            falloff_exponent: 3.0,
            threshold: [0.22, 0.55],
            color: [1.0, 0.97, 0.94],
            blend: 0.6,
            amplitude_decay: 0.6,
            frequency_growth: 2.4,
        },
    ]
}
