use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use field::FieldParams;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Name of the configuration file looked up in the config directory.
pub const CONFIG_FILE_NAME: &str = "sunveil.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SunveilConfig {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetSetting>,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub field: FieldParams,
}

impl Default for SunveilConfig {
    fn default() -> Self {
        Self {
            version: 1,
            target: None,
            render: RenderSettings::default(),
            field: FieldParams::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RenderSettings {
    /// Frame cap; 0 means uncapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    #[serde(
        default,
        deserialize_with = "deserialize_antialias_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub antialias: Option<AntialiasSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_space: Option<ColorSpaceSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeSetting>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub still_time: Option<Duration>,
}

/// Where the backdrop attaches: a selector string or an integer element id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSetting {
    Selector(String),
    Element(u64),
}

impl Serialize for TargetSetting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TargetSetting::Selector(selector) => serializer.serialize_str(selector),
            TargetSetting::Element(id) => serializer.serialize_u64(*id),
        }
    }
}

impl<'de> Deserialize<'de> for TargetSetting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = TargetSetting;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an element id or a selector string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(TargetSetting::Selector(v.to_string()))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(TargetSetting::Element(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(v)
                    .map(TargetSetting::Element)
                    .map_err(|_| E::custom("element id must be non-negative"))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    /// MSAA sample count, or `None` for `Auto`.
    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

impl FromStr for AntialiasSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_antialias(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpaceSetting {
    Auto,
    Gamma,
    Linear,
}

impl FromStr for ColorSpaceSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gamma" | "srgb-off" => Ok(Self::Gamma),
            "linear" => Ok(Self::Linear),
            other => Err(format!(
                "invalid color space '{other}'; expected auto, gamma, or linear"
            )),
        }
    }
}

/// A `WIDTHxHEIGHT` size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeSetting {
    pub width: u32,
    pub height: u32,
}

impl FromStr for SizeSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        let (width, height) = normalized
            .split_once('x')
            .ok_or_else(|| format!("invalid size '{raw}'; expected WIDTHxHEIGHT"))?;
        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in size '{raw}'"))?;
        let height: u32 = height
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in size '{raw}'"))?;
        if width == 0 || height == 0 {
            return Err(format!("size '{raw}' must be non-zero in both dimensions"));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for SizeSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl Serialize for SizeSetting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SizeSetting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_antialias(&raw).map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            Some(parse_antialias(&value.to_string()).map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

impl SunveilConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SunveilConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Frame cap with `0` folded into "uncapped".
    pub fn fps_cap(&self) -> Option<f32> {
        self.render.fps.filter(|fps| *fps > 0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if let Some(TargetSetting::Selector(selector)) = &self.target {
            if selector.trim().is_empty() {
                return Err(ConfigError::Invalid("target selector may not be empty".into()));
            }
        }

        if let Some(fps) = self.render.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("render.fps must be >= 0".into()));
            }
        }

        self.field
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("field: {err}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1
target = "#hero"

[render]
fps = 30
antialias = 4
color_space = "linear"
size = "640x360"
still_time = "12s"

[field]
pointer_smoothing = 0.05
ring_count = 3
"##;

    #[test]
    fn parses_sample_config() {
        let config = SunveilConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.target, Some(TargetSetting::Selector("#hero".into())));
        assert_eq!(config.fps_cap(), Some(30.0));
        assert_eq!(config.render.antialias, Some(AntialiasSetting::Samples4));
        assert_eq!(config.render.color_space, Some(ColorSpaceSetting::Linear));
        assert_eq!(
            config.render.size,
            Some(SizeSetting {
                width: 640,
                height: 360
            })
        );
        assert_eq!(config.render.still_time, Some(Duration::from_secs(12)));
        assert_eq!(config.field.pointer_smoothing, 0.05);
        assert_eq!(config.field.ring_count, 3);
        assert_eq!(config.field.clouds.len(), 5);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = SunveilConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config.target, None);
        assert_eq!(config.fps_cap(), None);
        assert_eq!(config.field, FieldParams::default());
    }

    #[test]
    fn integer_target_is_an_element_id() {
        let config = SunveilConfig::from_toml_str("version = 1\ntarget = 3").unwrap();
        assert_eq!(config.target, Some(TargetSetting::Element(3)));
    }

    #[test]
    fn rejects_target_of_other_types() {
        for raw in ["target = true", "target = 1.5", "target = -2", "target = [1]"] {
            let err = SunveilConfig::from_toml_str(&format!("version = 1\n{raw}")).unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)), "{raw}");
        }
    }

    #[test]
    fn rejects_blank_selector() {
        let err = SunveilConfig::from_toml_str("version = 1\ntarget = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let config = SunveilConfig::from_toml_str("version = 1\n[render]\nfps = 0").unwrap();
        assert_eq!(config.fps_cap(), None);
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = SunveilConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_invalid_field_params() {
        let err = SunveilConfig::from_toml_str("version = 1\n[field]\npointer_smoothing = 0.0")
            .unwrap_err();
        match err {
            ConfigError::Invalid(message) => assert!(message.contains("pointer_smoothing")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_bad_size_and_antialias() {
        assert!(SunveilConfig::from_toml_str("version = 1\n[render]\nsize = \"0x10\"").is_err());
        assert!(SunveilConfig::from_toml_str("version = 1\n[render]\nsize = \"wide\"").is_err());
        assert!(SunveilConfig::from_toml_str("version = 1\n[render]\nantialias = 3").is_err());
    }

    #[test]
    fn still_time_accepts_fractional_seconds() {
        let config =
            SunveilConfig::from_toml_str("version = 1\n[render]\nstill_time = 2.5").unwrap();
        assert_eq!(config.render.still_time, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn parses_cli_style_values() {
        assert_eq!("1920x1080".parse::<SizeSetting>().unwrap().width, 1920);
        assert_eq!("Off".parse::<AntialiasSetting>().unwrap(), AntialiasSetting::Off);
        assert_eq!(AntialiasSetting::Samples8.samples(), Some(8));
        assert_eq!(AntialiasSetting::Auto.samples(), None);
        assert!("vivid".parse::<ColorSpaceSetting>().is_err());
    }
}
