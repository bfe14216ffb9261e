use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fieldconfig::SizeSetting;
use renderer::{Antialiasing, ColorSpaceMode};

#[derive(Parser, Debug)]
#[command(
    name = "sunveil",
    author,
    version,
    about = "Animated sun, wave and cloud backdrop",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to `sunveil.toml` in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Element to attach to: a selector (`window`, `body`, `#sunveil`) or an element id.
    #[arg(long, value_name = "SELECTOR|ID")]
    pub target: Option<String>,

    /// Window or export resolution (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<SizeSetting>,

    /// FPS cap (0 = uncapped).
    #[arg(long, value_name = "FPS", value_parser = parse_fps)]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space)]
    pub color_space: Option<ColorSpaceMode>,

    /// Freeze the window on a single frame instead of animating.
    #[arg(long)]
    pub still: bool,

    /// Timestamp to evaluate for still/export modes (seconds or e.g. `1m 30s`).
    #[arg(long, value_name = "SECONDS", value_parser = parse_still_time)]
    pub still_time: Option<f32>,

    /// Render a still frame on the CPU, write it to this PNG path and exit.
    #[arg(long, value_name = "PATH", value_parser = parse_export_path)]
    pub export: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved configuration directory and file.
    Paths,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<SizeSetting, String> {
    value.parse()
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid fps '{value}'"))?;
    if !fps.is_finite() || fps < 0.0 {
        return Err("fps must be a non-negative number".into());
    }
    Ok(fps)
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 1 {
                return Ok(Antialiasing::Off);
            }

            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }

            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_still_time(value: &str) -> Result<f32, String> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<f32>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err("still time must be a non-negative number of seconds".into());
        }
        return Ok(seconds);
    }
    humantime::parse_duration(trimmed)
        .map(|duration| duration.as_secs_f32())
        .map_err(|err| format!("invalid still time '{trimmed}': {err}"))
}

pub fn parse_export_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => Ok(path),
        None => Err("export path has no extension; expected .png".to_string()),
        Some(other) => Err(format!(
            "unsupported export format '.{other}'; expected .png"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_antialias_modes() {
        assert_eq!(parse_antialias("auto").unwrap(), Antialiasing::Auto);
        assert_eq!(parse_antialias("OFF").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("1").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("8").unwrap(), Antialiasing::Samples(8));
        assert!(parse_antialias("3").is_err());
        assert!(parse_antialias("").is_err());
    }

    #[test]
    fn parses_still_time_in_seconds_or_humantime() {
        assert_eq!(parse_still_time("12.5").unwrap(), 12.5);
        assert_eq!(parse_still_time("1m 30s").unwrap(), 90.0);
        assert!(parse_still_time("-1").is_err());
        assert!(parse_still_time("soon").is_err());
    }

    #[test]
    fn export_requires_png() {
        assert!(parse_export_path("frame.png").is_ok());
        assert!(parse_export_path("frame.PNG").is_ok());
        assert!(parse_export_path("frame.exr").is_err());
        assert!(parse_export_path("frame").is_err());
    }

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "sunveil",
            "--target",
            "#hero",
            "--size",
            "800x600",
            "--fps",
            "30",
            "--antialias",
            "4",
            "--color-space",
            "linear",
            "--still",
            "--still-time",
            "3",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        let run = cli.run;
        assert_eq!(run.target.as_deref(), Some("#hero"));
        assert_eq!(
            run.size,
            Some(SizeSetting {
                width: 800,
                height: 600
            })
        );
        assert_eq!(run.fps, Some(30.0));
        assert_eq!(run.antialias, Some(Antialiasing::Samples(4)));
        assert_eq!(run.color_space, Some(ColorSpaceMode::Linear));
        assert!(run.still);
        assert_eq!(run.still_time, Some(3.0));
    }

    #[test]
    fn parses_paths_subcommand() {
        let cli = Cli::try_parse_from(["sunveil", "paths"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Paths)));
    }

    #[test]
    fn rejects_malformed_size() {
        assert!(Cli::try_parse_from(["sunveil", "--size", "800"]).is_err());
        assert!(Cli::try_parse_from(["sunveil", "--fps", "-5"]).is_err());
    }
}
