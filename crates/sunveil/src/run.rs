use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fieldconfig::{AntialiasSetting, ColorSpaceSetting, SunveilConfig, TargetSetting};
use renderer::{
    Antialiasing, ColorSpaceMode, ElementId, RenderPolicy, Renderer, RendererConfig, SurfaceTarget,
};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;

pub fn run(args: RunArgs) -> Result<()> {
    let file = load_config(&args)?;
    let config = build_renderer_config(&args, file);
    tracing::info!(
        surface = %config.target,
        width = config.surface_size.0,
        height = config.surface_size.1,
        policy = ?config.policy,
        "starting sunveil"
    );
    let mut renderer = Renderer::new(config);
    renderer.run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn print_paths() -> Result<()> {
    let paths = AppPaths::discover()?;
    let config_file = paths.config_file();
    println!("Configuration:");
    println!("  dir:   {}", paths.config_dir().display());
    println!(
        "  file:  {} ({})",
        config_file.display(),
        if config_file.is_file() {
            "present"
        } else {
            "missing"
        }
    );
    Ok(())
}

/// An explicit `--config` must exist; the default location is optional.
fn load_config(args: &RunArgs) -> Result<SunveilConfig> {
    if let Some(path) = args.config.as_deref() {
        return read_config(path);
    }

    let paths = AppPaths::discover()?;
    let path = paths.config_file();
    if path.is_file() {
        read_config(&path)
    } else {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        Ok(SunveilConfig::default())
    }
}

fn read_config(path: &Path) -> Result<SunveilConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config = SunveilConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Layers CLI flags over the config file; flags win.
pub(crate) fn build_renderer_config(args: &RunArgs, file: SunveilConfig) -> RendererConfig {
    let defaults = RendererConfig::default();

    let target = match (&args.target, &file.target) {
        (Some(raw), _) => raw.parse::<SurfaceTarget>().unwrap_or_else(|never| match never {}),
        (None, Some(TargetSetting::Selector(selector))) => {
            SurfaceTarget::Selector(selector.trim().to_string())
        }
        (None, Some(TargetSetting::Element(id))) => SurfaceTarget::Element(ElementId(*id)),
        (None, None) => defaults.target,
    };

    let surface_size = args
        .size
        .or(file.render.size)
        .map(|size| (size.width, size.height))
        .unwrap_or(defaults.surface_size);

    let antialiasing = args
        .antialias
        .or_else(|| file.render.antialias.map(map_antialias))
        .unwrap_or(defaults.antialiasing);

    let color_space = args
        .color_space
        .or_else(|| file.render.color_space.map(map_color_space))
        .unwrap_or(defaults.color_space);

    let still_time = args
        .still_time
        .or_else(|| file.render.still_time.map(|duration| duration.as_secs_f32()))
        .unwrap_or(0.0);

    let policy = if let Some(path) = &args.export {
        RenderPolicy::Export {
            time: still_time,
            path: path.clone(),
        }
    } else if args.still {
        RenderPolicy::Still { time: still_time }
    } else {
        let target_fps = match args.fps {
            Some(fps) if fps > 0.0 => Some(fps),
            Some(_) => None,
            None => file.fps_cap(),
        };
        RenderPolicy::Animate { target_fps }
    };

    RendererConfig {
        surface_size,
        target,
        title: defaults.title,
        antialiasing,
        color_space,
        policy,
        params: file.field,
    }
}

fn map_antialias(setting: AntialiasSetting) -> Antialiasing {
    match setting.samples() {
        None => Antialiasing::Auto,
        Some(samples) if samples <= 1 => Antialiasing::Off,
        Some(samples) => Antialiasing::Samples(samples),
    }
}

fn map_color_space(setting: ColorSpaceSetting) -> ColorSpaceMode {
    match setting {
        ColorSpaceSetting::Auto => ColorSpaceMode::Auto,
        ColorSpaceSetting::Gamma => ColorSpaceMode::Gamma,
        ColorSpaceSetting::Linear => ColorSpaceMode::Linear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldconfig::SizeSetting;
    use std::path::PathBuf;

    const FILE: &str = r##"
version = 1
target = "#hero"

[render]
fps = 24.0
antialias = "4"
color_space = "linear"
size = "640x360"
still_time = "2s"

[field]
ring_count = 3
"##;

    fn file() -> SunveilConfig {
        SunveilConfig::from_toml_str(FILE).unwrap()
    }

    #[test]
    fn defaults_without_file_or_flags() {
        let config = build_renderer_config(&RunArgs::default(), SunveilConfig::default());
        assert_eq!(config.surface_size, (1280, 720));
        assert_eq!(config.target, SurfaceTarget::Selector("window".into()));
        assert_eq!(config.policy, RenderPolicy::Animate { target_fps: None });
        assert_eq!(config.antialiasing, Antialiasing::Auto);
        assert_eq!(config.color_space, ColorSpaceMode::Auto);
    }

    #[test]
    fn file_settings_apply() {
        let config = build_renderer_config(&RunArgs::default(), file());
        assert_eq!(config.surface_size, (640, 360));
        assert_eq!(config.target, SurfaceTarget::Selector("#hero".into()));
        assert_eq!(
            config.policy,
            RenderPolicy::Animate {
                target_fps: Some(24.0)
            }
        );
        assert_eq!(config.antialiasing, Antialiasing::Samples(4));
        assert_eq!(config.color_space, ColorSpaceMode::Linear);
        assert_eq!(config.params.ring_count, 3);
    }

    #[test]
    fn flags_override_file() {
        let args = RunArgs {
            target: Some("12".into()),
            size: Some(SizeSetting {
                width: 320,
                height: 200,
            }),
            fps: Some(0.0),
            antialias: Some(Antialiasing::Off),
            color_space: Some(ColorSpaceMode::Gamma),
            ..RunArgs::default()
        };
        let config = build_renderer_config(&args, file());
        assert_eq!(config.surface_size, (320, 200));
        assert_eq!(config.target, SurfaceTarget::Element(ElementId(12)));
        assert_eq!(config.policy, RenderPolicy::Animate { target_fps: None });
        assert_eq!(config.antialiasing, Antialiasing::Off);
        assert_eq!(config.color_space, ColorSpaceMode::Gamma);
    }

    #[test]
    fn export_wins_over_still() {
        let args = RunArgs {
            still: true,
            export: Some(PathBuf::from("frame.png")),
            ..RunArgs::default()
        };
        let config = build_renderer_config(&args, file());
        assert_eq!(
            config.policy,
            RenderPolicy::Export {
                time: 2.0,
                path: PathBuf::from("frame.png"),
            }
        );
    }

    #[test]
    fn still_uses_flag_time_before_file_time() {
        let args = RunArgs {
            still: true,
            still_time: Some(7.5),
            ..RunArgs::default()
        };
        let config = build_renderer_config(&args, file());
        assert_eq!(config.policy, RenderPolicy::Still { time: 7.5 });
    }

    #[test]
    fn element_targets_from_file() {
        let mut config_file = SunveilConfig::default();
        config_file.target = Some(TargetSetting::Element(5));
        let config = build_renderer_config(&RunArgs::default(), config_file);
        assert_eq!(config.target, SurfaceTarget::Element(ElementId(5)));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            config: Some(dir.path().join("absent.toml")),
            ..RunArgs::default()
        };
        let err = load_config(&args).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }
}
