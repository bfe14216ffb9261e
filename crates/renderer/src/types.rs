use field::FieldParams;

use crate::host::SurfaceTarget;
use crate::runtime::RenderPolicy;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Same as `Gamma`: the field produces display-ready colors.
    #[default]
    Auto,
    /// Treat shader outputs as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and let an sRGB swapchain encode them.
    Linear,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// What we learned about the adapter wgpu picked.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    /// CPU rasterizers (llvmpipe, SwiftShader, WARP) report `Cpu`; some
    /// drivers only give themselves away by name.
    pub fn is_software(&self) -> bool {
        if self.device_type == wgpu::DeviceType::Cpu {
            return true;
        }
        let name = self.name.to_ascii_lowercase();
        ["llvmpipe", "softpipe", "swiftshader", "lavapipe", "warp"]
            .iter()
            .any(|marker| name.contains(marker))
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags and the config file: which surface to
/// attach to, how large the window should be, and how frames are produced.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size (or export size) in physical pixels.
    pub surface_size: (u32, u32),
    /// Element the backdrop attaches to.
    pub target: SurfaceTarget,
    /// Title of the host window; `#<title>` selects it.
    pub title: String,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Desired color handling for the swapchain.
    pub color_space: ColorSpaceMode,
    /// High-level render behaviour requested by the caller.
    pub policy: RenderPolicy,
    /// Tunables of the procedural field.
    pub params: FieldParams,
}

impl Default for RendererConfig {
    /// A 1280x720 animated window with the stock field.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            target: SurfaceTarget::Selector("window".into()),
            title: "sunveil".into(),
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            policy: RenderPolicy::default(),
            params: FieldParams::default(),
        }
    }
}
