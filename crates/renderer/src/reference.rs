//! CPU rendition of the field, used for still export and golden tests.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use field::{evaluate, FieldParams, FrameParams, Vec2};
use image::imageops::flip_vertical_in_place;
use image::{Rgb, RgbImage};

use crate::host::SurfaceSize;

/// Evaluates every pixel centre of a `size` image at `time`.
///
/// Rows are produced bottom-up like the fragment shader sees them, then
/// flipped so row 0 is the top of the picture.
pub fn render_image(
    size: SurfaceSize,
    time: f32,
    pointer: Vec2,
    params: &FieldParams,
) -> Result<RgbImage> {
    if size.is_empty() {
        bail!("cannot render an empty {size} image");
    }
    params.validate()?;

    let frame = FrameParams::new(
        time,
        Vec2::new(size.width as f32, size.height as f32),
        pointer,
    );
    let mut image = RgbImage::from_fn(size.width, size.height, |x, y| {
        let frag = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
        let color = evaluate(frag, &frame, params);
        Rgb([to_byte(color.x), to_byte(color.y), to_byte(color.z)])
    });
    flip_vertical_in_place(&mut image);
    Ok(image)
}

/// Renders a still and writes it to `path` as PNG.
///
/// The pointer sits at the origin, where a freshly attached backdrop starts.
pub fn export_png(path: &Path, size: SurfaceSize, time: f32, params: &FieldParams) -> Result<()> {
    let image = render_image(size, time, Vec2::ZERO, params)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write still frame to {}", path.display()))?;
    tracing::info!(path = %path.display(), %size, time, "still frame exported");
    Ok(())
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}
