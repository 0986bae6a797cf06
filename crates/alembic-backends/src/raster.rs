//! Raster image conversions via the `image` crate.

use crate::backend::{require_input, write_cleanly, Backend, BackendError, ConvertTask};
use alembic_common::{BackendFamily, Capability};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

const FORMATS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "gif", "webp", "ico"];

/// Backend for raster image conversions.
pub struct ImageBackend {
    caps: Capability,
}

impl ImageBackend {
    /// The codecs are compiled into the `image` crate, so the full format
    /// set is always available.
    pub fn probe() -> Self {
        Self {
            caps: Capability::of(BackendFamily::Image, FORMATS, FORMATS),
        }
    }
}

impl Backend for ImageBackend {
    fn family(&self) -> BackendFamily {
        BackendFamily::Image
    }

    fn capabilities(&self) -> &Capability {
        &self.caps
    }

    fn convert(&self, task: &ConvertTask<'_>) -> Result<(), BackendError> {
        require_input(task.input)?;
        let format = target_image_format(task.target_format.as_str())?;

        write_cleanly(task.output, || {
            let img = image::open(task.input)?;
            match format {
                ImageFormat::Jpeg => {
                    // JPEG has no alpha channel; flatten onto white.
                    flatten_onto_white(&img).save_with_format(task.output, ImageFormat::Jpeg)?;
                }
                ImageFormat::Ico => {
                    // ICO entries are capped at 256x256.
                    img.thumbnail(256, 256)
                        .save_with_format(task.output, ImageFormat::Ico)?;
                }
                other => img.save_with_format(task.output, other)?,
            }
            Ok(())
        })
    }
}

fn target_image_format(token: &str) -> Result<ImageFormat, BackendError> {
    match token {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "bmp" => Ok(ImageFormat::Bmp),
        "tiff" => Ok(ImageFormat::Tiff),
        "gif" => Ok(ImageFormat::Gif),
        "webp" => Ok(ImageFormat::WebP),
        "ico" => Ok(ImageFormat::Ico),
        other => Err(BackendError::new(format!(
            "unsupported image format: {other}"
        ))),
    }
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut flat = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |fg: u8| ((fg as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        flat.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flat
}
