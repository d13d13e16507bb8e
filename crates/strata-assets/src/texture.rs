use image::imageops::FilterType;
use image::ImageFormat;
use tracing::debug;

use crate::error::AssetError;

/// Pixel format of a decoded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
}

/// A decoded texture with raw pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAsset {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: TextureFormat,
}

/// Turns encoded image bytes into pixels.
pub trait ImageCodec: Send + Sync {
    /// Decode `bytes`, shrinking the image so neither edge exceeds `max_size`.
    fn decode(
        &self,
        bytes: &[u8],
        mime_type: Option<&str>,
        max_size: Option<u32>,
    ) -> Result<TextureAsset, AssetError>;
}

/// Decodes PNG/JPEG (and whatever else `image` was built with) to RGBA8.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImageCodec;

impl ImageCodec for DefaultImageCodec {
    fn decode(
        &self,
        bytes: &[u8],
        mime_type: Option<&str>,
        max_size: Option<u32>,
    ) -> Result<TextureAsset, AssetError> {
        let label = || mime_type.unwrap_or("image").to_string();

        let img = match mime_type.and_then(ImageFormat::from_mime_type) {
            Some(format) => image::load_from_memory_with_format(bytes, format),
            None => image::load_from_memory(bytes),
        }
        .map_err(|e| AssetError::Codec(label(), e.to_string()))?;

        let img = match max_size {
            Some(max) if img.width() > max || img.height() > max => {
                // `resize` keeps the aspect ratio and fits within the bounds.
                debug!("downsizing {}x{} texture to fit {}", img.width(), img.height(), max);
                img.resize(max, max, FilterType::Triangle)
            }
            _ => img,
        };

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(TextureAsset {
            width,
            height,
            data: rgba.into_raw(),
            format: TextureFormat::Rgba8,
        })
    }
}
