//! Image loading utilities.
//!
//! Decodes image files into RGBA8 pixel data ready for texture upload.

use std::path::Path;

use crate::error::{RenderError, RenderResult};
use crate::types::{TextureFlip, TextureRotation};

/// Loaded texture data ready for GPU upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel).
    pub data: Vec<u8>,
    /// Original format of the image.
    pub format: ImageFormat,
}

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// Windows bitmap.
    Bmp,
    /// Truevision TGA (no magic bytes; detected by extension only).
    Tga,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "bmp" => Self::Bmp,
            "tga" => Self::Tga,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // BMP: "BM"
        if data.starts_with(b"BM") {
            return Self::Bmp;
        }

        Self::Unknown
    }
}

impl TextureData {
    /// Return a copy rotated and flipped for upload.
    ///
    /// Rotation is applied first.
    #[must_use]
    pub fn transformed(&self, rotation: TextureRotation, flip: TextureFlip) -> Self {
        if rotation == TextureRotation::None && flip == TextureFlip::None {
            return self.clone();
        }

        let Some(buffer) = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
        else {
            // Malformed pixel data; upload as-is and let the backend reject it.
            return self.clone();
        };

        let rotated = match rotation {
            TextureRotation::None => buffer,
            TextureRotation::Rotate90 => image::imageops::rotate90(&buffer),
            TextureRotation::Rotate180 => image::imageops::rotate180(&buffer),
            TextureRotation::Rotate270 => image::imageops::rotate270(&buffer),
        };

        let flipped = match flip {
            TextureFlip::None => rotated,
            TextureFlip::Horizontal => image::imageops::flip_horizontal(&rotated),
            TextureFlip::Vertical => image::imageops::flip_vertical(&rotated),
            TextureFlip::Both => image::imageops::rotate180(&rotated),
        };

        let (width, height) = flipped.dimensions();
        Self {
            width,
            height,
            data: flipped.into_raw(),
            format: self.format,
        }
    }
}

/// Load an image from raw bytes.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded.
pub fn load_image_from_bytes(data: &[u8]) -> RenderResult<TextureData> {
    let format = ImageFormat::from_magic_bytes(data);

    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(TextureData {
        width,
        height,
        data: rgba.into_raw(),
        format,
    })
}

/// Load an image from a file path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_image_file(path: &Path) -> RenderResult<TextureData> {
    let bytes = std::fs::read(path).map_err(|e| {
        RenderError::Resource(format!("Failed to read image {}: {e}", path.display()))
    })?;

    let mut texture = load_image_from_bytes(&bytes)?;
    if texture.format == ImageFormat::Unknown {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            texture.format = ImageFormat::from_extension(ext);
        }
    }

    tracing::debug!(
        "Loaded image {} ({}x{}, {:?})",
        path.display(),
        texture.width,
        texture.height,
        texture.format
    );
    Ok(texture)
}

/// Create a solid color texture.
///
/// # Errors
///
/// Returns [`RenderError::InvalidArgument`] if the pixel buffer size does not
/// fit in memory addressing.
pub fn create_solid_color(
    width: u32,
    height: u32,
    r: u8,
    g: u8,
    b: u8,
    a: u8,
) -> RenderResult<TextureData> {
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .filter(|count| count.checked_mul(4).is_some())
        .ok_or_else(|| {
            RenderError::InvalidArgument(format!("solid color image {width}x{height} is too large"))
        })?;

    Ok(TextureData {
        width,
        height,
        data: [r, g, b, a].repeat(pixel_count),
        format: ImageFormat::Unknown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pixel_strip() -> TextureData {
        // Red pixel then blue pixel, 2x1.
        TextureData {
            width: 2,
            height: 1,
            data: vec![255, 0, 0, 255, 0, 0, 255, 255],
            format: ImageFormat::Unknown,
        }
    }

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D]),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            ImageFormat::Jpeg
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"BM\0\0"), ImageFormat::Bmp);
        assert_eq!(ImageFormat::from_magic_bytes(&[0x00]), ImageFormat::Unknown);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("PNG"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_extension("tga"), ImageFormat::Tga);
        assert_eq!(ImageFormat::from_extension("gif"), ImageFormat::Unknown);
    }

    #[test]
    fn test_solid_color() {
        let texture = create_solid_color(3, 2, 1, 2, 3, 4).unwrap();
        assert_eq!(texture.data.len(), 3 * 2 * 4);
        assert_eq!(&texture.data[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_solid_color_size_overflow() {
        assert!(matches!(
            create_solid_color(u32::MAX, u32::MAX, 0, 0, 0, 255),
            Err(RenderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_flip_horizontal_swaps_pixels() {
        let flipped = two_pixel_strip().transformed(TextureRotation::None, TextureFlip::Horizontal);
        assert_eq!(&flipped.data[0..4], &[0, 0, 255, 255]);
        assert_eq!(&flipped.data[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_rotate90_swaps_dimensions() {
        let rotated = two_pixel_strip().transformed(TextureRotation::Rotate90, TextureFlip::None);
        assert_eq!((rotated.width, rotated.height), (1, 2));
    }

    #[test]
    fn test_identity_transform_is_copy() {
        let data = two_pixel_strip();
        assert_eq!(data.transformed(TextureRotation::None, TextureFlip::None), data);
    }

    #[test]
    fn test_load_png_roundtrip_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        image::RgbaImage::from_pixel(4, 3, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let texture = load_image_file(&path).unwrap();
        assert_eq!((texture.width, texture.height), (4, 3));
        assert_eq!(texture.format, ImageFormat::Png);
        assert_eq!(&texture.data[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_load_garbage_fails() {
        assert!(matches!(
            load_image_from_bytes(b"definitely not an image"),
            Err(RenderError::Resource(_))
        ));
    }
}
