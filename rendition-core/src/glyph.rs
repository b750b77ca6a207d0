//! Character glyphs for text rendering.
//!
//! A [`GlyphRasterizer`] turns a character into a coverage bitmap and metrics;
//! the canvas uploads the bitmap as a single-channel texture and keeps the
//! resulting [`CharacterGlyph`] for every later draw.

use std::collections::HashMap;

use crate::resource::TextureId;
use crate::RenderResult;

/// Glyph bitmap size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Offset from the pen position on the baseline to the glyph's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphBearing {
    /// Horizontal offset to the left edge.
    pub x: i32,
    /// Vertical offset to the top edge.
    pub y: i32,
}

/// A glyph uploaded to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterGlyph {
    /// Texture holding the glyph coverage.
    pub texture_id: TextureId,
    /// Bitmap size.
    pub size: GlyphSize,
    /// Bearing from the pen position.
    pub bearing: GlyphBearing,
    /// Horizontal advance in 1/64 pixel units.
    pub advance: u32,
}

impl CharacterGlyph {
    /// Advance in whole pixels.
    #[must_use]
    pub fn advance_pixels(&self) -> u32 {
        self.advance >> 6
    }

    /// Whether the glyph has no visible pixels (e.g. a space).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.size.width == 0 || self.size.height == 0
    }
}

/// Output of a rasterizer for one character.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RasterizedGlyph {
    /// Bitmap size.
    pub size: GlyphSize,
    /// Bearing from the pen position.
    pub bearing: GlyphBearing,
    /// Horizontal advance in 1/64 pixel units.
    pub advance: u32,
    /// Row-major 8-bit coverage, `width * height` bytes.
    pub bitmap: Vec<u8>,
}

/// Produces glyph bitmaps from a font.
pub trait GlyphRasterizer {
    /// Rasterize one character at the given pixel size.
    ///
    /// # Errors
    ///
    /// Returns an error if the character cannot be rasterized.
    fn rasterize(&mut self, ch: char, pixel_size: f32) -> RenderResult<RasterizedGlyph>;
}

/// Glyphs already uploaded, by character, all rasterized at one pixel size.
#[derive(Debug, Default)]
pub struct GlyphCache {
    glyphs: HashMap<char, CharacterGlyph>,
    pixel_size: Option<f32>,
}

impl GlyphCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the glyph for a character.
    pub fn register(&mut self, ch: char, glyph: CharacterGlyph) {
        self.glyphs.insert(ch, glyph);
    }

    /// Look up a glyph.
    #[must_use]
    pub fn get(&self, ch: char) -> Option<&CharacterGlyph> {
        self.glyphs.get(&ch)
    }

    /// Whether a character has been initialized.
    #[must_use]
    pub fn contains(&self, ch: char) -> bool {
        self.glyphs.contains_key(&ch)
    }

    /// Number of cached glyphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Remove all glyphs and return their texture ids.
    pub fn drain_textures(&mut self) -> Vec<TextureId> {
        self.pixel_size = None;
        self.glyphs.drain().map(|(_, g)| g.texture_id).collect()
    }

    /// Pixel size the cached glyphs were rasterized at.
    #[must_use]
    pub fn pixel_size(&self) -> Option<f32> {
        self.pixel_size
    }

    /// Switch the cache to `pixel_size`. Glyphs rasterized at another size
    /// are dropped and their texture ids returned.
    pub fn set_pixel_size(&mut self, pixel_size: f32) -> Vec<TextureId> {
        let stale = match self.pixel_size {
            Some(current) if current.to_bits() != pixel_size.to_bits() => self.drain_textures(),
            _ => Vec::new(),
        };
        self.pixel_size = Some(pixel_size);
        stale
    }
}

#[cfg(feature = "fonts")]
pub use fontdue_rasterizer::FontdueRasterizer;

#[cfg(feature = "fonts")]
mod fontdue_rasterizer {
    use std::path::Path;

    use super::{GlyphBearing, GlyphRasterizer, GlyphSize, RasterizedGlyph};
    use crate::{RenderError, RenderResult};

    /// Rasterizer backed by a `fontdue` font.
    pub struct FontdueRasterizer {
        font: fontdue::Font,
    }

    impl FontdueRasterizer {
        /// Parse a TrueType/OpenType font from memory.
        ///
        /// # Errors
        ///
        /// Returns an error if the font cannot be parsed.
        pub fn from_bytes(bytes: &[u8]) -> RenderResult<Self> {
            let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
                .map_err(|e| RenderError::Glyph(format!("Failed to parse font: {e}")))?;
            Ok(Self { font })
        }

        /// Load a font file.
        ///
        /// # Errors
        ///
        /// Returns an error if the file cannot be read or parsed.
        pub fn from_file(path: &Path) -> RenderResult<Self> {
            let bytes = std::fs::read(path).map_err(|e| {
                RenderError::Resource(format!("Failed to read font {}: {e}", path.display()))
            })?;
            tracing::debug!("Loaded font {}", path.display());
            Self::from_bytes(&bytes)
        }
    }

    impl std::fmt::Debug for FontdueRasterizer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FontdueRasterizer")
                .field("glyphs", &self.font.glyph_count())
                .finish()
        }
    }

    impl GlyphRasterizer for FontdueRasterizer {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_possible_wrap,
            clippy::cast_sign_loss
        )]
        fn rasterize(&mut self, ch: char, pixel_size: f32) -> RenderResult<RasterizedGlyph> {
            if pixel_size <= 0.0 {
                return Err(RenderError::InvalidArgument(format!(
                    "glyph pixel size must be positive, got {pixel_size}"
                )));
            }
            if self.font.lookup_glyph_index(ch) == 0 && !ch.is_whitespace() {
                tracing::debug!("Font has no glyph for {:?}, using .notdef", ch);
            }

            let (metrics, bitmap) = self.font.rasterize(ch, pixel_size);
            Ok(RasterizedGlyph {
                size: GlyphSize {
                    width: metrics.width as u32,
                    height: metrics.height as u32,
                },
                bearing: GlyphBearing {
                    x: metrics.xmin,
                    y: metrics.ymin + metrics.height as i32,
                },
                advance: (metrics.advance_width * 64.0).round().max(0.0) as u32,
                bitmap,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(width: u32, height: u32, advance: u32) -> CharacterGlyph {
        CharacterGlyph {
            texture_id: TextureId(1),
            size: GlyphSize { width, height },
            bearing: GlyphBearing::default(),
            advance,
        }
    }

    #[test]
    fn test_advance_is_fixed_point() {
        assert_eq!(glyph(8, 8, 640).advance_pixels(), 10);
        assert_eq!(glyph(8, 8, 63).advance_pixels(), 0);
    }

    #[test]
    fn test_blank_glyph() {
        assert!(glyph(0, 0, 640).is_blank());
        assert!(!glyph(1, 1, 640).is_blank());
    }

    #[test]
    fn test_cache_register_and_drain() {
        let mut cache = GlyphCache::new();
        cache.register('a', glyph(4, 4, 64));
        assert!(cache.contains('a'));
        assert!(!cache.contains('b'));
        assert_eq!(cache.drain_textures(), vec![TextureId(1)]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_pixel_size_change_drops_glyphs() {
        let mut cache = GlyphCache::new();
        assert!(cache.set_pixel_size(48.0).is_empty());
        cache.register('a', glyph(4, 4, 64));
        assert!(cache.set_pixel_size(48.0).is_empty());
        assert!(cache.contains('a'));

        assert_eq!(cache.set_pixel_size(24.0), vec![TextureId(1)]);
        assert!(cache.is_empty());
        assert_eq!(cache.pixel_size(), Some(24.0));
    }

    #[cfg(feature = "fonts")]
    #[test]
    fn test_fontdue_rejects_garbage() {
        assert!(matches!(
            FontdueRasterizer::from_bytes(b"not a font"),
            Err(crate::RenderError::Glyph(_))
        ));
    }

    #[cfg(feature = "fonts")]
    #[test]
    fn test_fontdue_missing_file() {
        let missing = std::path::Path::new("/nonexistent/font.ttf");
        assert!(matches!(
            FontdueRasterizer::from_file(missing),
            Err(crate::RenderError::Resource(_))
        ));
    }
}
