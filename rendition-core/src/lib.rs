//! # Rendition Core
//!
//! Backend-independent engine and immediate-mode canvas.
//!
//! An [`Engine`] owns a rendering backend and manages GPU resources
//! (shaders, programs, vertex arrays, buffers, textures). A [`Canvas`] is
//! created from an engine and issues drawing commands: `begin`/`end`
//! primitive blocks, vertices, materials, textures, models and text.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │   Canvas: draw_model · draw_text · vertices  │
//! ├──────────────────────────────────────────────┤
//! │   Engine: shaders · buffers · textures       │
//! ├──────────────────────────────────────────────┤
//! │   Backend trait                              │
//! ├──────────────────────┬───────────────────────┤
//! │ OpenGL (glow)        │ Recording (headless)  │
//! └──────────────────────┴───────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod canvas;
pub mod engine;
pub mod error;
pub mod glyph;
pub mod image;
pub mod math;
pub mod model;
pub mod resource;
pub mod shaders;
pub mod texture;
pub mod types;

pub use backend::{Backend, BackendType, DrawBackend, RecordingBackend, ResourceBackend};
pub use canvas::Canvas;
pub use engine::{Engine, EngineRegistry};
pub use error::{RenderError, RenderResult};
pub use glyph::{CharacterGlyph, GlyphRasterizer, RasterizedGlyph};
pub use math::{Mat4, Vec2, Vec3};
pub use model::Model;
pub use texture::Texture;
pub use types::Color;

#[cfg(feature = "fonts")]
pub use glyph::FontdueRasterizer;

use serde::{Deserialize, Serialize};

/// Configuration for a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Draw model materials (otherwise only the first raw surface).
    pub render_models: bool,
    /// Draw the skeleton on top of the model.
    pub render_bones: bool,
    /// Edge length of the cube drawn at each bone.
    pub bone_size: f32,
    /// Pixel height glyphs are rasterized at.
    pub glyph_pixel_size: f32,
    /// Initial viewport width.
    pub width: u32,
    /// Initial viewport height.
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            render_models: true,
            render_bones: false,
            bone_size: 0.3,
            glyph_pixel_size: 48.0,
            width: 800,
            height: 600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_config_defaults() {
        let config = CanvasConfig::default();
        assert!(config.render_models);
        assert!(!config.render_bones);
        assert_eq!((config.width, config.height), (800, 600));
    }

    #[test]
    fn test_canvas_config_partial_json() {
        let config: CanvasConfig = serde_json::from_str(r#"{"render_bones": true}"#).unwrap();
        assert!(config.render_bones);
        assert!((config.bone_size - 0.3).abs() < f32::EPSILON);
    }
}
