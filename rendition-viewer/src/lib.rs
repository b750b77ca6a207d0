//! # Rendition Viewer
//!
//! Desktop host that draws a model and a line of text through
//! [`rendition_core::Canvas`] on the OpenGL backend.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p rendition-viewer -- --model rendition-viewer/assets/tetrahedron.json \
//!     --font /usr/share/fonts/truetype/dejavu/DejaVuSans.ttf --bones
//! ```
//!
//! Without `--model` a built-in cube is shown.
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `ViewerConfig` - Window, canvas and backend settings
//! - `ViewerApp` - Main application implementing `ApplicationHandler`
//! - Uses `rendition-opengl::GlBackend` on a glutin context

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod app;
pub mod scene;

pub use app::ViewerApp;

use std::path::PathBuf;

use clap::Parser;
use rendition_core::CanvasConfig;
use rendition_opengl::GlBackendConfig;

/// Command-line arguments for rendition-viewer.
#[derive(Debug, Clone, Parser)]
#[command(name = "rendition-viewer")]
#[command(about = "Rendition model and text viewer")]
#[command(version)]
pub struct CliArgs {
    /// Model description (JSON) to display
    #[arg(long, env = "RENDITION_MODEL")]
    pub model: Option<PathBuf>,

    /// TrueType/OpenType font used for the overlay text
    #[arg(long, env = "RENDITION_FONT")]
    pub font: Option<PathBuf>,

    /// Overlay text
    #[arg(long, default_value = "Rendition")]
    pub text: String,

    /// Draw the model skeleton
    #[arg(long)]
    pub bones: bool,

    /// Edge length of the cube drawn at each bone
    #[arg(long, default_value = "0.3")]
    pub bone_size: f32,

    /// Keep the camera still
    #[arg(long)]
    pub no_spin: bool,

    /// Skip glGetError checks after each call
    #[arg(long)]
    pub no_gl_checks: bool,

    /// Window width in pixels
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value = "720")]
    pub height: u32,
}

/// Viewer configuration.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
    /// Model file; the built-in cube is used when `None`.
    pub model: Option<PathBuf>,
    /// Font file; text is skipped when `None`.
    pub font: Option<PathBuf>,
    /// Overlay text.
    pub text: String,
    /// Orbit the camera around the model.
    pub spin: bool,
    /// Canvas settings.
    pub canvas: CanvasConfig,
    /// OpenGL backend settings.
    pub backend: GlBackendConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Rendition".to_string(),
            model: None,
            font: None,
            text: "Rendition".to_string(),
            spin: true,
            canvas: CanvasConfig {
                width: 1280,
                height: 720,
                ..CanvasConfig::default()
            },
            backend: GlBackendConfig::default(),
        }
    }
}

impl From<CliArgs> for ViewerConfig {
    fn from(args: CliArgs) -> Self {
        let title = match &args.model {
            Some(path) => format!("Rendition - {}", path.display()),
            None => "Rendition".to_string(),
        };
        Self {
            width: args.width,
            height: args.height,
            title,
            model: args.model,
            font: args.font,
            text: args.text,
            spin: !args.no_spin,
            canvas: CanvasConfig {
                render_bones: args.bones,
                bone_size: args.bone_size,
                width: args.width,
                height: args.height,
                ..CanvasConfig::default()
            },
            backend: GlBackendConfig {
                check_errors: !args.no_gl_checks,
                ..GlBackendConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = CliArgs::parse_from(["rendition-viewer"]);
        let config = ViewerConfig::from(args);
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.model.is_none());
        assert!(config.spin);
        assert!(config.backend.check_errors);
        assert!(!config.canvas.render_bones);
        assert_eq!(config.text, "Rendition");
    }

    #[test]
    fn test_args_map_to_config() {
        let args = CliArgs::parse_from([
            "rendition-viewer",
            "--model",
            "assets/tetrahedron.json",
            "--bones",
            "--bone-size",
            "0.5",
            "--no-gl-checks",
            "--width",
            "640",
        ]);
        let config = ViewerConfig::from(args);
        assert_eq!(config.model, Some(PathBuf::from("assets/tetrahedron.json")));
        assert!(config.title.ends_with("tetrahedron.json"));
        assert!(config.canvas.render_bones);
        assert!((config.canvas.bone_size - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.canvas.width, 640);
        assert!(!config.backend.check_errors);
    }
}
