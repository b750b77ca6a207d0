//! # Rendition OpenGL Backend
//!
//! A [`rendition_core::Backend`] over a `glow` context.
//!
//! Core profiles have no fixed-function pipeline, so the immediate-mode half
//! of the backend (`begin`/`vertex`/`end`, materials, lighting and texture
//! coordinate generation) is emulated: vertices are latched on the CPU,
//! assembled into triangles and drawn with a built-in shader.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 GlBackend                    │
//! ├──────────────────────┬───────────────────────┤
//! │ resources → glow     │ begin/vertex/end      │
//! │ (shaders, buffers,   │   → immediate batch   │
//! │  textures, VAOs)     │   → streaming VBO     │
//! └──────────────────────┴───────────────────────┘
//! ```
//!
//! The caller owns the window and the GL context; the backend only needs the
//! loaded function table.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod convert;
pub mod immediate;
mod shaders;

pub use backend::GlBackend;

use serde::{Deserialize, Serialize};

/// Configuration for the OpenGL backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlBackendConfig {
    /// Version directive prepended to shader sources that lack one.
    pub glsl_version: String,
    /// Query `glGetError` after every call and report failures.
    pub check_errors: bool,
}

impl Default for GlBackendConfig {
    fn default() -> Self {
        Self {
            glsl_version: "#version 330 core".to_string(),
            check_errors: true,
        }
    }
}

impl GlBackendConfig {
    /// Prepend the configured version directive unless `source` has one.
    #[must_use]
    pub fn versioned_source(&self, source: &str) -> String {
        if source.trim_start().starts_with("#version") {
            source.to_string()
        } else {
            format!("{}\n{}", self.glsl_version, source)
        }
    }
}
