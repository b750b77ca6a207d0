//! Minimal model description consumed by [`Canvas::draw_model`](crate::Canvas::draw_model).
//!
//! Models are plain data and can be loaded from JSON. Texture ids assigned
//! while drawing are stored back on the model so they are created once.

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::math::Vec3;
use crate::resource::TextureId;
use crate::types::Color;
use crate::{RenderError, RenderResult};

bitflags! {
    /// How a material texture is applied.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ModelTextureFlags: u32 {
        /// Regular texture mapped by vertex coordinates.
        const TEXTURE = 0b001;
        /// Sphere map (multiplicative).
        const MAP = 0b010;
        /// Sphere map (additive).
        const ADD_MAP = 0b100;
    }
}

/// Texture coordinate of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TexCoord {
    /// Horizontal coordinate.
    pub u: f64,
    /// Vertical coordinate.
    pub v: f64,
}

/// A model vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelVertex {
    /// Position.
    pub position: Vec3,
    /// Normal.
    #[serde(default)]
    pub normal: Vec3,
    /// Texture coordinate.
    #[serde(default)]
    pub texture: TexCoord,
}

/// Three vertices drawn as one triangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle(pub ModelVertex, pub ModelVertex, pub ModelVertex);

/// A texture slot of a material.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelTexture {
    /// How the texture is applied.
    #[serde(default)]
    pub flags: ModelTextureFlags,
    /// Texture image file, relative to the model's directory.
    #[serde(default)]
    pub texture_file_name: Option<String>,
    /// Sphere map image file, relative to the model's directory.
    #[serde(default)]
    pub map_file_name: Option<String>,
    /// Preloaded image used instead of the files.
    #[serde(skip)]
    pub picture: Option<crate::image::TextureData>,
    /// Texture created for this slot.
    #[serde(skip)]
    pub texture_id: Option<TextureId>,
    /// Sphere map texture created for this slot.
    #[serde(skip)]
    pub map_id: Option<TextureId>,
}

/// A material and the triangles drawn with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Texture slots, cycled one per draw.
    #[serde(default)]
    pub textures: Vec<ModelTexture>,
    /// Slot used by the most recent draw.
    #[serde(skip)]
    pub texture_index: Option<usize>,
    /// Diffuse color.
    pub diffuse: Color,
    /// Ambient color.
    pub ambient: Color,
    /// Specular color.
    #[serde(default)]
    pub specular: Color,
    /// Specular exponent.
    #[serde(default)]
    pub shininess: f32,
    /// Draw unlit regardless of the edge flag.
    #[serde(default)]
    pub always_light: bool,
    /// Material casts edges/shadows and is therefore lit.
    #[serde(default)]
    pub edge_flag: bool,
    /// Geometry.
    #[serde(default)]
    pub triangles: Vec<Triangle>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            textures: Vec::new(),
            texture_index: None,
            diffuse: Color::WHITE,
            ambient: Color::EMPTY,
            specular: Color::EMPTY,
            shininess: 0.0,
            always_light: false,
            edge_flag: false,
            triangles: Vec::new(),
        }
    }
}

impl Material {
    /// Move to the next texture slot, wrapping to the first.
    pub fn advance_texture_index(&mut self) -> usize {
        let next = match self.texture_index {
            Some(i) if i + 1 < self.textures.len() => i + 1,
            _ => 0,
        };
        self.texture_index = Some(next);
        next
    }

    /// The texture slot selected by the last advance.
    #[must_use]
    pub fn current_texture(&self) -> Option<&ModelTexture> {
        self.texture_index.and_then(|i| self.textures.get(i))
    }
}

/// Unindexed vertex soup used when materials are not rendered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Surface {
    /// Vertices, three per triangle.
    pub vertices: Vec<ModelVertex>,
}

/// A skeleton bone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    /// Bone name.
    #[serde(default)]
    pub name: String,
    /// Position in model space.
    pub position: Vec3,
    /// Index of the parent bone.
    #[serde(default)]
    pub parent: Option<usize>,
}

/// A renderable model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    /// Materials with their triangles.
    #[serde(default)]
    pub materials: Vec<Material>,
    /// Raw surfaces.
    #[serde(default)]
    pub surfaces: Vec<Surface>,
    /// Skeleton.
    #[serde(default)]
    pub bones: Vec<Bone>,
    /// Light every material regardless of its edge flag.
    #[serde(default)]
    pub ignore_edge_flag: bool,
    /// File the model was read from; texture paths resolve against its directory.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
    /// Whether material textures have been created.
    #[serde(skip)]
    pub materials_loaded: bool,
}

impl Model {
    /// Parse a model from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a bone parent is out of range.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Read a model from a JSON file and remember its location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> RenderResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let mut model = Self::from_json(&json)?;
        model.source_path = Some(path.to_path_buf());
        tracing::info!(
            "Loaded model {} ({} materials, {} bones)",
            path.display(),
            model.materials.len(),
            model.bones.len()
        );
        Ok(model)
    }

    /// Check cross references.
    ///
    /// # Errors
    ///
    /// Returns an error if a bone parent index is out of range or self-referential.
    pub fn validate(&self) -> RenderResult<()> {
        for (i, bone) in self.bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= self.bones.len() || parent == i {
                    return Err(RenderError::InvalidArgument(format!(
                        "bone {i} has invalid parent {parent}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Directory texture paths are resolved against.
    ///
    /// # Errors
    ///
    /// Returns an error if the model has no source path and the current
    /// directory cannot be determined.
    pub fn base_dir(&self) -> RenderResult<PathBuf> {
        match self.source_path.as_deref().and_then(Path::parent) {
            Some(dir) => Ok(dir.to_path_buf()),
            None => Ok(std::env::current_dir()?),
        }
    }
}
