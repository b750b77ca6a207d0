//! Rendering backend traits and implementations.
//!
//! A backend supplies the primitive operations that [`Engine`](crate::Engine)
//! and [`Canvas`](crate::Canvas) are built on. Everything above this seam is
//! API independent.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │     Engine (resources) │ Canvas (drawing)   │
//! ├─────────────────────────────────────────────┤
//! │   ResourceBackend      │   DrawBackend      │
//! ├────────────────────────┴────────────────────┤
//! │  OpenGL (rendition-opengl) │ Recording      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod recording;

use serde::{Deserialize, Serialize};

use crate::math::Mat4;
use crate::resource::{BufferId, ProgramId, ShaderId, TextureId, VertexArrayId, VertexAttribute};
use crate::types::{
    BufferDataUsage, BufferTarget, Capability, Color, ElementType, FaceName,
    MaterialParameterName, MaterialValue, RenderMode, ShaderType, TextureFilter, TextureFormat,
    TextureParameterName, TextureParameterTarget, TextureTarget, TextureWrap, UniformValue,
};
use crate::RenderResult;

pub use recording::{Command, CommandLog, RecordingBackend};

/// Available rendering backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendType {
    /// OpenGL through `glow`.
    OpenGl,
    /// Headless backend that records commands.
    Recording,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenGl => write!(f, "opengl"),
            Self::Recording => write!(f, "recording"),
        }
    }
}

/// Parameters of a texture image upload.
#[derive(Debug, Clone, Copy)]
pub struct TextureImage<'a> {
    /// Target texture.
    pub target: TextureTarget,
    /// Level of detail (0 is the base image).
    pub level: i32,
    /// Format the texture is stored in.
    pub internal_format: TextureFormat,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Pixel data format.
    pub format: TextureFormat,
    /// Pixel component type.
    pub element_type: ElementType,
    /// Pixel data; `None` allocates storage only.
    pub data: Option<&'a [u8]>,
}

/// Resource management primitives used by [`Engine`](crate::Engine).
pub trait ResourceBackend {
    /// Get the backend type.
    fn backend_type(&self) -> BackendType;

    /// Create a shader stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate the shader.
    fn create_shader(&mut self, kind: ShaderType) -> RenderResult<ShaderId>;

    /// Replace the source code of a shader.
    ///
    /// # Errors
    ///
    /// Returns an error if the shader is unknown.
    fn shader_source(&mut self, shader: ShaderId, code: &str) -> RenderResult<()>;

    /// Compile a shader.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Shader`](crate::RenderError::Shader) with the
    /// compiler log if compilation fails.
    fn compile_shader(&mut self, shader: ShaderId) -> RenderResult<()>;

    /// Delete a shader.
    ///
    /// # Errors
    ///
    /// Returns an error if the shader is unknown.
    fn delete_shader(&mut self, shader: ShaderId) -> RenderResult<()>;

    /// Create a program object.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate the program.
    fn create_program(&mut self) -> RenderResult<ProgramId>;

    /// Delete a program. Attached shaders are not deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the program is unknown.
    fn delete_program(&mut self, program: ProgramId) -> RenderResult<()>;

    /// Attach a compiled shader to a program.
    ///
    /// # Errors
    ///
    /// Returns an error if either object is unknown.
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> RenderResult<()>;

    /// Link a program.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Shader`](crate::RenderError::Shader) with the
    /// linker log if linking fails.
    fn link_program(&mut self, program: ProgramId) -> RenderResult<()>;

    /// Install a program for subsequent draws; `None` restores the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the program is unknown.
    fn use_program(&mut self, program: Option<ProgramId>) -> RenderResult<()>;

    /// Set a uniform on a program.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the value.
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue)
        -> RenderResult<()>;

    /// Set a 4x4 matrix uniform (or an array of them).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the value.
    fn set_uniform_matrix(
        &mut self,
        program: ProgramId,
        name: &str,
        count: usize,
        transpose: bool,
        values: &[f32],
    ) -> RenderResult<()>;

    /// Look up a vertex attribute location.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute is not active in the program.
    fn attribute_location(&mut self, program: ProgramId, name: &str) -> RenderResult<u32>;

    /// Create vertex array objects.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    fn create_vertex_arrays(&mut self, count: usize) -> RenderResult<Vec<VertexArrayId>>;

    /// Delete vertex array objects.
    ///
    /// # Errors
    ///
    /// Returns an error if any id is unknown.
    fn delete_vertex_arrays(&mut self, arrays: &[VertexArrayId]) -> RenderResult<()>;

    /// Bind a vertex array; `None` unbinds.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unknown.
    fn bind_vertex_array(&mut self, array: Option<VertexArrayId>) -> RenderResult<()>;

    /// Enable a generic vertex attribute on the bound vertex array.
    ///
    /// # Errors
    ///
    /// Returns an error if no vertex array is bound.
    fn enable_vertex_attribute(&mut self, index: u32) -> RenderResult<()>;

    /// Describe a generic vertex attribute inside the bound array buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is rejected.
    fn vertex_attribute_pointer(&mut self, attribute: &VertexAttribute) -> RenderResult<()>;

    /// Create buffer objects.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    fn create_buffers(&mut self, count: usize) -> RenderResult<Vec<BufferId>>;

    /// Delete buffer objects.
    ///
    /// # Errors
    ///
    /// Returns an error if any id is unknown.
    fn delete_buffers(&mut self, buffers: &[BufferId]) -> RenderResult<()>;

    /// Bind a buffer to a target; `None` unbinds.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unknown.
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) -> RenderResult<()>;

    /// Replace the data store of the buffer bound to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if no buffer is bound.
    fn buffer_data(
        &mut self,
        target: BufferTarget,
        data: &[u8],
        usage: BufferDataUsage,
    ) -> RenderResult<()>;

    /// Overwrite part of the data store of the buffer bound to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range exceeds the data store.
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8])
        -> RenderResult<()>;

    /// Generate texture names.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    fn generate_texture_ids(&mut self, count: usize) -> RenderResult<Vec<TextureId>>;

    /// Delete textures.
    ///
    /// # Errors
    ///
    /// Returns an error if any id is unknown.
    fn delete_textures(&mut self, textures: &[TextureId]) -> RenderResult<()>;

    /// Bind a texture to a target; `None` unbinds.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unknown.
    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureId>)
        -> RenderResult<()>;

    /// Set a texture parameter on the texture bound to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is rejected.
    fn set_texture_parameter(
        &mut self,
        target: TextureParameterTarget,
        name: TextureParameterName,
        value: f32,
    ) -> RenderResult<()>;

    /// Native parameter value for a wrap mode.
    fn translate_wrap(&self, value: TextureWrap) -> f32;

    /// Native parameter value for a filter.
    fn translate_filter(&self, value: TextureFilter) -> f32;

    /// Upload an image to the texture bound to `image.target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected.
    fn set_texture_image(&mut self, image: &TextureImage<'_>) -> RenderResult<()>;

    /// Flush queued commands.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn flush(&mut self) -> RenderResult<()>;
}

/// Immediate-mode drawing primitives used by [`Canvas`](crate::Canvas).
pub trait DrawBackend {
    /// Clear the color buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn clear(&mut self, color: Color) -> RenderResult<()>;

    /// Set the current texture coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn set_texture_coordinates(&mut self, s: f64, t: f64, r: f64, q: f64) -> RenderResult<()>;

    /// Set the current normal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn set_normal(&mut self, x: f64, y: f64, z: f64) -> RenderResult<()>;

    /// Emit a vertex with the current attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn vertex(&mut self, x: f64, y: f64, z: f64, w: f64) -> RenderResult<()>;

    /// Start a primitive block.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn begin(&mut self, mode: RenderMode) -> RenderResult<()>;

    /// Finish the current primitive block.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn end(&mut self) -> RenderResult<()>;

    /// Set a material parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn set_material_parameter(
        &mut self,
        face: FaceName,
        name: MaterialParameterName,
        value: MaterialValue,
    ) -> RenderResult<()>;

    /// Query a capability.
    fn is_enabled(&self, capability: Capability) -> bool;

    /// Enable or disable a capability.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn set_enabled(&mut self, capability: Capability, enabled: bool) -> RenderResult<()>;

    /// Set the current color.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn set_color(&mut self, color: Color) -> RenderResult<()>;

    /// Draw `count` vertices from the bound vertex array.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn draw_arrays(&mut self, mode: RenderMode, start: i32, count: i32) -> RenderResult<()>;

    /// Upload the current model-view matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn set_model_view(&mut self, matrix: &Mat4) -> RenderResult<()>;

    /// Upload the current projection matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    fn set_projection(&mut self, matrix: &Mat4) -> RenderResult<()>;

    /// Resize the drawing surface.
    ///
    /// # Errors
    ///
    /// Returns an error if resizing fails.
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;
}

/// A complete backend.
pub trait Backend: ResourceBackend + DrawBackend {}

impl<T: ResourceBackend + DrawBackend> Backend for T {}
