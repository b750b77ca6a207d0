//! Engine: backend ownership and GPU resource management.
//!
//! Every resource operation validates its arguments and then forwards to the
//! backend. Handles returned here carry only ids; the backend owns the native
//! objects.

use std::path::Path;

use crate::backend::{Backend, BackendType, RecordingBackend, TextureImage};
use crate::canvas::Canvas;
use crate::resource::{
    RenderBuffer, Shader, ShaderProgram, TextureId, VertexArray, VertexAttribute, VertexElement,
};
use crate::shaders;
use crate::types::{
    BufferDataUsage, BufferTarget, ElementType, ShaderType, TextureParameterName,
    TextureParameterTarget, TextureParameterValue, TextureTarget, UniformValue,
};
use crate::{CanvasConfig, RenderError, RenderResult};

/// Owns a rendering backend and manages the resources created on it.
pub struct Engine {
    backend: Box<dyn Backend>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.backend.backend_type())
            .finish()
    }
}

impl Engine {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: Box<dyn Backend>) -> Self {
        tracing::debug!("Creating engine on {} backend", backend.backend_type());
        Self { backend }
    }

    /// Engine on a fresh [`RecordingBackend`].
    #[must_use]
    pub fn recording() -> Self {
        Self::new(Box::new(RecordingBackend::new()))
    }

    /// Type of the active backend.
    #[must_use]
    pub fn backend_type(&self) -> BackendType {
        self.backend.backend_type()
    }

    /// Turn this engine into a canvas that draws through it.
    #[must_use]
    pub fn create_canvas(self, config: CanvasConfig) -> Canvas {
        Canvas::new(self, config)
    }

    pub(crate) fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    // --- Shaders ---

    /// Create an empty shader stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate the shader.
    pub fn create_shader(&mut self, kind: ShaderType) -> RenderResult<Shader> {
        let id = self.backend.create_shader(kind)?;
        Ok(Shader {
            id,
            kind,
            compiled: false,
        })
    }

    /// Set a shader's source and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Shader`] with the compile log on failure.
    pub fn load_shader(&mut self, shader: &mut Shader, code: &str) -> RenderResult<()> {
        self.backend.shader_source(shader.id, code)?;
        self.compile_shader(shader)
    }

    /// Compile a shader whose source has been set.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Shader`] with the compile log on failure.
    pub fn compile_shader(&mut self, shader: &mut Shader) -> RenderResult<()> {
        shader.compiled = false;
        self.backend.compile_shader(shader.id)?;
        shader.compiled = true;
        tracing::debug!("Compiled {:?} shader {}", shader.kind, shader.id);
        Ok(())
    }

    /// Delete a shader stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the shader is unknown to the backend.
    pub fn delete_shader(&mut self, shader: Shader) -> RenderResult<()> {
        self.backend.delete_shader(shader.id)
    }

    /// Create and compile a shader from source text.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or compilation fails.
    pub fn create_shader_from_string(
        &mut self,
        kind: ShaderType,
        code: &str,
    ) -> RenderResult<Shader> {
        let mut shader = self.create_shader(kind)?;
        self.load_shader(&mut shader, code)?;
        Ok(shader)
    }

    /// Create and compile a shader from a source file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] if the file cannot be read, or a
    /// shader error if compilation fails.
    pub fn create_shader_from_file(
        &mut self,
        kind: ShaderType,
        path: impl AsRef<Path>,
    ) -> RenderResult<Shader> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Resource(format!("Failed to read shader {}: {e}", path.display()))
        })?;
        self.create_shader_from_string(kind, &code)
    }

    /// Create and compile one of the built-in shaders by name.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] if no built-in shader of that name
    /// and stage exists.
    pub fn create_shader_from_resource(
        &mut self,
        kind: ShaderType,
        name: &str,
    ) -> RenderResult<Shader> {
        let code = shaders::builtin(name, kind).ok_or_else(|| {
            RenderError::Resource(format!("No built-in {kind:?} shader named '{name}'"))
        })?;
        self.create_shader_from_string(kind, code)
    }

    // --- Programs ---

    /// Create an empty shader program.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate the program.
    pub fn create_shader_program(&mut self) -> RenderResult<ShaderProgram> {
        let id = self.backend.create_program()?;
        Ok(ShaderProgram::new(id))
    }

    /// Delete a program. Its shaders stay alive and must be deleted
    /// separately.
    ///
    /// # Errors
    ///
    /// Returns an error if the program is unknown to the backend.
    pub fn delete_shader_program(&mut self, program: ShaderProgram) -> RenderResult<()> {
        self.backend.delete_program(program.id)
    }

    /// Attach a compiled shader. The program must be relinked afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidState`] if the shader is not compiled.
    pub fn attach_shader_to_program(
        &mut self,
        program: &mut ShaderProgram,
        shader: Shader,
    ) -> RenderResult<()> {
        if !shader.compiled {
            return Err(RenderError::InvalidState(format!(
                "shader {} must be compiled before it is attached",
                shader.id
            )));
        }
        self.backend.attach_shader(program.id, shader.id)?;
        program.shaders.push(shader);
        program.linked = false;
        Ok(())
    }

    /// Link a program.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Shader`] with the link log on failure.
    pub fn link_program(&mut self, program: &mut ShaderProgram) -> RenderResult<()> {
        program.linked = false;
        self.backend.link_program(program.id)?;
        program.linked = true;
        tracing::debug!(
            "Linked program {} ({} stages)",
            program.id,
            program.shaders.len()
        );
        Ok(())
    }

    /// Make a program current, linking it first if needed. `None` unbinds.
    ///
    /// # Errors
    ///
    /// Returns an error if linking fails.
    pub fn use_program(&mut self, program: Option<&mut ShaderProgram>) -> RenderResult<()> {
        match program {
            Some(program) => {
                if !program.linked {
                    self.link_program(program)?;
                }
                self.backend.use_program(Some(program.id))
            }
            None => self.backend.use_program(None),
        }
    }

    /// Set a uniform. Booleans are uploaded as `0`/`1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the value.
    pub fn set_program_uniform(
        &mut self,
        program: &ShaderProgram,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> RenderResult<()> {
        self.backend.set_uniform(program.id, name, value.into())
    }

    /// Set a `mat4` uniform (or array of `count` matrices).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgument`] if `values` does not hold
    /// `count` matrices.
    pub fn set_program_uniform_matrix(
        &mut self,
        program: &ShaderProgram,
        name: &str,
        count: usize,
        transpose: bool,
        values: &[f32],
    ) -> RenderResult<()> {
        if values.len() != count * 16 {
            return Err(RenderError::InvalidArgument(format!(
                "uniform '{name}' expects {} floats for {count} matrices, got {}",
                count * 16,
                values.len()
            )));
        }
        self.backend
            .set_uniform_matrix(program.id, name, count, transpose, values)
    }

    /// Location of a vertex attribute in a linked program.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute is not active in the program.
    pub fn get_program_attribute_location(
        &mut self,
        program: &ShaderProgram,
        name: &str,
    ) -> RenderResult<u32> {
        self.backend.attribute_location(program.id, name)
    }

    // --- Vertex arrays ---

    /// Create `count` vertex arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate them.
    pub fn create_vertex_arrays(&mut self, count: usize) -> RenderResult<Vec<VertexArray>> {
        Ok(self
            .backend
            .create_vertex_arrays(count)?
            .into_iter()
            .map(|id| VertexArray { id })
            .collect())
    }

    /// Create one vertex array.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate it.
    pub fn create_vertex_array(&mut self) -> RenderResult<VertexArray> {
        self.create_vertex_arrays(1)?
            .pop()
            .ok_or_else(|| RenderError::Resource("backend returned no vertex array".to_string()))
    }

    /// Delete vertex arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if any array is unknown to the backend.
    pub fn delete_vertex_arrays(&mut self, arrays: &[VertexArray]) -> RenderResult<()> {
        let ids: Vec<_> = arrays.iter().map(|a| a.id).collect();
        self.backend.delete_vertex_arrays(&ids)
    }

    /// Delete one vertex array.
    ///
    /// # Errors
    ///
    /// Returns an error if the array is unknown to the backend.
    pub fn delete_vertex_array(&mut self, array: VertexArray) -> RenderResult<()> {
        self.delete_vertex_arrays(&[array])
    }

    /// Bind a vertex array.
    ///
    /// # Errors
    ///
    /// Returns an error if the array is unknown to the backend.
    pub fn bind_vertex_array(&mut self, array: &VertexArray) -> RenderResult<()> {
        self.backend.bind_vertex_array(Some(array.id))
    }

    /// Unbind the current vertex array.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn unbind_vertex_array(&mut self) -> RenderResult<()> {
        self.backend.bind_vertex_array(None)
    }

    /// Enable a generic vertex attribute on the bound vertex array.
    ///
    /// # Errors
    ///
    /// Returns an error if no vertex array is bound.
    pub fn enable_vertex_attribute(&mut self, index: u32) -> RenderResult<()> {
        self.backend.enable_vertex_attribute(index)
    }

    /// Describe a vertex attribute inside the bound array buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgument`] if `size` is not in `1..=4`
    /// or the stride or offset is negative.
    pub fn set_vertex_attribute_pointer(
        &mut self,
        index: u32,
        size: i32,
        element_type: ElementType,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) -> RenderResult<()> {
        if !(1..=4).contains(&size) {
            return Err(RenderError::InvalidArgument(format!(
                "vertex attribute size must be 1 to 4, got {size}"
            )));
        }
        if stride < 0 || offset < 0 {
            return Err(RenderError::InvalidArgument(format!(
                "vertex attribute stride and offset must be non-negative, got {stride} and {offset}"
            )));
        }
        self.backend.vertex_attribute_pointer(&VertexAttribute {
            index,
            size,
            element_type,
            normalized,
            stride,
            offset,
        })
    }

    /// [`set_vertex_attribute_pointer`](Self::set_vertex_attribute_pointer)
    /// with the element type taken from `T`.
    ///
    /// # Errors
    ///
    /// See [`set_vertex_attribute_pointer`](Self::set_vertex_attribute_pointer).
    pub fn set_vertex_attribute_pointer_typed<T: VertexElement>(
        &mut self,
        index: u32,
        size: i32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) -> RenderResult<()> {
        self.set_vertex_attribute_pointer(index, size, T::ELEMENT_TYPE, normalized, stride, offset)
    }

    // --- Buffers ---

    /// Create `count` buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate them.
    pub fn create_buffers(&mut self, count: usize) -> RenderResult<Vec<RenderBuffer>> {
        Ok(self
            .backend
            .create_buffers(count)?
            .into_iter()
            .map(|id| RenderBuffer { id, target: None })
            .collect())
    }

    /// Create one buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate it.
    pub fn create_buffer(&mut self) -> RenderResult<RenderBuffer> {
        self.create_buffers(1)?
            .pop()
            .ok_or_else(|| RenderError::Resource("backend returned no buffer".to_string()))
    }

    /// Delete buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if any buffer is unknown to the backend.
    pub fn delete_buffers(&mut self, buffers: &[RenderBuffer]) -> RenderResult<()> {
        let ids: Vec<_> = buffers.iter().map(|b| b.id).collect();
        self.backend.delete_buffers(&ids)
    }

    /// Bind a buffer to a target and remember the target on the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is unknown to the backend.
    pub fn bind_buffer(&mut self, buffer: &mut RenderBuffer, target: BufferTarget) -> RenderResult<()> {
        self.backend.bind_buffer(target, Some(buffer.id))?;
        buffer.target = Some(target);
        Ok(())
    }

    /// Unbind the target a buffer was last bound to.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidState`] if the buffer was never bound.
    pub fn unbind_buffer(&mut self, buffer: &RenderBuffer) -> RenderResult<()> {
        let target = Self::buffer_target(buffer)?;
        self.backend.bind_buffer(target, None)
    }

    /// Allocate and fill a buffer's data store.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidState`] if the buffer was never bound.
    pub fn set_buffer_data<T: bytemuck::Pod>(
        &mut self,
        buffer: &RenderBuffer,
        data: &[T],
        usage: BufferDataUsage,
    ) -> RenderResult<()> {
        let target = Self::buffer_target(buffer)?;
        self.backend
            .buffer_data(target, bytemuck::cast_slice(data), usage)
    }

    /// Overwrite part of a buffer's data store. `offset` is in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer was never bound or the range exceeds
    /// the store.
    pub fn set_buffer_sub_data<T: bytemuck::Pod>(
        &mut self,
        buffer: &RenderBuffer,
        offset: usize,
        data: &[T],
    ) -> RenderResult<()> {
        let target = Self::buffer_target(buffer)?;
        self.backend
            .buffer_sub_data(target, offset, bytemuck::cast_slice(data))
    }

    fn buffer_target(buffer: &RenderBuffer) -> RenderResult<BufferTarget> {
        buffer.target.ok_or_else(|| {
            RenderError::InvalidState(format!("buffer {} has never been bound", buffer.id))
        })
    }

    // --- Textures ---

    /// Reserve `count` texture ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate them.
    pub fn generate_texture_ids(&mut self, count: usize) -> RenderResult<Vec<TextureId>> {
        self.backend.generate_texture_ids(count)
    }

    /// Reserve one texture id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate it.
    pub fn generate_texture_id(&mut self) -> RenderResult<TextureId> {
        self.generate_texture_ids(1)?
            .pop()
            .ok_or_else(|| RenderError::Resource("backend returned no texture id".to_string()))
    }

    /// Delete textures.
    ///
    /// # Errors
    ///
    /// Returns an error if any texture is unknown to the backend.
    pub fn delete_textures(&mut self, textures: &[TextureId]) -> RenderResult<()> {
        self.backend.delete_textures(textures)
    }

    /// Bind a texture to a target; `None` unbinds the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the texture is unknown to the backend.
    pub fn bind_texture(
        &mut self,
        target: TextureTarget,
        texture: Option<TextureId>,
    ) -> RenderResult<()> {
        self.backend.bind_texture(target, texture)
    }

    /// Set a parameter of the texture bound to `target`.
    ///
    /// Wrap modes and filters are translated to backend values first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the parameter.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_texture_parameter(
        &mut self,
        target: TextureParameterTarget,
        name: TextureParameterName,
        value: impl Into<TextureParameterValue>,
    ) -> RenderResult<()> {
        let value = match value.into() {
            TextureParameterValue::Float(v) => v,
            TextureParameterValue::Int(v) => v as f32,
            TextureParameterValue::Wrap(w) => self.backend.translate_wrap(w),
            TextureParameterValue::Filter(f) => self.backend.translate_filter(f),
        };
        self.backend.set_texture_parameter(target, name, value)
    }

    /// Upload a texture image to the texture bound to `image.target`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgument`] if the data length does not
    /// match `width * height * components * element size`.
    pub fn set_texture_image(&mut self, image: &TextureImage<'_>) -> RenderResult<()> {
        if let Some(data) = image.data {
            let expected = image.width as usize
                * image.height as usize
                * image.format.components()
                * image.element_type.size_bytes();
            if data.len() != expected {
                return Err(RenderError::InvalidArgument(format!(
                    "texture image {}x{} {:?} needs {expected} bytes, got {}",
                    image.width,
                    image.height,
                    image.format,
                    data.len()
                )));
            }
        }
        self.backend.set_texture_image(image)
    }

    /// Flush pending commands.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn flush(&mut self) -> RenderResult<()> {
        self.backend.flush()
    }
}

type BackendFactory = Box<dyn Fn() -> RenderResult<Box<dyn Backend>>>;

/// Named backend factories.
///
/// Factories are tried in registration order by
/// [`create_default`](Self::create_default); when none succeeds the
/// recording backend is used.
#[derive(Default)]
pub struct EngineRegistry {
    factories: Vec<(String, BackendFactory)>,
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("available", &self.available())
            .finish()
    }
}

impl EngineRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a name. A later registration with the same
    /// name replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> RenderResult<Box<dyn Backend>> + 'static,
    {
        let name = name.into();
        self.factories.retain(|(n, _)| *n != name);
        self.factories.push((name, Box::new(factory)));
    }

    /// Names of the registered factories, in registration order.
    #[must_use]
    pub fn available(&self) -> Vec<&str> {
        self.factories.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Create an engine from a named factory.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NoBackend`] if no factory has that name, or the
    /// factory's own error.
    pub fn create(&self, name: &str) -> RenderResult<Engine> {
        let (_, factory) = self
            .factories
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| RenderError::NoBackend(format!("no engine registered as '{name}'")))?;
        Ok(Engine::new(factory()?))
    }

    /// Create an engine from the first factory that succeeds, falling back to
    /// a [`RecordingBackend`].
    #[must_use]
    pub fn create_default(&self) -> Engine {
        for (name, factory) in &self.factories {
            match factory() {
                Ok(backend) => return Engine::new(backend),
                Err(e) => {
                    tracing::warn!("Engine '{}' unavailable, falling back: {}", name, e);
                }
            }
        }
        tracing::warn!("No engine available, using the recording backend");
        Engine::recording()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Command, CommandLog, ResourceBackend};
    use crate::types::{TextureFilter, TextureFormat, TextureWrap};

    fn engine() -> (Engine, CommandLog) {
        let backend = RecordingBackend::new();
        let log = backend.log();
        (Engine::new(Box::new(backend)), log)
    }

    #[test]
    fn test_shader_from_string_compiles() {
        let (mut engine, log) = engine();
        let shader = engine
            .create_shader_from_string(ShaderType::Vertex, "void main() {}")
            .unwrap();
        assert!(shader.compiled);
        assert_eq!(log.count(|c| matches!(c, Command::CompileShader(_))), 1);
    }

    #[test]
    fn test_unknown_resource_shader() {
        let (mut engine, _) = engine();
        assert!(matches!(
            engine.create_shader_from_resource(ShaderType::Vertex, "nope.vert"),
            Err(RenderError::Resource(_))
        ));
    }

    #[test]
    fn test_missing_shader_file() {
        let (mut engine, _) = engine();
        assert!(matches!(
            engine.create_shader_from_file(ShaderType::Fragment, "/nonexistent/a.frag"),
            Err(RenderError::Resource(_))
        ));
    }

    #[test]
    fn test_use_program_links_lazily() {
        let (mut engine, log) = engine();
        let mut program = engine.create_shader_program().unwrap();
        let shader = engine
            .create_shader_from_resource(ShaderType::Vertex, shaders::TEXT_VERTEX_NAME)
            .unwrap();
        engine.attach_shader_to_program(&mut program, shader).unwrap();
        assert!(!program.linked);

        engine.use_program(Some(&mut program)).unwrap();
        assert!(program.linked);
        assert_eq!(log.count(|c| matches!(c, Command::LinkProgram(_))), 1);

        engine.use_program(Some(&mut program)).unwrap();
        assert_eq!(log.count(|c| matches!(c, Command::LinkProgram(_))), 1);
    }

    #[test]
    fn test_attach_uncompiled_shader_fails() {
        let (mut engine, _) = engine();
        let mut program = engine.create_shader_program().unwrap();
        let shader = engine.create_shader(ShaderType::Vertex).unwrap();
        assert!(matches!(
            engine.attach_shader_to_program(&mut program, shader),
            Err(RenderError::InvalidState(_))
        ));
    }

    #[test]
    fn test_bool_uniform_uploads_int() {
        let (mut engine, log) = engine();
        let program = engine.create_shader_program().unwrap();
        engine.set_program_uniform(&program, "flag", true).unwrap();
        assert!(log.commands().contains(&Command::Uniform {
            program: program.id,
            name: "flag".to_string(),
            value: UniformValue::Int(1),
        }));
    }

    #[test]
    fn test_uniform_matrix_length_checked() {
        let (mut engine, _) = engine();
        let program = engine.create_shader_program().unwrap();
        assert!(matches!(
            engine.set_program_uniform_matrix(&program, "m", 1, false, &[0.0; 9]),
            Err(RenderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_attribute_pointer_size_validated() {
        let (mut engine, _) = engine();
        assert!(matches!(
            engine.set_vertex_attribute_pointer_typed::<f32>(0, 5, false, 0, 0),
            Err(RenderError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.set_vertex_attribute_pointer_typed::<f32>(0, 0, false, 0, 0),
            Err(RenderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_typed_attribute_pointer_element_type() {
        let (mut engine, log) = engine();
        let vao = engine.create_vertex_array().unwrap();
        let mut vbo = engine.create_buffer().unwrap();
        engine.bind_vertex_array(&vao).unwrap();
        engine.bind_buffer(&mut vbo, BufferTarget::ArrayBuffer).unwrap();
        engine
            .set_vertex_attribute_pointer_typed::<u16>(1, 2, true, 4, 0)
            .unwrap();

        let pointer = log.commands().into_iter().find_map(|c| match c {
            Command::VertexAttributePointer(a) => Some(a),
            _ => None,
        });
        assert_eq!(pointer.unwrap().element_type, ElementType::UnsignedShort);
    }

    #[test]
    fn test_buffer_data_requires_bind() {
        let (mut engine, _) = engine();
        let buffer = engine.create_buffer().unwrap();
        assert!(matches!(
            engine.set_buffer_data(&buffer, &[1.0f32, 2.0], BufferDataUsage::StaticDraw),
            Err(RenderError::InvalidState(_))
        ));
    }

    #[test]
    fn test_buffer_data_byte_length() {
        let (mut engine, log) = engine();
        let mut buffer = engine.create_buffer().unwrap();
        engine.bind_buffer(&mut buffer, BufferTarget::ArrayBuffer).unwrap();
        engine
            .set_buffer_data(&buffer, &[0.0f32; 6], BufferDataUsage::DynamicDraw)
            .unwrap();
        assert!(log.commands().contains(&Command::BufferData {
            target: BufferTarget::ArrayBuffer,
            len: 24,
            usage: BufferDataUsage::DynamicDraw,
        }));
    }

    #[test]
    fn test_texture_parameter_translation() {
        let (mut engine, log) = engine();
        engine
            .set_texture_parameter(
                TextureParameterTarget::Texture2D,
                TextureParameterName::WrapS,
                TextureWrap::ClampToEdge,
            )
            .unwrap();
        engine
            .set_texture_parameter(
                TextureParameterTarget::Texture2D,
                TextureParameterName::MinFilter,
                TextureFilter::Nearest,
            )
            .unwrap();

        let backend = RecordingBackend::new();
        let commands = log.commands();
        assert!(commands.contains(&Command::TextureParameter {
            target: TextureParameterTarget::Texture2D,
            name: TextureParameterName::WrapS,
            value: backend.translate_wrap(TextureWrap::ClampToEdge),
        }));
        assert!(commands.contains(&Command::TextureParameter {
            target: TextureParameterTarget::Texture2D,
            name: TextureParameterName::MinFilter,
            value: backend.translate_filter(TextureFilter::Nearest),
        }));
    }

    #[test]
    fn test_texture_image_length_checked() {
        let (mut engine, _) = engine();
        let id = engine.generate_texture_id().unwrap();
        engine.bind_texture(TextureTarget::Texture2D, Some(id)).unwrap();
        let data = [0u8; 7];
        let result = engine.set_texture_image(&TextureImage {
            target: TextureTarget::Texture2D,
            level: 0,
            internal_format: TextureFormat::Rgba,
            width: 2,
            height: 1,
            format: TextureFormat::Rgba,
            element_type: ElementType::UnsignedByte,
            data: Some(&data),
        });
        assert!(matches!(result, Err(RenderError::InvalidArgument(_))));
    }

    #[test]
    fn test_registry_create_by_name() {
        let mut registry = EngineRegistry::new();
        registry.register("recording", || Ok(Box::new(RecordingBackend::new())));
        assert_eq!(registry.available(), vec!["recording"]);
        assert_eq!(
            registry.create("recording").unwrap().backend_type(),
            BackendType::Recording
        );
        assert!(matches!(
            registry.create("vulkan"),
            Err(RenderError::NoBackend(_))
        ));
    }

    #[test]
    fn test_registry_default_falls_back() {
        let mut registry = EngineRegistry::new();
        registry.register("broken", || {
            Err(RenderError::NoBackend("no display".to_string()))
        });
        assert_eq!(
            registry.create_default().backend_type(),
            BackendType::Recording
        );
    }
}
