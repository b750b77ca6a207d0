//! Headless backend that records every call.
//!
//! Used when no GPU is available and by the test suite, which inspects the
//! recorded command stream through a [`CommandLog`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use crate::math::Mat4;
use crate::resource::{BufferId, ProgramId, ShaderId, TextureId, VertexArrayId, VertexAttribute};
use crate::types::{
    BufferDataUsage, BufferTarget, Capability, Color, FaceName, MaterialParameterName,
    MaterialValue, RenderMode, ShaderType, TextureFilter, TextureFormat, TextureParameterName,
    TextureParameterTarget, TextureTarget, TextureWrap, UniformValue,
};
use crate::{RenderError, RenderResult};

use super::{BackendType, DrawBackend, ResourceBackend, TextureImage};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Command {
    Clear(Color),
    TexCoord([f64; 4]),
    Normal([f64; 3]),
    Vertex([f64; 4]),
    Begin(RenderMode),
    End,
    Material {
        face: FaceName,
        name: MaterialParameterName,
        value: MaterialValue,
    },
    SetCapability(Capability, bool),
    Color(Color),
    DrawArrays {
        mode: RenderMode,
        start: i32,
        count: i32,
    },
    ModelView(Mat4),
    Projection(Mat4),
    Resize(u32, u32),
    CreateShader(ShaderId, ShaderType),
    ShaderSource(ShaderId, String),
    CompileShader(ShaderId),
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    DeleteProgram(ProgramId),
    AttachShader(ProgramId, ShaderId),
    LinkProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    Uniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    UniformMatrix {
        program: ProgramId,
        name: String,
        count: usize,
        transpose: bool,
        values: Vec<f32>,
    },
    CreateVertexArray(VertexArrayId),
    DeleteVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    EnableVertexAttribute(u32),
    VertexAttributePointer(VertexAttribute),
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    BindBuffer(BufferTarget, Option<BufferId>),
    BufferData {
        target: BufferTarget,
        len: usize,
        usage: BufferDataUsage,
    },
    BufferSubData {
        target: BufferTarget,
        offset: usize,
        data: Vec<u8>,
    },
    GenerateTexture(TextureId),
    DeleteTexture(TextureId),
    BindTexture(TextureTarget, Option<TextureId>),
    TextureParameter {
        target: TextureParameterTarget,
        name: TextureParameterName,
        value: f32,
    },
    TextureImage {
        target: TextureTarget,
        level: i32,
        width: u32,
        height: u32,
        format: TextureFormat,
        len: usize,
    },
    Flush,
}

/// Shared view of the commands a [`RecordingBackend`] has received.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    inner: Arc<Mutex<Vec<Command>>>,
}

impl CommandLog {
    fn push(&self, command: Command) {
        tracing::trace!(?command, "record");
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    /// Snapshot of all recorded commands.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return all recorded commands.
    #[must_use]
    pub fn take(&self) -> Vec<Command> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count commands matching a predicate.
    pub fn count(&self, predicate: impl Fn(&Command) -> bool) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| predicate(c))
            .count()
    }
}

#[derive(Debug, Default)]
struct ProgramState {
    shaders: Vec<ShaderId>,
    attributes: HashMap<String, u32>,
}

/// Backend that records calls instead of drawing.
#[derive(Debug)]
pub struct RecordingBackend {
    log: CommandLog,
    next_id: u32,
    shaders: HashMap<ShaderId, (ShaderType, String)>,
    programs: HashMap<ProgramId, ProgramState>,
    vertex_arrays: HashSet<VertexArrayId>,
    buffers: HashMap<BufferId, usize>,
    textures: HashSet<TextureId>,
    bound_vertex_array: Option<VertexArrayId>,
    bound_buffers: HashMap<BufferTarget, BufferId>,
    enabled: HashSet<Capability>,
    width: u32,
    height: u32,
}

impl RecordingBackend {
    /// Create a new recording backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: CommandLog::default(),
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashSet::new(),
            buffers: HashMap::new(),
            textures: HashSet::new(),
            bound_vertex_array: None,
            bound_buffers: HashMap::new(),
            enabled: HashSet::new(),
            width: 800,
            height: 600,
        }
    }

    /// Handle to the recorded commands, valid after the backend is boxed.
    #[must_use]
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    /// Current surface size.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn bound_buffer(&self, target: BufferTarget) -> RenderResult<BufferId> {
        self.bound_buffers.get(&target).copied().ok_or_else(|| {
            RenderError::InvalidState(format!("no buffer bound to {target:?}"))
        })
    }

    fn program_mut(&mut self, program: ProgramId) -> RenderResult<&mut ProgramState> {
        self.programs
            .get_mut(&program)
            .ok_or_else(|| RenderError::InvalidArgument(format!("unknown program {program}")))
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBackend for RecordingBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Recording
    }

    fn create_shader(&mut self, kind: ShaderType) -> RenderResult<ShaderId> {
        let id = ShaderId(self.allocate());
        self.shaders.insert(id, (kind, String::new()));
        self.log.push(Command::CreateShader(id, kind));
        Ok(id)
    }

    fn shader_source(&mut self, shader: ShaderId, code: &str) -> RenderResult<()> {
        let entry = self
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| RenderError::InvalidArgument(format!("unknown shader {shader}")))?;
        entry.1 = code.to_string();
        self.log.push(Command::ShaderSource(shader, code.to_string()));
        Ok(())
    }

    fn compile_shader(&mut self, shader: ShaderId) -> RenderResult<()> {
        let (_, source) = self
            .shaders
            .get(&shader)
            .ok_or_else(|| RenderError::InvalidArgument(format!("unknown shader {shader}")))?;
        if source.trim().is_empty() {
            return Err(RenderError::Shader(format!(
                "shader {shader} has no source"
            )));
        }
        self.log.push(Command::CompileShader(shader));
        Ok(())
    }

    fn delete_shader(&mut self, shader: ShaderId) -> RenderResult<()> {
        self.shaders
            .remove(&shader)
            .ok_or_else(|| RenderError::InvalidArgument(format!("unknown shader {shader}")))?;
        self.log.push(Command::DeleteShader(shader));
        Ok(())
    }

    fn create_program(&mut self) -> RenderResult<ProgramId> {
        let id = ProgramId(self.allocate());
        self.programs.insert(id, ProgramState::default());
        self.log.push(Command::CreateProgram(id));
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) -> RenderResult<()> {
        self.programs
            .remove(&program)
            .ok_or_else(|| RenderError::InvalidArgument(format!("unknown program {program}")))?;
        self.log.push(Command::DeleteProgram(program));
        Ok(())
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> RenderResult<()> {
        if !self.shaders.contains_key(&shader) {
            return Err(RenderError::InvalidArgument(format!("unknown shader {shader}")));
        }
        self.program_mut(program)?.shaders.push(shader);
        self.log.push(Command::AttachShader(program, shader));
        Ok(())
    }

    fn link_program(&mut self, program: ProgramId) -> RenderResult<()> {
        if self.program_mut(program)?.shaders.is_empty() {
            return Err(RenderError::Shader(format!(
                "program {program} has no attached shaders"
            )));
        }
        self.log.push(Command::LinkProgram(program));
        Ok(())
    }

    fn use_program(&mut self, program: Option<ProgramId>) -> RenderResult<()> {
        if let Some(p) = program {
            self.program_mut(p)?;
        }
        self.log.push(Command::UseProgram(program));
        Ok(())
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        value: UniformValue,
    ) -> RenderResult<()> {
        self.program_mut(program)?;
        self.log.push(Command::Uniform {
            program,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn set_uniform_matrix(
        &mut self,
        program: ProgramId,
        name: &str,
        count: usize,
        transpose: bool,
        values: &[f32],
    ) -> RenderResult<()> {
        self.program_mut(program)?;
        if values.len() != count * 16 {
            return Err(RenderError::InvalidArgument(format!(
                "{count} matrices need {} values, got {}",
                count * 16,
                values.len()
            )));
        }
        self.log.push(Command::UniformMatrix {
            program,
            name: name.to_string(),
            count,
            transpose,
            values: values.to_vec(),
        });
        Ok(())
    }

    fn attribute_location(&mut self, program: ProgramId, name: &str) -> RenderResult<u32> {
        let state = self.program_mut(program)?;
        let next = u32::try_from(state.attributes.len()).unwrap_or(u32::MAX);
        Ok(*state.attributes.entry(name.to_string()).or_insert(next))
    }

    fn create_vertex_arrays(&mut self, count: usize) -> RenderResult<Vec<VertexArrayId>> {
        let ids: Vec<_> = (0..count).map(|_| VertexArrayId(self.allocate())).collect();
        for id in &ids {
            self.vertex_arrays.insert(*id);
            self.log.push(Command::CreateVertexArray(*id));
        }
        Ok(ids)
    }

    fn delete_vertex_arrays(&mut self, arrays: &[VertexArrayId]) -> RenderResult<()> {
        for id in arrays {
            if !self.vertex_arrays.remove(id) {
                return Err(RenderError::InvalidArgument(format!("unknown vertex array {id}")));
            }
            if self.bound_vertex_array == Some(*id) {
                self.bound_vertex_array = None;
            }
            self.log.push(Command::DeleteVertexArray(*id));
        }
        Ok(())
    }

    fn bind_vertex_array(&mut self, array: Option<VertexArrayId>) -> RenderResult<()> {
        if let Some(id) = array {
            if !self.vertex_arrays.contains(&id) {
                return Err(RenderError::InvalidArgument(format!("unknown vertex array {id}")));
            }
        }
        self.bound_vertex_array = array;
        self.log.push(Command::BindVertexArray(array));
        Ok(())
    }

    fn enable_vertex_attribute(&mut self, index: u32) -> RenderResult<()> {
        if self.bound_vertex_array.is_none() {
            return Err(RenderError::InvalidState("no vertex array bound".to_string()));
        }
        self.log.push(Command::EnableVertexAttribute(index));
        Ok(())
    }

    fn vertex_attribute_pointer(&mut self, attribute: &VertexAttribute) -> RenderResult<()> {
        self.bound_buffer(BufferTarget::ArrayBuffer)?;
        self.log.push(Command::VertexAttributePointer(*attribute));
        Ok(())
    }

    fn create_buffers(&mut self, count: usize) -> RenderResult<Vec<BufferId>> {
        let ids: Vec<_> = (0..count).map(|_| BufferId(self.allocate())).collect();
        for id in &ids {
            self.buffers.insert(*id, 0);
            self.log.push(Command::CreateBuffer(*id));
        }
        Ok(ids)
    }

    fn delete_buffers(&mut self, buffers: &[BufferId]) -> RenderResult<()> {
        for id in buffers {
            if self.buffers.remove(id).is_none() {
                return Err(RenderError::InvalidArgument(format!("unknown buffer {id}")));
            }
            self.bound_buffers.retain(|_, bound| bound != id);
            self.log.push(Command::DeleteBuffer(*id));
        }
        Ok(())
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) -> RenderResult<()> {
        match buffer {
            Some(id) => {
                if !self.buffers.contains_key(&id) {
                    return Err(RenderError::InvalidArgument(format!("unknown buffer {id}")));
                }
                self.bound_buffers.insert(target, id);
            }
            None => {
                self.bound_buffers.remove(&target);
            }
        }
        self.log.push(Command::BindBuffer(target, buffer));
        Ok(())
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        data: &[u8],
        usage: BufferDataUsage,
    ) -> RenderResult<()> {
        let id = self.bound_buffer(target)?;
        self.buffers.insert(id, data.len());
        self.log.push(Command::BufferData {
            target,
            len: data.len(),
            usage,
        });
        Ok(())
    }

    fn buffer_sub_data(
        &mut self,
        target: BufferTarget,
        offset: usize,
        data: &[u8],
    ) -> RenderResult<()> {
        let id = self.bound_buffer(target)?;
        let store = self.buffers.get(&id).copied().unwrap_or(0);
        if offset + data.len() > store {
            return Err(RenderError::InvalidArgument(format!(
                "sub-data range {offset}..{} exceeds buffer store of {store} bytes",
                offset + data.len()
            )));
        }
        self.log.push(Command::BufferSubData {
            target,
            offset,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn generate_texture_ids(&mut self, count: usize) -> RenderResult<Vec<TextureId>> {
        let ids: Vec<_> = (0..count).map(|_| TextureId(self.allocate())).collect();
        for id in &ids {
            self.textures.insert(*id);
            self.log.push(Command::GenerateTexture(*id));
        }
        Ok(ids)
    }

    fn delete_textures(&mut self, textures: &[TextureId]) -> RenderResult<()> {
        for id in textures {
            if !self.textures.remove(id) {
                return Err(RenderError::InvalidArgument(format!("unknown texture {id}")));
            }
            self.log.push(Command::DeleteTexture(*id));
        }
        Ok(())
    }

    fn bind_texture(
        &mut self,
        target: TextureTarget,
        texture: Option<TextureId>,
    ) -> RenderResult<()> {
        if let Some(id) = texture {
            if !self.textures.contains(&id) {
                return Err(RenderError::InvalidArgument(format!("unknown texture {id}")));
            }
        }
        self.log.push(Command::BindTexture(target, texture));
        Ok(())
    }

    fn set_texture_parameter(
        &mut self,
        target: TextureParameterTarget,
        name: TextureParameterName,
        value: f32,
    ) -> RenderResult<()> {
        self.log.push(Command::TextureParameter {
            target,
            name,
            value,
        });
        Ok(())
    }

    fn translate_wrap(&self, value: TextureWrap) -> f32 {
        match value {
            TextureWrap::Repeat => 0.0,
            TextureWrap::MirroredRepeat => 1.0,
            TextureWrap::ClampToEdge => 2.0,
            TextureWrap::ClampToBorder => 3.0,
        }
    }

    fn translate_filter(&self, value: TextureFilter) -> f32 {
        match value {
            TextureFilter::Nearest => 0.0,
            TextureFilter::Linear => 1.0,
            TextureFilter::NearestMipmapNearest => 2.0,
            TextureFilter::LinearMipmapNearest => 3.0,
            TextureFilter::NearestMipmapLinear => 4.0,
            TextureFilter::LinearMipmapLinear => 5.0,
        }
    }

    fn set_texture_image(&mut self, image: &TextureImage<'_>) -> RenderResult<()> {
        self.log.push(Command::TextureImage {
            target: image.target,
            level: image.level,
            width: image.width,
            height: image.height,
            format: image.format,
            len: image.data.map_or(0, <[u8]>::len),
        });
        Ok(())
    }

    fn flush(&mut self) -> RenderResult<()> {
        self.log.push(Command::Flush);
        Ok(())
    }
}

impl DrawBackend for RecordingBackend {
    fn clear(&mut self, color: Color) -> RenderResult<()> {
        self.log.push(Command::Clear(color));
        Ok(())
    }

    fn set_texture_coordinates(&mut self, s: f64, t: f64, r: f64, q: f64) -> RenderResult<()> {
        self.log.push(Command::TexCoord([s, t, r, q]));
        Ok(())
    }

    fn set_normal(&mut self, x: f64, y: f64, z: f64) -> RenderResult<()> {
        self.log.push(Command::Normal([x, y, z]));
        Ok(())
    }

    fn vertex(&mut self, x: f64, y: f64, z: f64, w: f64) -> RenderResult<()> {
        self.log.push(Command::Vertex([x, y, z, w]));
        Ok(())
    }

    fn begin(&mut self, mode: RenderMode) -> RenderResult<()> {
        self.log.push(Command::Begin(mode));
        Ok(())
    }

    fn end(&mut self) -> RenderResult<()> {
        self.log.push(Command::End);
        Ok(())
    }

    fn set_material_parameter(
        &mut self,
        face: FaceName,
        name: MaterialParameterName,
        value: MaterialValue,
    ) -> RenderResult<()> {
        self.log.push(Command::Material { face, name, value });
        Ok(())
    }

    fn is_enabled(&self, capability: Capability) -> bool {
        self.enabled.contains(&capability)
    }

    fn set_enabled(&mut self, capability: Capability, enabled: bool) -> RenderResult<()> {
        if enabled {
            self.enabled.insert(capability);
        } else {
            self.enabled.remove(&capability);
        }
        self.log.push(Command::SetCapability(capability, enabled));
        Ok(())
    }

    fn set_color(&mut self, color: Color) -> RenderResult<()> {
        self.log.push(Command::Color(color));
        Ok(())
    }

    fn draw_arrays(&mut self, mode: RenderMode, start: i32, count: i32) -> RenderResult<()> {
        if self.bound_vertex_array.is_none() {
            return Err(RenderError::InvalidState(
                "draw_arrays without a bound vertex array".to_string(),
            ));
        }
        self.log.push(Command::DrawArrays { mode, start, count });
        Ok(())
    }

    fn set_model_view(&mut self, matrix: &Mat4) -> RenderResult<()> {
        self.log.push(Command::ModelView(*matrix));
        Ok(())
    }

    fn set_projection(&mut self, matrix: &Mat4) -> RenderResult<()> {
        self.log.push(Command::Projection(*matrix));
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.width = width;
        self.height = height;
        tracing::debug!("Recording backend resized to {}x{}", width, height);
        self.log.push(Command::Resize(width, height));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_across_kinds() {
        let mut backend = RecordingBackend::new();
        let shader = backend.create_shader(ShaderType::Vertex).unwrap();
        let textures = backend.generate_texture_ids(2).unwrap();
        assert_ne!(shader.0, textures[0].0);
        assert_ne!(textures[0], textures[1]);
    }

    #[test]
    fn test_capability_state_is_tracked() {
        let mut backend = RecordingBackend::new();
        assert!(!backend.is_enabled(Capability::Lighting));
        backend.set_enabled(Capability::Lighting, true).unwrap();
        assert!(backend.is_enabled(Capability::Lighting));
        backend.set_enabled(Capability::Lighting, false).unwrap();
        assert!(!backend.is_enabled(Capability::Lighting));
    }

    #[test]
    fn test_log_survives_boxing() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut boxed: Box<dyn crate::backend::Backend> = Box::new(backend);
        boxed.clear(Color::BLACK).unwrap();
        assert_eq!(log.commands(), vec![Command::Clear(Color::BLACK)]);
    }

    #[test]
    fn test_sub_data_out_of_range() {
        let mut backend = RecordingBackend::new();
        let ids = backend.create_buffers(1).unwrap();
        backend.bind_buffer(BufferTarget::ArrayBuffer, Some(ids[0])).unwrap();
        backend
            .buffer_data(BufferTarget::ArrayBuffer, &[0; 16], BufferDataUsage::DynamicDraw)
            .unwrap();
        assert!(backend
            .buffer_sub_data(BufferTarget::ArrayBuffer, 8, &[0; 8])
            .is_ok());
        assert!(backend
            .buffer_sub_data(BufferTarget::ArrayBuffer, 12, &[0; 8])
            .is_err());
    }

    #[test]
    fn test_link_without_shaders_fails() {
        let mut backend = RecordingBackend::new();
        let program = backend.create_program().unwrap();
        assert!(matches!(
            backend.link_program(program),
            Err(RenderError::Shader(_))
        ));
    }

    #[test]
    fn test_compile_empty_source_fails() {
        let mut backend = RecordingBackend::new();
        let shader = backend.create_shader(ShaderType::Fragment).unwrap();
        assert!(backend.compile_shader(shader).is_err());
        backend.shader_source(shader, "void main() {}").unwrap();
        assert!(backend.compile_shader(shader).is_ok());
    }

    #[test]
    fn test_draw_arrays_requires_vertex_array() {
        let mut backend = RecordingBackend::new();
        assert!(backend.draw_arrays(RenderMode::Triangles, 0, 3).is_err());
    }
}
