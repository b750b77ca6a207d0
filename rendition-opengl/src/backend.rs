//! OpenGL backend over a `glow` context.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glow::HasContext;
use rendition_core::backend::{BackendType, DrawBackend, ResourceBackend, TextureImage};
use rendition_core::math::Mat4;
use rendition_core::resource::{
    BufferId, ProgramId, ShaderId, TextureId, VertexArrayId, VertexAttribute,
};
use rendition_core::types::{
    BufferDataUsage, BufferTarget, Capability, Color, FaceName, MaterialParameterName,
    MaterialValue, RenderMode, ShaderType, TextureFilter, TextureParameterName,
    TextureParameterTarget, TextureTarget, TextureWrap, UniformValue,
};
use rendition_core::{RenderError, RenderResult};

use crate::convert;
use crate::immediate::{Batch, CurrentAttributes, ImmediateVertex};
use crate::shaders;
use crate::GlBackendConfig;

/// GL enums are below `i32::MAX`; some entry points take them signed.
#[allow(clippy::cast_possible_wrap)]
const fn gl_int(value: u32) -> i32 {
    value as i32
}

fn gl_size(value: u32, what: &str) -> RenderResult<i32> {
    i32::try_from(value)
        .map_err(|_| RenderError::InvalidArgument(format!("{what} {value} is out of range")))
}

fn create_failed(what: &str, reason: &str) -> RenderError {
    RenderError::Resource(format!("failed to create {what}: {reason}"))
}

/// Per-face material state used by the lighting emulation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MaterialState {
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    emission: [f32; 4],
    shininess: f32,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            ambient: [0.2, 0.2, 0.2, 1.0],
            diffuse: [0.8, 0.8, 0.8, 1.0],
            specular: [0.0, 0.0, 0.0, 1.0],
            emission: [0.0, 0.0, 0.0, 1.0],
            shininess: 0.0,
        }
    }
}

impl MaterialState {
    fn apply(&mut self, name: MaterialParameterName, value: MaterialValue) -> RenderResult<()> {
        match (name, value) {
            (MaterialParameterName::Shininess, MaterialValue::Scalar(v)) => self.shininess = v,
            (MaterialParameterName::Ambient, MaterialValue::Vector(v)) => self.ambient = v,
            (MaterialParameterName::Diffuse, MaterialValue::Vector(v)) => self.diffuse = v,
            (MaterialParameterName::Specular, MaterialValue::Vector(v)) => self.specular = v,
            (MaterialParameterName::Emission, MaterialValue::Vector(v)) => self.emission = v,
            (MaterialParameterName::AmbientAndDiffuse, MaterialValue::Vector(v)) => {
                self.ambient = v;
                self.diffuse = v;
            }
            (name, value) => {
                return Err(RenderError::InvalidArgument(format!(
                    "material parameter {name:?} does not accept {value:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Uniform locations of the built-in immediate program.
struct ImmediateUniforms {
    model_view: Option<glow::UniformLocation>,
    projection: Option<glow::UniformLocation>,
    texturing: Option<glow::UniformLocation>,
    sphere_map: Option<glow::UniformLocation>,
    lighting: Option<glow::UniformLocation>,
    sampler: Option<glow::UniformLocation>,
    ambient: Option<glow::UniformLocation>,
    diffuse: Option<glow::UniformLocation>,
    specular: Option<glow::UniformLocation>,
    emission: Option<glow::UniformLocation>,
    shininess: Option<glow::UniformLocation>,
}

impl ImmediateUniforms {
    fn locate(gl: &glow::Context, program: glow::Program) -> Self {
        let get = |name: &str| unsafe { gl.get_uniform_location(program, name) };
        Self {
            model_view: get("u_model_view"),
            projection: get("u_projection"),
            texturing: get("u_texturing"),
            sphere_map: get("u_sphere_map"),
            lighting: get("u_lighting"),
            sampler: get("u_sampler"),
            ambient: get("u_ambient"),
            diffuse: get("u_diffuse"),
            specular: get("u_specular"),
            emission: get("u_emission"),
            shininess: get("u_shininess"),
        }
    }
}

/// GL objects used to draw `begin`/`end` blocks.
struct ImmediatePipeline {
    program: glow::Program,
    vertex_array: glow::VertexArray,
    buffer: glow::Buffer,
    uniforms: ImmediateUniforms,
}

impl ImmediatePipeline {
    fn new(gl: &glow::Context, config: &GlBackendConfig) -> RenderResult<Self> {
        let vertex = compile(
            gl,
            glow::VERTEX_SHADER,
            &config.versioned_source(shaders::IMMEDIATE_VERTEX),
        )?;
        let fragment = compile(
            gl,
            glow::FRAGMENT_SHADER,
            &config.versioned_source(shaders::IMMEDIATE_FRAGMENT),
        )?;

        unsafe {
            let program = gl
                .create_program()
                .map_err(|e| create_failed("immediate program", &e))?;
            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);
            gl.link_program(program);
            let linked = gl.get_program_link_status(program);
            gl.detach_shader(program, vertex);
            gl.detach_shader(program, fragment);
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);
            if !linked {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(RenderError::Shader(format!(
                    "immediate program failed to link: {log}"
                )));
            }

            let vertex_array = gl
                .create_vertex_array()
                .map_err(|e| create_failed("immediate vertex array", &e))?;
            let buffer = gl
                .create_buffer()
                .map_err(|e| create_failed("immediate vertex buffer", &e))?;

            gl.bind_vertex_array(Some(vertex_array));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            let layout = [
                (shaders::POSITION_LOCATION, 4, 0),
                (shaders::TEX_COORD_LOCATION, 4, ImmediateVertex::TEX_COORD_OFFSET),
                (shaders::NORMAL_LOCATION, 3, ImmediateVertex::NORMAL_OFFSET),
                (shaders::COLOR_LOCATION, 4, ImmediateVertex::COLOR_OFFSET),
            ];
            for (location, size, offset) in layout {
                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_pointer_f32(
                    location,
                    size,
                    glow::FLOAT,
                    false,
                    ImmediateVertex::STRIDE,
                    offset,
                );
            }
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(Self {
                program,
                vertex_array,
                buffer,
                uniforms: ImmediateUniforms::locate(gl, program),
            })
        }
    }
}

fn compile(gl: &glow::Context, kind: u32, source: &str) -> RenderResult<glow::Shader> {
    unsafe {
        let shader = gl
            .create_shader(kind)
            .map_err(|e| create_failed("shader", &e))?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if gl.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            Err(RenderError::Shader(format!(
                "built-in shader failed to compile: {log}"
            )))
        }
    }
}

/// Backend drawing through OpenGL 3.3 core (or any context `glow` can load).
///
/// Resource ids handed out to the engine are local to this backend and map
/// onto `glow` objects. Vertex array, array buffer and program bindings are
/// tracked here so that immediate-mode draws can restore them.
pub struct GlBackend {
    gl: Arc<glow::Context>,
    config: GlBackendConfig,
    next_id: u32,
    shaders: HashMap<ShaderId, glow::Shader>,
    programs: HashMap<ProgramId, glow::Program>,
    vertex_arrays: HashMap<VertexArrayId, glow::VertexArray>,
    buffers: HashMap<BufferId, glow::Buffer>,
    textures: HashMap<TextureId, glow::Texture>,
    bound_vertex_array: Option<VertexArrayId>,
    bound_buffers: HashMap<BufferTarget, BufferId>,
    current_program: Option<ProgramId>,
    enabled: HashSet<Capability>,
    immediate: ImmediatePipeline,
    current: CurrentAttributes,
    batch: Option<Batch>,
    front_material: MaterialState,
    back_material: MaterialState,
    model_view: Mat4,
    projection: Mat4,
}

impl std::fmt::Debug for GlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlBackend")
            .field("config", &self.config)
            .field("shaders", &self.shaders.len())
            .field("programs", &self.programs.len())
            .field("textures", &self.textures.len())
            .field("current_program", &self.current_program)
            .field("in_block", &self.batch.is_some())
            .finish_non_exhaustive()
    }
}

impl GlBackend {
    /// Create a backend on a loaded context.
    ///
    /// The context must be current on the calling thread for the lifetime of
    /// the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in immediate-mode shader does not
    /// compile or its GL objects cannot be created.
    pub fn new(gl: Arc<glow::Context>, config: GlBackendConfig) -> RenderResult<Self> {
        let immediate = ImmediatePipeline::new(&gl, &config)?;
        unsafe {
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        }

        tracing::info!(
            version = ?gl.version(),
            glsl = %config.glsl_version,
            "OpenGL backend initialized"
        );

        Ok(Self {
            gl,
            config,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            bound_vertex_array: None,
            bound_buffers: HashMap::new(),
            current_program: None,
            enabled: HashSet::new(),
            immediate,
            current: CurrentAttributes::default(),
            batch: None,
            front_material: MaterialState::default(),
            back_material: MaterialState::default(),
            model_view: Mat4::identity(),
            projection: Mat4::identity(),
        })
    }

    /// The backend configuration.
    #[must_use]
    pub fn config(&self) -> &GlBackendConfig {
        &self.config
    }

    /// The underlying context.
    #[must_use]
    pub fn context(&self) -> &Arc<glow::Context> {
        &self.gl
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_error(&self, operation: &str) -> RenderResult<()> {
        if !self.config.check_errors {
            return Ok(());
        }
        let code = unsafe { self.gl.get_error() };
        if code == glow::NO_ERROR {
            return Ok(());
        }
        let name = convert::error_name(code);
        tracing::error!(code, name, operation, "GL error");
        Err(RenderError::Backend {
            code,
            name,
            operation: operation.to_string(),
        })
    }

    fn shader(&self, id: ShaderId) -> RenderResult<glow::Shader> {
        self.shaders
            .get(&id)
            .copied()
            .ok_or_else(|| RenderError::InvalidArgument(format!("unknown shader {id}")))
    }

    fn program(&self, id: ProgramId) -> RenderResult<glow::Program> {
        self.programs
            .get(&id)
            .copied()
            .ok_or_else(|| RenderError::InvalidArgument(format!("unknown program {id}")))
    }

    fn current_gl_program(&self) -> Option<glow::Program> {
        self.current_program
            .and_then(|id| self.programs.get(&id).copied())
    }

    fn bound_buffer(&self, target: BufferTarget) -> RenderResult<glow::Buffer> {
        self.bound_buffers
            .get(&target)
            .and_then(|id| self.buffers.get(id).copied())
            .ok_or_else(|| RenderError::InvalidState(format!("no buffer bound to {target:?}")))
    }

    /// Run `f` with `program` installed, restoring the current program after.
    fn with_program<T>(
        &self,
        program: ProgramId,
        f: impl FnOnce(&glow::Context, glow::Program) -> T,
    ) -> RenderResult<T> {
        let native = self.program(program)?;
        let switch = self.current_program != Some(program);
        unsafe {
            if switch {
                self.gl.use_program(Some(native));
            }
            let result = f(&self.gl, native);
            if switch {
                self.gl.use_program(self.current_gl_program());
            }
            Ok(result)
        }
    }

    fn upload_immediate_uniforms(&self) {
        let u = &self.immediate.uniforms;
        let m = &self.front_material;
        let sphere_map = self.enabled.contains(&Capability::TextureGenS)
            && self.enabled.contains(&Capability::TextureGenT);
        unsafe {
            let gl = &self.gl;
            gl.uniform_matrix_4_f32_slice(u.model_view.as_ref(), false, &self.model_view.data);
            gl.uniform_matrix_4_f32_slice(u.projection.as_ref(), false, &self.projection.data);
            gl.uniform_1_i32(
                u.texturing.as_ref(),
                i32::from(self.enabled.contains(&Capability::Texture2D)),
            );
            gl.uniform_1_i32(u.sphere_map.as_ref(), i32::from(sphere_map));
            gl.uniform_1_i32(
                u.lighting.as_ref(),
                i32::from(self.enabled.contains(&Capability::Lighting)),
            );
            gl.uniform_1_i32(u.sampler.as_ref(), 0);
            let [r, g, b, a] = m.ambient;
            gl.uniform_4_f32(u.ambient.as_ref(), r, g, b, a);
            let [r, g, b, a] = m.diffuse;
            gl.uniform_4_f32(u.diffuse.as_ref(), r, g, b, a);
            let [r, g, b, a] = m.specular;
            gl.uniform_4_f32(u.specular.as_ref(), r, g, b, a);
            let [r, g, b, a] = m.emission;
            gl.uniform_4_f32(u.emission.as_ref(), r, g, b, a);
            gl.uniform_1_f32(u.shininess.as_ref(), m.shininess);
        }
    }

    /// Hand the current matrices to a user program that declares them.
    fn upload_user_matrices(&self, program: glow::Program) {
        unsafe {
            let gl = &self.gl;
            if let Some(location) = gl.get_uniform_location(program, "u_model_view") {
                gl.uniform_matrix_4_f32_slice(Some(&location), false, &self.model_view.data);
            }
            if let Some(location) = gl.get_uniform_location(program, "u_projection") {
                gl.uniform_matrix_4_f32_slice(Some(&location), false, &self.projection.data);
            }
        }
    }

    /// Draw a finished batch through the streaming buffer and restore the
    /// user's vertex array, array buffer and program bindings.
    fn draw_batch(&self, mode: RenderMode, vertices: &[ImmediateVertex]) -> RenderResult<()> {
        let count = i32::try_from(vertices.len()).map_err(|_| {
            RenderError::InvalidArgument(format!("{} vertices in one block", vertices.len()))
        })?;
        let user_program = self.current_gl_program();
        let user_vertex_array = self
            .bound_vertex_array
            .and_then(|id| self.vertex_arrays.get(&id).copied());
        let user_array_buffer = self.bound_buffer(BufferTarget::ArrayBuffer).ok();

        unsafe {
            let gl = &self.gl;
            gl.bind_vertex_array(Some(self.immediate.vertex_array));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.immediate.buffer));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(vertices),
                glow::STREAM_DRAW,
            );

            if let Some(program) = user_program {
                self.upload_user_matrices(program);
            } else {
                gl.use_program(Some(self.immediate.program));
                self.upload_immediate_uniforms();
            }

            gl.draw_arrays(convert::render_mode(mode), 0, count);

            gl.bind_vertex_array(user_vertex_array);
            gl.bind_buffer(glow::ARRAY_BUFFER, user_array_buffer);
            if user_program.is_none() {
                gl.use_program(None);
            }
        }
        self.check_error("end")
    }
}

impl ResourceBackend for GlBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::OpenGl
    }

    fn create_shader(&mut self, kind: ShaderType) -> RenderResult<ShaderId> {
        let native = unsafe { self.gl.create_shader(convert::shader_type(kind)) }
            .map_err(|e| create_failed("shader", &e))?;
        let id = ShaderId(self.allocate());
        self.shaders.insert(id, native);
        tracing::debug!(%id, ?kind, "created shader");
        Ok(id)
    }

    fn shader_source(&mut self, shader: ShaderId, code: &str) -> RenderResult<()> {
        let native = self.shader(shader)?;
        let source = self.config.versioned_source(code);
        unsafe { self.gl.shader_source(native, &source) };
        self.check_error("shader_source")
    }

    fn compile_shader(&mut self, shader: ShaderId) -> RenderResult<()> {
        let native = self.shader(shader)?;
        unsafe {
            self.gl.compile_shader(native);
            if !self.gl.get_shader_compile_status(native) {
                let log = self.gl.get_shader_info_log(native);
                return Err(RenderError::Shader(format!(
                    "shader {shader} failed to compile: {log}"
                )));
            }
        }
        self.check_error("compile_shader")
    }

    fn delete_shader(&mut self, shader: ShaderId) -> RenderResult<()> {
        let native = self.shader(shader)?;
        self.shaders.remove(&shader);
        unsafe { self.gl.delete_shader(native) };
        self.check_error("delete_shader")
    }

    fn create_program(&mut self) -> RenderResult<ProgramId> {
        let native =
            unsafe { self.gl.create_program() }.map_err(|e| create_failed("program", &e))?;
        let id = ProgramId(self.allocate());
        self.programs.insert(id, native);
        tracing::debug!(%id, "created program");
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) -> RenderResult<()> {
        let native = self.program(program)?;
        if self.current_program == Some(program) {
            unsafe { self.gl.use_program(None) };
            self.current_program = None;
        }
        self.programs.remove(&program);
        unsafe { self.gl.delete_program(native) };
        tracing::debug!(%program, "deleted program");
        self.check_error("delete_program")
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> RenderResult<()> {
        let native_program = self.program(program)?;
        let native_shader = self.shader(shader)?;
        unsafe { self.gl.attach_shader(native_program, native_shader) };
        self.check_error("attach_shader")
    }

    fn link_program(&mut self, program: ProgramId) -> RenderResult<()> {
        let native = self.program(program)?;
        unsafe {
            self.gl.link_program(native);
            if !self.gl.get_program_link_status(native) {
                let log = self.gl.get_program_info_log(native);
                return Err(RenderError::Shader(format!(
                    "program {program} failed to link: {log}"
                )));
            }
        }
        self.check_error("link_program")
    }

    fn use_program(&mut self, program: Option<ProgramId>) -> RenderResult<()> {
        let native = program.map(|id| self.program(id)).transpose()?;
        unsafe { self.gl.use_program(native) };
        self.current_program = program;
        self.check_error("use_program")
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        value: UniformValue,
    ) -> RenderResult<()> {
        self.with_program(program, |gl, native| unsafe {
            let Some(location) = gl.get_uniform_location(native, name) else {
                tracing::debug!(%program, name, "uniform is not active");
                return;
            };
            let location = Some(&location);
            match value {
                UniformValue::Int(v) => gl.uniform_1_i32(location, v),
                UniformValue::Float(v) => gl.uniform_1_f32(location, v),
                UniformValue::Vec2(x, y) => gl.uniform_2_f32(location, x, y),
                UniformValue::Vec3(x, y, z) => gl.uniform_3_f32(location, x, y, z),
                UniformValue::DVec3(x, y, z) => {
                    gl.uniform_3_f32(location, x as f32, y as f32, z as f32);
                }
                UniformValue::Vec4(x, y, z, w) => gl.uniform_4_f32(location, x, y, z, w),
            }
        })?;
        self.check_error("set_uniform")
    }

    fn set_uniform_matrix(
        &mut self,
        program: ProgramId,
        name: &str,
        count: usize,
        transpose: bool,
        values: &[f32],
    ) -> RenderResult<()> {
        if values.len() != count * 16 {
            return Err(RenderError::InvalidArgument(format!(
                "{count} matrices need {} values, got {}",
                count * 16,
                values.len()
            )));
        }
        self.with_program(program, |gl, native| unsafe {
            if let Some(location) = gl.get_uniform_location(native, name) {
                gl.uniform_matrix_4_f32_slice(Some(&location), transpose, values);
            }
        })?;
        self.check_error("set_uniform_matrix")
    }

    fn attribute_location(&mut self, program: ProgramId, name: &str) -> RenderResult<u32> {
        let native = self.program(program)?;
        unsafe { self.gl.get_attrib_location(native, name) }.ok_or_else(|| {
            RenderError::InvalidArgument(format!(
                "attribute {name} is not active in program {program}"
            ))
        })
    }

    fn create_vertex_arrays(&mut self, count: usize) -> RenderResult<Vec<VertexArrayId>> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let native = unsafe { self.gl.create_vertex_array() }
                .map_err(|e| create_failed("vertex array", &e))?;
            let id = VertexArrayId(self.allocate());
            self.vertex_arrays.insert(id, native);
            ids.push(id);
        }
        Ok(ids)
    }

    fn delete_vertex_arrays(&mut self, arrays: &[VertexArrayId]) -> RenderResult<()> {
        for id in arrays {
            let native = self
                .vertex_arrays
                .remove(id)
                .ok_or_else(|| RenderError::InvalidArgument(format!("unknown vertex array {id}")))?;
            if self.bound_vertex_array == Some(*id) {
                self.bound_vertex_array = None;
            }
            unsafe { self.gl.delete_vertex_array(native) };
        }
        self.check_error("delete_vertex_arrays")
    }

    fn bind_vertex_array(&mut self, array: Option<VertexArrayId>) -> RenderResult<()> {
        let native = array
            .map(|id| {
                self.vertex_arrays.get(&id).copied().ok_or_else(|| {
                    RenderError::InvalidArgument(format!("unknown vertex array {id}"))
                })
            })
            .transpose()?;
        unsafe { self.gl.bind_vertex_array(native) };
        self.bound_vertex_array = array;
        self.check_error("bind_vertex_array")
    }

    fn enable_vertex_attribute(&mut self, index: u32) -> RenderResult<()> {
        if self.bound_vertex_array.is_none() {
            return Err(RenderError::InvalidState("no vertex array bound".to_string()));
        }
        unsafe { self.gl.enable_vertex_attrib_array(index) };
        self.check_error("enable_vertex_attribute")
    }

    fn vertex_attribute_pointer(&mut self, attribute: &VertexAttribute) -> RenderResult<()> {
        self.bound_buffer(BufferTarget::ArrayBuffer)?;
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                attribute.index,
                attribute.size,
                convert::element_type(attribute.element_type),
                attribute.normalized,
                attribute.stride,
                attribute.offset,
            );
        }
        self.check_error("vertex_attribute_pointer")
    }

    fn create_buffers(&mut self, count: usize) -> RenderResult<Vec<BufferId>> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let native =
                unsafe { self.gl.create_buffer() }.map_err(|e| create_failed("buffer", &e))?;
            let id = BufferId(self.allocate());
            self.buffers.insert(id, native);
            ids.push(id);
        }
        Ok(ids)
    }

    fn delete_buffers(&mut self, buffers: &[BufferId]) -> RenderResult<()> {
        for id in buffers {
            let native = self
                .buffers
                .remove(id)
                .ok_or_else(|| RenderError::InvalidArgument(format!("unknown buffer {id}")))?;
            self.bound_buffers.retain(|_, bound| bound != id);
            unsafe { self.gl.delete_buffer(native) };
        }
        self.check_error("delete_buffers")
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) -> RenderResult<()> {
        let native = match buffer {
            Some(id) => {
                let native = self
                    .buffers
                    .get(&id)
                    .copied()
                    .ok_or_else(|| RenderError::InvalidArgument(format!("unknown buffer {id}")))?;
                self.bound_buffers.insert(target, id);
                Some(native)
            }
            None => {
                self.bound_buffers.remove(&target);
                None
            }
        };
        unsafe { self.gl.bind_buffer(convert::buffer_target(target), native) };
        self.check_error("bind_buffer")
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        data: &[u8],
        usage: BufferDataUsage,
    ) -> RenderResult<()> {
        self.bound_buffer(target)?;
        unsafe {
            self.gl.buffer_data_u8_slice(
                convert::buffer_target(target),
                data,
                convert::buffer_usage(usage),
            );
        }
        self.check_error("buffer_data")
    }

    fn buffer_sub_data(
        &mut self,
        target: BufferTarget,
        offset: usize,
        data: &[u8],
    ) -> RenderResult<()> {
        self.bound_buffer(target)?;
        let offset = i32::try_from(offset)
            .map_err(|_| RenderError::InvalidArgument(format!("offset {offset} is out of range")))?;
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(convert::buffer_target(target), offset, data);
        }
        self.check_error("buffer_sub_data")
    }

    fn generate_texture_ids(&mut self, count: usize) -> RenderResult<Vec<TextureId>> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let native =
                unsafe { self.gl.create_texture() }.map_err(|e| create_failed("texture", &e))?;
            let id = TextureId(self.allocate());
            self.textures.insert(id, native);
            ids.push(id);
        }
        Ok(ids)
    }

    fn delete_textures(&mut self, textures: &[TextureId]) -> RenderResult<()> {
        for id in textures {
            let native = self
                .textures
                .remove(id)
                .ok_or_else(|| RenderError::InvalidArgument(format!("unknown texture {id}")))?;
            unsafe { self.gl.delete_texture(native) };
        }
        self.check_error("delete_textures")
    }

    fn bind_texture(
        &mut self,
        target: TextureTarget,
        texture: Option<TextureId>,
    ) -> RenderResult<()> {
        let native = texture
            .map(|id| {
                self.textures
                    .get(&id)
                    .copied()
                    .ok_or_else(|| RenderError::InvalidArgument(format!("unknown texture {id}")))
            })
            .transpose()?;
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(convert::texture_target(target), native);
        }
        self.check_error("bind_texture")
    }

    fn set_texture_parameter(
        &mut self,
        target: TextureParameterTarget,
        name: TextureParameterName,
        value: f32,
    ) -> RenderResult<()> {
        #[allow(clippy::cast_possible_truncation)]
        let value = value as i32;
        unsafe {
            self.gl.tex_parameter_i32(
                convert::texture_parameter_target(target),
                convert::texture_parameter_name(name),
                value,
            );
        }
        self.check_error("set_texture_parameter")
    }

    #[allow(clippy::cast_precision_loss)]
    fn translate_wrap(&self, value: TextureWrap) -> f32 {
        convert::texture_wrap(value) as f32
    }

    #[allow(clippy::cast_precision_loss)]
    fn translate_filter(&self, value: TextureFilter) -> f32 {
        convert::texture_filter(value) as f32
    }

    fn set_texture_image(&mut self, image: &TextureImage<'_>) -> RenderResult<()> {
        if !matches!(image.target, TextureTarget::Texture2D | TextureTarget::Rectangle) {
            return Err(RenderError::InvalidArgument(format!(
                "image upload to {:?} is not supported",
                image.target
            )));
        }
        let width = gl_size(image.width, "width")?;
        let height = gl_size(image.height, "height")?;
        let format = convert::texture_format(image.format);
        unsafe {
            let gl = &self.gl;
            if image.format.components() == 1 {
                gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            }
            gl.tex_image_2d(
                convert::texture_target(image.target),
                image.level,
                gl_int(convert::internal_format(image.internal_format)),
                width,
                height,
                0,
                format,
                convert::element_type(image.element_type),
                image.data,
            );
            if image.format.components() == 1 {
                gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            }
        }
        self.check_error("set_texture_image")
    }

    fn flush(&mut self) -> RenderResult<()> {
        unsafe { self.gl.flush() };
        self.check_error("flush")
    }
}

impl DrawBackend for GlBackend {
    #[allow(clippy::cast_possible_truncation)]
    fn clear(&mut self, color: Color) -> RenderResult<()> {
        unsafe {
            self.gl
                .clear_color(color.r as f32, color.g as f32, color.b as f32, color.a as f32);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
        self.check_error("clear")
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_texture_coordinates(&mut self, s: f64, t: f64, r: f64, q: f64) -> RenderResult<()> {
        self.current.tex_coord = [s as f32, t as f32, r as f32, q as f32];
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_normal(&mut self, x: f64, y: f64, z: f64) -> RenderResult<()> {
        self.current.normal = [x as f32, y as f32, z as f32];
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn vertex(&mut self, x: f64, y: f64, z: f64, w: f64) -> RenderResult<()> {
        let batch = self.batch.as_mut().ok_or_else(|| {
            RenderError::InvalidState("vertex emitted outside begin/end".to_string())
        })?;
        batch.push([x as f32, y as f32, z as f32, w as f32], &self.current);
        Ok(())
    }

    fn begin(&mut self, mode: RenderMode) -> RenderResult<()> {
        if let Some(open) = &self.batch {
            return Err(RenderError::InvalidState(format!(
                "begin({mode:?}) while a {:?} block is open",
                open.mode()
            )));
        }
        self.batch = Some(Batch::new(mode));
        Ok(())
    }

    fn end(&mut self) -> RenderResult<()> {
        let batch = self
            .batch
            .take()
            .ok_or_else(|| RenderError::InvalidState("end without begin".to_string()))?;
        let mode = batch.mode();
        let vertices = batch.finish();
        if vertices.is_empty() {
            return Ok(());
        }
        tracing::trace!(?mode, vertices = vertices.len(), "draw immediate block");
        self.draw_batch(mode, &vertices)
    }

    fn set_material_parameter(
        &mut self,
        face: FaceName,
        name: MaterialParameterName,
        value: MaterialValue,
    ) -> RenderResult<()> {
        match face {
            FaceName::Front => self.front_material.apply(name, value),
            FaceName::Back => self.back_material.apply(name, value),
            FaceName::Both => {
                self.front_material.apply(name, value)?;
                self.back_material.apply(name, value)
            }
        }
    }

    fn is_enabled(&self, capability: Capability) -> bool {
        self.enabled.contains(&capability)
    }

    fn set_enabled(&mut self, capability: Capability, enabled: bool) -> RenderResult<()> {
        if let Some(cap) = convert::capability(capability) {
            unsafe {
                if enabled {
                    self.gl.enable(cap);
                } else {
                    self.gl.disable(cap);
                }
            }
        }
        if enabled {
            self.enabled.insert(capability);
        } else {
            self.enabled.remove(&capability);
        }
        self.check_error("set_enabled")
    }

    fn set_color(&mut self, color: Color) -> RenderResult<()> {
        self.current.color = color.to_array_f32();
        Ok(())
    }

    fn draw_arrays(&mut self, mode: RenderMode, start: i32, count: i32) -> RenderResult<()> {
        if matches!(mode, RenderMode::Quads | RenderMode::QuadStrip) {
            return Err(RenderError::InvalidArgument(format!(
                "{mode:?} cannot be drawn from a vertex array"
            )));
        }
        if self.bound_vertex_array.is_none() {
            return Err(RenderError::InvalidState("no vertex array bound".to_string()));
        }
        unsafe {
            self.gl
                .draw_arrays(convert::render_mode(mode), start, count);
        }
        self.check_error("draw_arrays")
    }

    fn set_model_view(&mut self, matrix: &Mat4) -> RenderResult<()> {
        self.model_view = *matrix;
        Ok(())
    }

    fn set_projection(&mut self, matrix: &Mat4) -> RenderResult<()> {
        self.projection = *matrix;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let width = gl_size(width, "width")?;
        let height = gl_size(height, "height")?;
        unsafe { self.gl.viewport(0, 0, width, height) };
        tracing::debug!(width, height, "viewport resized");
        self.check_error("resize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_both_faces() {
        let mut material = MaterialState::default();
        material
            .apply(
                MaterialParameterName::AmbientAndDiffuse,
                MaterialValue::Vector([0.1, 0.2, 0.3, 1.0]),
            )
            .unwrap();
        assert_eq!(material.ambient, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(material.diffuse, [0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn test_material_rejects_mismatched_value() {
        let mut material = MaterialState::default();
        let result = material.apply(MaterialParameterName::Shininess, MaterialValue::Vector([0.0; 4]));
        assert!(matches!(result, Err(RenderError::InvalidArgument(_))));
        assert_eq!(material, MaterialState::default());
    }

    #[test]
    fn test_default_material_matches_fixed_function() {
        let material = MaterialState::default();
        assert_eq!(material.ambient, [0.2, 0.2, 0.2, 1.0]);
        assert_eq!(material.diffuse, [0.8, 0.8, 0.8, 1.0]);
        assert_eq!(material.shininess, 0.0);
    }

    #[test]
    fn test_gl_size_rejects_overflow() {
        assert_eq!(gl_size(640, "width").unwrap(), 640);
        assert!(gl_size(u32::MAX, "width").is_err());
    }
}
