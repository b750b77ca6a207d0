//! Immediate-mode drawing surface.
//!
//! A [`Canvas`] owns its [`Engine`] and layers state tracking on top of the
//! backend: the open primitive block, the bound texture and program, the
//! model-view matrix stack, and the texture and glyph caches used by
//! [`Canvas::draw_model`] and [`Canvas::draw_text`].

use std::path::Path;

use tracing::{debug, info, warn};

use crate::backend::TextureImage;
use crate::engine::Engine;
use crate::glyph::{CharacterGlyph, GlyphCache, GlyphRasterizer};
use crate::image::{self as images, TextureData};
use crate::math::{Mat4, MatrixStack, Vec2, Vec3};
use crate::model::{Material, Model, ModelTexture, ModelTextureFlags, ModelVertex, Triangle};
use crate::resource::{RenderBuffer, ShaderProgram, TextureId, VertexArray};
use crate::shaders;
use crate::texture::{Texture, TextureRegistry};
use crate::types::{
    BufferDataUsage, BufferTarget, Capability, Color, ElementType, FaceName,
    MaterialParameterName, MaterialValue, RenderMode, ShaderType, TextureFilter, TextureFlip,
    TextureFormat, TextureParameterName, TextureParameterTarget, TextureRotation, TextureTarget,
    TextureWrap,
};
use crate::{CanvasConfig, RenderError, RenderResult};

/// Floats per text vertex: position (x, y) and texture coordinate (s, t).
const TEXT_VERTEX_FLOATS: usize = 4;
/// Vertices per glyph quad.
const TEXT_QUAD_VERTICES: usize = 6;
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const TEXT_QUAD_DRAW_COUNT: i32 = TEXT_QUAD_VERTICES as i32;

/// GPU objects shared by every `draw_text` call.
#[derive(Debug)]
struct TextResources {
    vertex_array: VertexArray,
    buffer: RenderBuffer,
    program: ShaderProgram,
}

macro_rules! capability_accessors {
    ($($name:literal, $get:ident, $set:ident => $cap:ident;)*) => {
        $(
            #[doc = concat!("Whether ", $name, " is enabled.")]
            #[must_use]
            pub fn $get(&self) -> bool {
                self.is_enabled(Capability::$cap)
            }

            #[doc = concat!("Enable or disable ", $name, ".")]
            ///
            /// # Errors
            ///
            /// Returns an error if the backend rejects the change.
            pub fn $set(&mut self, enabled: bool) -> RenderResult<()> {
                self.set_enabled(Capability::$cap, enabled)
            }
        )*
    };
}

/// Immediate-mode drawing surface bound to an [`Engine`].
pub struct Canvas {
    engine: Engine,
    config: CanvasConfig,
    color: Color,
    texture: Option<Texture>,
    last_texture_target: TextureTarget,
    program: Option<ShaderProgram>,
    open_blocks: usize,
    matrices: MatrixStack,
    projection: Mat4,
    viewport: (u32, u32),
    textures: TextureRegistry,
    glyphs: GlyphCache,
    rasterizer: Option<Box<dyn GlyphRasterizer>>,
    text: Option<TextResources>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("viewport", &self.viewport)
            .field("textures", &self.textures.len())
            .field("glyphs", &self.glyphs.len())
            .finish_non_exhaustive()
    }
}

impl Canvas {
    /// Create a canvas drawing through `engine`.
    #[must_use]
    pub fn new(engine: Engine, config: CanvasConfig) -> Self {
        let viewport = (config.width, config.height);
        Self {
            engine,
            config,
            color: Color::WHITE,
            texture: None,
            last_texture_target: TextureTarget::Texture2D,
            program: None,
            open_blocks: 0,
            matrices: MatrixStack::new(),
            projection: Mat4::identity(),
            viewport,
            textures: TextureRegistry::new(),
            glyphs: GlyphCache::new(),
            rasterizer: None,
            text: None,
        }
    }

    /// The engine this canvas draws through.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable access to the engine, for creating resources.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Give the engine back.
    #[must_use]
    pub fn into_engine(self) -> Engine {
        self.engine
    }

    /// Canvas configuration.
    #[must_use]
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Mutable canvas configuration.
    pub fn config_mut(&mut self) -> &mut CanvasConfig {
        &mut self.config
    }

    fn backend(&mut self) -> &mut dyn crate::backend::Backend {
        self.engine.backend_mut()
    }

    // --- State ---

    /// Clear the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn clear(&mut self, color: Color) -> RenderResult<()> {
        self.backend().clear(color)
    }

    /// Current drawing color.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Set the drawing color.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn set_color(&mut self, color: Color) -> RenderResult<()> {
        self.backend().set_color(color)?;
        self.color = color;
        Ok(())
    }

    /// Whether a capability is enabled.
    #[must_use]
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.engine.backend().is_enabled(capability)
    }

    /// Enable or disable a capability.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change.
    pub fn set_enabled(&mut self, capability: Capability, enabled: bool) -> RenderResult<()> {
        self.backend().set_enabled(capability, enabled)
    }

    capability_accessors! {
        "blending", is_blending_enabled, enable_blending => Blending;
        "2D texturing", is_texturing_enabled, enable_texturing => Texture2D;
        "lighting", is_lighting_enabled, enable_lighting => Lighting;
        "face culling", is_culling_enabled, enable_culling => CullFace;
        "depth testing", is_depth_test_enabled, enable_depth_test => DepthTest;
        "S texture coordinate generation", is_texture_generation_s_enabled, enable_texture_generation_s => TextureGenS;
        "T texture coordinate generation", is_texture_generation_t_enabled, enable_texture_generation_t => TextureGenT;
        "R texture coordinate generation", is_texture_generation_r_enabled, enable_texture_generation_r => TextureGenR;
        "Q texture coordinate generation", is_texture_generation_q_enabled, enable_texture_generation_q => TextureGenQ;
    }

    // --- Vertices ---

    /// Set a two-component texture coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn set_texture_coordinates2(&mut self, s: f64, t: f64) -> RenderResult<()> {
        self.backend().set_texture_coordinates(s, t, 0.0, 1.0)
    }

    /// Set a three-component texture coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn set_texture_coordinates3(&mut self, s: f64, t: f64, r: f64) -> RenderResult<()> {
        self.backend().set_texture_coordinates(s, t, r, 1.0)
    }

    /// Set a four-component texture coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn set_texture_coordinates4(&mut self, s: f64, t: f64, r: f64, q: f64) -> RenderResult<()> {
        self.backend().set_texture_coordinates(s, t, r, q)
    }

    /// Set the current normal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn set_normal_coordinates(&mut self, x: f64, y: f64, z: f64) -> RenderResult<()> {
        self.backend().set_normal(x, y, z)
    }

    /// Emit a vertex at `(x, y, 0)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn draw_vertex2(&mut self, x: impl Into<f64>, y: impl Into<f64>) -> RenderResult<()> {
        self.backend().vertex(x.into(), y.into(), 0.0, 1.0)
    }

    /// Emit a vertex at `(x, y, z)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn draw_vertex3(
        &mut self,
        x: impl Into<f64>,
        y: impl Into<f64>,
        z: impl Into<f64>,
    ) -> RenderResult<()> {
        self.backend().vertex(x.into(), y.into(), z.into(), 1.0)
    }

    /// Emit a homogeneous vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn draw_vertex4(
        &mut self,
        x: impl Into<f64>,
        y: impl Into<f64>,
        z: impl Into<f64>,
        w: impl Into<f64>,
    ) -> RenderResult<()> {
        self.backend()
            .vertex(x.into(), y.into(), z.into(), w.into())
    }

    /// Emit a vertex from the first two to four components of `v`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgument`] if `v` has fewer than two
    /// components.
    pub fn draw_vertex_slice(&mut self, v: &[f32]) -> RenderResult<()> {
        match *v {
            [x, y, z, w, ..] => self.draw_vertex4(x, y, z, w),
            [x, y, z] => self.draw_vertex3(x, y, z),
            [x, y] => self.draw_vertex2(x, y),
            _ => Err(RenderError::InvalidArgument(format!(
                "vertex needs at least 2 components, got {}",
                v.len()
            ))),
        }
    }

    /// Emit a model vertex with its texture coordinate and normal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn draw_model_vertex(&mut self, vertex: &ModelVertex) -> RenderResult<()> {
        self.set_texture_coordinates2(vertex.texture.u, vertex.texture.v)?;
        let n = vertex.normal;
        self.set_normal_coordinates(f64::from(n.x), f64::from(n.y), f64::from(n.z))?;
        let p = vertex.position;
        self.draw_vertex3(p.x, p.y, p.z)
    }

    /// Emit the three vertices of a triangle.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn draw_triangle(&mut self, triangle: &Triangle) -> RenderResult<()> {
        self.draw_model_vertex(&triangle.0)?;
        self.draw_model_vertex(&triangle.1)?;
        self.draw_model_vertex(&triangle.2)
    }

    /// Open a primitive block.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidState`] if a block is already open.
    pub fn begin(&mut self, mode: RenderMode) -> RenderResult<()> {
        if self.open_blocks > 0 {
            return Err(RenderError::InvalidState(format!(
                "begin({mode:?}) inside an open primitive block"
            )));
        }
        self.backend().begin(mode)?;
        self.open_blocks += 1;
        Ok(())
    }

    /// Close the open primitive block.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidState`] if no block is open.
    pub fn end(&mut self) -> RenderResult<()> {
        if self.open_blocks == 0 {
            return Err(RenderError::InvalidState(
                "end() without a matching begin()".to_string(),
            ));
        }
        self.open_blocks -= 1;
        self.backend().end()
    }

    /// Whether a primitive block is open.
    #[must_use]
    pub fn in_block(&self) -> bool {
        self.open_blocks > 0
    }

    /// Draw from the bound vertex array.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgument`] for negative ranges, or a
    /// backend error if no vertex array is bound.
    pub fn draw_arrays(&mut self, mode: RenderMode, start: i32, count: i32) -> RenderResult<()> {
        if start < 0 || count < 0 {
            return Err(RenderError::InvalidArgument(format!(
                "draw range must be non-negative, got start {start} count {count}"
            )));
        }
        self.backend().draw_arrays(mode, start, count)
    }

    // --- Materials ---

    /// Set a color material parameter.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgument`] for scalar parameters.
    pub fn set_material_vector(
        &mut self,
        face: FaceName,
        name: MaterialParameterName,
        value: [f32; 4],
    ) -> RenderResult<()> {
        if name.is_scalar() {
            return Err(RenderError::InvalidArgument(format!(
                "material parameter {name:?} takes a scalar"
            )));
        }
        self.backend()
            .set_material_parameter(face, name, MaterialValue::Vector(value))
    }

    /// Set a scalar material parameter.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidArgument`] for color parameters.
    pub fn set_material_scalar(
        &mut self,
        face: FaceName,
        name: MaterialParameterName,
        value: f32,
    ) -> RenderResult<()> {
        if !name.is_scalar() {
            return Err(RenderError::InvalidArgument(format!(
                "material parameter {name:?} takes an RGBA vector"
            )));
        }
        self.backend()
            .set_material_parameter(face, name, MaterialValue::Scalar(value))
    }

    // --- Texture and program binding ---

    /// The bound texture.
    #[must_use]
    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Bind a texture; `None` unbinds the target of the last bound texture.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the binding.
    pub fn set_texture(&mut self, texture: Option<&Texture>) -> RenderResult<()> {
        match texture {
            Some(texture) => {
                self.engine.bind_texture(texture.target, Some(texture.id))?;
                self.last_texture_target = texture.target;
                self.texture = Some(texture.clone());
            }
            None => {
                self.engine.bind_texture(self.last_texture_target, None)?;
                self.texture = None;
            }
        }
        Ok(())
    }

    /// The active shader program.
    #[must_use]
    pub fn program(&self) -> Option<&ShaderProgram> {
        self.program.as_ref()
    }

    /// Make a program current (linking it if needed); `None` returns to the
    /// backend's default pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if linking fails.
    pub fn set_program(&mut self, mut program: Option<ShaderProgram>) -> RenderResult<()> {
        self.engine.use_program(program.as_mut())?;
        self.program = program;
        Ok(())
    }

    // --- Matrices ---

    /// The current model-view matrix.
    #[must_use]
    pub fn model_view(&self) -> &Mat4 {
        self.matrices.top()
    }

    /// The current projection matrix.
    #[must_use]
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    fn upload_model_view(&mut self) -> RenderResult<()> {
        let top = *self.matrices.top();
        self.backend().set_model_view(&top)
    }

    /// Save the model-view matrix.
    pub fn push_matrix(&mut self) {
        self.matrices.push();
    }

    /// Restore the last saved model-view matrix.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidState`] on underflow.
    pub fn pop_matrix(&mut self) -> RenderResult<()> {
        self.matrices.pop()?;
        self.upload_model_view()
    }

    /// Post-multiply the model-view matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn multiply_matrix(&mut self, m: &Mat4) -> RenderResult<()> {
        self.matrices.multiply(m);
        self.upload_model_view()
    }

    /// Replace the model-view matrix with the identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn load_identity(&mut self) -> RenderResult<()> {
        self.matrices.load(Mat4::identity());
        self.upload_model_view()
    }

    /// Replace the model-view matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn load_matrix(&mut self, m: Mat4) -> RenderResult<()> {
        self.matrices.load(m);
        self.upload_model_view()
    }

    /// Translate the model-view matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn translate(&mut self, offset: Vec3) -> RenderResult<()> {
        self.multiply_matrix(&Mat4::translation(offset.x, offset.y, offset.z))
    }

    /// Set the projection matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn set_projection(&mut self, projection: Mat4) -> RenderResult<()> {
        self.backend().set_projection(&projection)?;
        self.projection = projection;
        Ok(())
    }

    /// Resize the viewport.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports one.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.backend().resize(width, height)?;
        self.viewport = (width, height);
        Ok(())
    }

    /// Current viewport size.
    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    // --- Textures ---

    /// Load a texture from an image file, reusing it if the file was loaded
    /// before.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded or uploaded.
    pub fn create_texture_from_file(&mut self, path: impl AsRef<Path>) -> RenderResult<Texture> {
        self.create_texture_from_file_with(path, TextureRotation::None, TextureFlip::None)
    }

    /// Load a texture from an image file, rotating and flipping it at upload.
    ///
    /// A cached texture keeps its pixels; only its recorded rotation and
    /// flip are updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded or uploaded.
    pub fn create_texture_from_file_with(
        &mut self,
        path: impl AsRef<Path>,
        rotation: TextureRotation,
        flip: TextureFlip,
    ) -> RenderResult<Texture> {
        let path = path.as_ref();
        if let Some(cached) = self.textures.get_by_file_mut(path) {
            cached.rotation = rotation;
            cached.flip = flip;
            debug!("Texture cache hit for {}", path.display());
            return Ok(cached.clone());
        }

        let data = images::load_image_file(path)?;
        let id = self.engine.generate_texture_id()?;
        let mut texture = Texture {
            file_name: Some(path.to_path_buf()),
            rotation,
            flip,
            ..Texture::new(id)
        };
        if let Err(e) = self.upload_texture(&mut texture, &data.transformed(rotation, flip)) {
            self.discard_texture(id);
            return Err(e);
        }
        self.textures.insert(texture.clone());
        info!("Created texture {} from {}", id, path.display());
        Ok(texture)
    }

    /// Create a texture from decoded RGBA8 pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    pub fn create_texture_from_image(&mut self, image: &TextureData) -> RenderResult<Texture> {
        let id = self.engine.generate_texture_id()?;
        let mut texture = Texture::new(id);
        if let Err(e) = self.upload_texture(&mut texture, image) {
            self.discard_texture(id);
            return Err(e);
        }
        self.textures.insert(texture.clone());
        debug!("Created texture {} from {}x{} image", id, image.width, image.height);
        Ok(texture)
    }

    /// The texture registered under `id`, or a default 2D handle for ids
    /// created elsewhere.
    #[must_use]
    pub fn texture_by_id(&self, id: TextureId) -> Texture {
        self.textures
            .get(id)
            .cloned()
            .unwrap_or_else(|| Texture::new(id))
    }

    /// Textures created by this canvas.
    #[must_use]
    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    fn upload_texture(&mut self, texture: &mut Texture, image: &TextureData) -> RenderResult<()> {
        self.engine.bind_texture(texture.target, Some(texture.id))?;
        self.engine.set_texture_image(&TextureImage {
            target: texture.target,
            level: 0,
            internal_format: TextureFormat::Rgba,
            width: image.width,
            height: image.height,
            format: TextureFormat::Rgba,
            element_type: ElementType::UnsignedByte,
            data: Some(&image.data),
        })?;
        texture.width = image.width;
        texture.height = image.height;
        self.apply_sampling(texture)?;
        self.restore_texture_binding()
    }

    fn apply_sampling(&mut self, texture: &Texture) -> RenderResult<()> {
        let target = TextureParameterTarget::from(texture.target);
        self.engine
            .set_texture_parameter(target, TextureParameterName::MinFilter, texture.min_filter)?;
        self.engine
            .set_texture_parameter(target, TextureParameterName::MagFilter, texture.mag_filter)?;
        self.engine
            .set_texture_parameter(target, TextureParameterName::WrapS, texture.wrap_s)?;
        self.engine
            .set_texture_parameter(target, TextureParameterName::WrapT, texture.wrap_t)
    }

    /// Delete a texture whose upload failed and put the canvas binding back.
    fn discard_texture(&mut self, id: TextureId) {
        if let Err(e) = self.engine.delete_textures(&[id]) {
            warn!("Failed to delete texture {}: {}", id, e);
        }
        if let Err(e) = self.restore_texture_binding() {
            warn!("Failed to restore texture binding: {}", e);
        }
    }

    fn restore_texture_binding(&mut self) -> RenderResult<()> {
        match self.texture.clone() {
            Some(current) => self.engine.bind_texture(current.target, Some(current.id)),
            None => self.engine.bind_texture(self.last_texture_target, None),
        }
    }

    // --- Glyphs and text ---

    /// Set the rasterizer used for glyphs not yet cached.
    pub fn set_font_rasterizer(&mut self, rasterizer: Box<dyn GlyphRasterizer>) {
        self.rasterizer = Some(rasterizer);
    }

    /// Whether a glyph for `ch` has been uploaded.
    #[must_use]
    pub fn is_character_glyph_initialized(&self, ch: char) -> bool {
        self.glyphs.contains(ch)
    }

    /// The uploaded glyph for `ch`.
    #[must_use]
    pub fn character_glyph(&self, ch: char) -> Option<&CharacterGlyph> {
        self.glyphs.get(ch)
    }

    /// Rasterize and upload every character of `text` not yet cached.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Glyph`] if a glyph is needed and no rasterizer
    /// is set, or the rasterizer's error.
    pub fn initialize_character_glyphs(&mut self, text: &str) -> RenderResult<()> {
        let pixel_size = self.config.glyph_pixel_size;
        let stale = self.glyphs.set_pixel_size(pixel_size);
        if !stale.is_empty() {
            for id in &stale {
                self.textures.remove(*id);
            }
            self.engine.delete_textures(&stale)?;
            debug!("Dropped {} glyphs for new pixel size {}", stale.len(), pixel_size);
        }

        let mut uploaded = false;
        for ch in text.chars() {
            if self.glyphs.contains(ch) {
                continue;
            }
            let rasterizer = self
                .rasterizer
                .as_mut()
                .ok_or_else(|| RenderError::Glyph("no glyph rasterizer configured".to_string()))?;
            let glyph = rasterizer.rasterize(ch, pixel_size)?;

            let id = self.engine.generate_texture_id()?;
            let texture = Texture {
                wrap_s: TextureWrap::ClampToEdge,
                wrap_t: TextureWrap::ClampToEdge,
                min_filter: TextureFilter::Linear,
                mag_filter: TextureFilter::Linear,
                width: glyph.size.width,
                height: glyph.size.height,
                ..Texture::new(id)
            };
            if let Err(e) = self.upload_glyph(&texture, &glyph.bitmap) {
                self.discard_texture(id);
                return Err(e);
            }
            self.textures.insert(texture);
            uploaded = true;

            self.glyphs.register(
                ch,
                CharacterGlyph {
                    texture_id: id,
                    size: glyph.size,
                    bearing: glyph.bearing,
                    advance: glyph.advance,
                },
            );
            debug!("Initialized glyph {:?} as texture {}", ch, id);
        }
        if uploaded {
            self.restore_texture_binding()?;
        }
        Ok(())
    }

    fn upload_glyph(&mut self, texture: &Texture, bitmap: &[u8]) -> RenderResult<()> {
        self.engine.bind_texture(texture.target, Some(texture.id))?;
        self.engine.set_texture_image(&TextureImage {
            target: texture.target,
            level: 0,
            internal_format: TextureFormat::Red,
            width: texture.width,
            height: texture.height,
            format: TextureFormat::Red,
            element_type: ElementType::UnsignedByte,
            data: Some(bitmap),
        })?;
        self.apply_sampling(texture)
    }

    /// Draw a line of text with its baseline starting at `position`, in
    /// viewport pixels with the origin at the bottom left.
    ///
    /// # Errors
    ///
    /// Returns an error if a glyph cannot be initialized or a draw fails.
    pub fn draw_text(
        &mut self,
        text: &str,
        position: Vec2,
        color: Color,
        scale: f64,
    ) -> RenderResult<()> {
        self.initialize_character_glyphs(text)?;

        let mut resources = match self.text.take() {
            Some(resources) => resources,
            None => self.create_text_resources()?,
        };
        let result = self.draw_text_with(&mut resources, text, position, color, scale);
        self.text = Some(resources);
        result
    }

    fn create_text_resources(&mut self) -> RenderResult<TextResources> {
        let engine = &mut self.engine;
        let vertex_array = engine.create_vertex_array()?;
        let mut buffer = engine.create_buffer()?;
        engine.bind_vertex_array(&vertex_array)?;
        engine.bind_buffer(&mut buffer, BufferTarget::ArrayBuffer)?;
        engine.set_buffer_data(
            &buffer,
            &[0.0f32; TEXT_QUAD_VERTICES * TEXT_VERTEX_FLOATS],
            BufferDataUsage::DynamicDraw,
        )?;
        engine.enable_vertex_attribute(0)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let stride = (TEXT_VERTEX_FLOATS * std::mem::size_of::<f32>()) as i32;
        engine.set_vertex_attribute_pointer_typed::<f32>(0, 4, false, stride, 0)?;
        engine.unbind_buffer(&buffer)?;
        engine.unbind_vertex_array()?;

        let mut program = engine.create_shader_program()?;
        let vertex =
            engine.create_shader_from_resource(ShaderType::Vertex, shaders::TEXT_VERTEX_NAME)?;
        let fragment =
            engine.create_shader_from_resource(ShaderType::Fragment, shaders::TEXT_FRAGMENT_NAME)?;
        engine.attach_shader_to_program(&mut program, vertex)?;
        engine.attach_shader_to_program(&mut program, fragment)?;
        engine.link_program(&mut program)?;
        debug!("Created text resources (program {})", program.id);

        Ok(TextResources {
            vertex_array,
            buffer,
            program,
        })
    }

    fn draw_text_with(
        &mut self,
        resources: &mut TextResources,
        text: &str,
        position: Vec2,
        color: Color,
        scale: f64,
    ) -> RenderResult<()> {
        let drawn = self.draw_glyphs(resources, text, position, color, scale);
        let restored = self.finish_text();
        drawn.and(restored)
    }

    /// Unbind the text objects and reinstall the canvas program. Every step
    /// runs even if an earlier one fails.
    fn finish_text(&mut self) -> RenderResult<()> {
        let vertex_array = self.engine.unbind_vertex_array();
        let texture = self.set_texture(None);
        let program = self.engine.use_program(self.program.as_mut());
        vertex_array.and(texture).and(program)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn draw_glyphs(
        &mut self,
        resources: &mut TextResources,
        text: &str,
        position: Vec2,
        color: Color,
        scale: f64,
    ) -> RenderResult<()> {
        self.engine.use_program(Some(&mut resources.program))?;
        self.engine.set_program_uniform(
            &resources.program,
            "textColor",
            (color.r as f32, color.g as f32, color.b as f32),
        )?;
        self.engine
            .set_program_uniform(&resources.program, "text", 0i32)?;
        let (width, height) = self.viewport;
        #[allow(clippy::cast_precision_loss)]
        let projection = Mat4::orthographic(0.0, width as f32, 0.0, height as f32, -1.0, 1.0);
        self.engine.set_program_uniform_matrix(
            &resources.program,
            "projection",
            1,
            false,
            &projection.data,
        )?;

        self.engine.bind_vertex_array(&resources.vertex_array)?;
        let mut pen_x = position.x;
        for ch in text.chars() {
            let glyph = *self.glyphs.get(ch).ok_or_else(|| {
                RenderError::Glyph(format!("glyph for {ch:?} is not initialized"))
            })?;

            if !glyph.is_blank() {
                let x = pen_x + f64::from(glyph.bearing.x) * scale;
                let y = position.y
                    - (f64::from(glyph.size.height) - f64::from(glyph.bearing.y)) * scale;
                let w = f64::from(glyph.size.width) * scale;
                let h = f64::from(glyph.size.height) * scale;
                let vertices = glyph_quad(x as f32, y as f32, w as f32, h as f32);

                let texture = self.texture_by_id(glyph.texture_id);
                self.set_texture(Some(&texture))?;
                self.engine
                    .bind_buffer(&mut resources.buffer, BufferTarget::ArrayBuffer)?;
                self.engine
                    .set_buffer_sub_data(&resources.buffer, 0, &vertices)?;
                self.engine.unbind_buffer(&resources.buffer)?;
                self.draw_arrays(RenderMode::Triangles, 0, TEXT_QUAD_DRAW_COUNT)?;
            }

            pen_x += f64::from(glyph.advance_pixels()) * scale;
        }
        Ok(())
    }

    // --- Models ---

    /// Draw a model: its materials (or first raw surface) and optionally
    /// its skeleton. Material textures are created on the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if a draw or texture upload fails.
    pub fn draw_model(&mut self, model: &mut Model) -> RenderResult<()> {
        if self.config.render_models {
            if !model.materials_loaded {
                self.load_materials(model)?;
            }
            let ignore_edge_flag = model.ignore_edge_flag;
            for material in &mut model.materials {
                self.draw_material(material, ignore_edge_flag)?;
            }
        } else {
            self.draw_raw_surface(model)?;
        }

        if self.config.render_bones {
            self.draw_bones(model)?;
        }
        Ok(())
    }

    fn load_materials(&mut self, model: &mut Model) -> RenderResult<()> {
        let base_dir = model.base_dir()?;
        match &model.source_path {
            Some(path) => info!("Loading materials for {}", path.display()),
            None => info!("Loading materials"),
        }

        let count = model.materials.len();
        for (index, material) in model.materials.iter_mut().enumerate() {
            info!("Loading material {}/{}", index + 1, count);
            for texture in &mut material.textures {
                self.load_model_texture(texture, &base_dir);
            }
        }
        model.materials_loaded = true;
        Ok(())
    }

    fn load_model_texture(&mut self, texture: &mut ModelTexture, base_dir: &Path) {
        if let Some(picture) = &texture.picture {
            if texture.texture_id.is_none() {
                match self.create_texture_from_image(picture) {
                    Ok(created) => texture.texture_id = Some(created.id),
                    Err(e) => warn!("Skipping embedded texture picture: {}", e),
                }
            }
        } else if let Some(file) = non_empty(texture.texture_file_name.as_deref()) {
            if !texture.flags.is_empty() && texture.texture_id.is_none() {
                texture.texture_id = self.load_model_texture_file(&base_dir.join(file));
            }
        }

        if texture.flags.intersects(ModelTextureFlags::MAP | ModelTextureFlags::ADD_MAP)
            && texture.map_id.is_none()
        {
            if texture.picture.is_some() {
                texture.map_id = texture.texture_id;
            } else if let Some(file) = non_empty(texture.map_file_name.as_deref()) {
                texture.map_id = self.load_model_texture_file(&base_dir.join(file));
            }
        }
    }

    /// Missing or undecodable images leave the slot untextured.
    fn load_model_texture_file(&mut self, path: &Path) -> Option<TextureId> {
        if !path.exists() {
            warn!("Texture image not found: {}", path.display());
            return None;
        }
        match self.create_texture_from_file(path) {
            Ok(texture) => Some(texture.id),
            Err(e) => {
                warn!("Skipping texture {}: {}", path.display(), e);
                None
            }
        }
    }

    fn draw_material(&mut self, material: &mut Material, ignore_edge_flag: bool) -> RenderResult<()> {
        material.advance_texture_index();
        let (flags, texture_id, map_id) = material
            .current_texture()
            .map_or((ModelTextureFlags::empty(), None, None), |t| {
                (t.flags, t.texture_id, t.map_id)
            });

        match (texture_id, map_id) {
            (Some(id), _) if flags.contains(ModelTextureFlags::TEXTURE) => {
                let texture = self.texture_by_id(id);
                self.set_texture(Some(&texture))?;
                self.enable_texturing(true)?;
                self.enable_texture_generation_s(false)?;
                self.enable_texture_generation_t(false)?;
            }
            (_, Some(id))
                if flags.intersects(ModelTextureFlags::MAP | ModelTextureFlags::ADD_MAP) =>
            {
                let texture = self.texture_by_id(id);
                self.set_texture(Some(&texture))?;
                self.enable_texturing(false)?;
                self.enable_texture_generation_s(true)?;
                self.enable_texture_generation_t(true)?;
            }
            _ => {
                self.enable_texturing(false)?;
                self.enable_texture_generation_s(false)?;
                self.enable_texture_generation_t(false)?;
            }
        }

        if !material.always_light && (material.edge_flag || ignore_edge_flag) {
            let face = FaceName::Both;
            self.set_material_vector(
                face,
                MaterialParameterName::Diffuse,
                material.diffuse.to_array_f32(),
            )?;
            self.set_material_vector(
                face,
                MaterialParameterName::Ambient,
                material.ambient.to_array_f32(),
            )?;
            self.set_material_vector(
                face,
                MaterialParameterName::Specular,
                material.specular.to_array_f32(),
            )?;
            self.set_material_scalar(face, MaterialParameterName::Shininess, material.shininess)?;
            self.enable_lighting(true)?;
        } else {
            self.set_color(material.ambient.add(material.diffuse))?;
            self.enable_lighting(false)?;
        }

        self.begin(RenderMode::Triangles)?;
        for triangle in &material.triangles {
            self.draw_triangle(triangle)?;
        }
        self.end()
    }

    fn draw_raw_surface(&mut self, model: &Model) -> RenderResult<()> {
        self.enable_lighting(false)?;
        self.enable_texturing(false)?;
        self.set_color(Color::WHITE)?;

        let Some(surface) = model.surfaces.first() else {
            return Ok(());
        };
        self.begin(RenderMode::Triangles)?;
        for vertices in surface.vertices.chunks_exact(3) {
            for vertex in vertices {
                self.draw_model_vertex(vertex)?;
            }
        }
        self.end()
    }

    fn draw_bones(&mut self, model: &Model) -> RenderResult<()> {
        self.enable_culling(false)?;
        self.enable_texturing(false)?;
        let cube = bone_cube(self.config.bone_size / 2.0);

        for bone in &model.bones {
            self.push_matrix();
            self.translate(bone.position)?;
            self.set_color(Color::MAGENTA)?;
            self.begin(RenderMode::Quads)?;
            for [x, y, z] in cube {
                self.draw_vertex3(x, y, z)?;
            }
            self.end()?;
            self.pop_matrix()?;

            if let Some(parent) = bone.parent.and_then(|p| model.bones.get(p)) {
                self.push_matrix();
                self.set_color(Color::WHITE)?;
                self.begin(RenderMode::Lines)?;
                self.draw_vertex_slice(&parent.position.to_array())?;
                self.draw_vertex_slice(&bone.position.to_array())?;
                self.end()?;
                self.pop_matrix()?;
            }
        }
        Ok(())
    }

    /// Delete every texture, glyph and text resource this canvas created.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to delete a resource.
    pub fn release_resources(&mut self) -> RenderResult<()> {
        self.set_texture(None)?;
        self.glyphs.drain_textures();
        let ids = self.textures.drain_ids();
        if !ids.is_empty() {
            self.engine.delete_textures(&ids)?;
        }
        if let Some(text) = self.text.take() {
            self.engine.delete_vertex_array(text.vertex_array)?;
            self.engine.delete_buffers(&[text.buffer])?;
            let shaders = text.program.shaders.clone();
            self.engine.delete_shader_program(text.program)?;
            for shader in shaders {
                self.engine.delete_shader(shader)?;
            }
        }
        debug!("Released {} textures", ids.len());
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Two triangles covering a glyph rectangle, as `x, y, s, t` per vertex.
#[must_use]
#[rustfmt::skip]
pub fn glyph_quad(x: f32, y: f32, w: f32, h: f32) -> [f32; TEXT_QUAD_VERTICES * TEXT_VERTEX_FLOATS] {
    [
        x, y + h, 0.0, 0.0,
        x, y, 0.0, 1.0,
        x + w, y, 1.0, 1.0,
        x, y + h, 0.0, 0.0,
        x + w, y, 1.0, 1.0,
        x + w, y + h, 1.0, 0.0,
    ]
}

/// Six quads of a cube centred on the origin.
#[rustfmt::skip]
fn bone_cube(half: f32) -> [[f32; 3]; 24] {
    let s = half;
    [
        // +Z
        [-s, -s, s], [s, -s, s], [s, s, s], [-s, s, s],
        // -Z
        [-s, -s, -s], [-s, s, -s], [s, s, -s], [s, -s, -s],
        // +Y
        [-s, s, -s], [-s, s, s], [s, s, s], [s, s, -s],
        // -Y
        [-s, -s, -s], [s, -s, -s], [s, -s, s], [-s, -s, s],
        // +X
        [s, -s, -s], [s, s, -s], [s, s, s], [s, -s, s],
        // -X
        [-s, -s, -s], [-s, -s, s], [-s, s, s], [-s, s, -s],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Command, CommandLog, RecordingBackend};

    fn canvas() -> (Canvas, CommandLog) {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let canvas = Engine::new(Box::new(backend)).create_canvas(CanvasConfig::default());
        (canvas, log)
    }

    #[test]
    fn test_begin_inside_block_fails() {
        let (mut canvas, _) = canvas();
        canvas.begin(RenderMode::Triangles).unwrap();
        assert!(matches!(
            canvas.begin(RenderMode::Lines),
            Err(RenderError::InvalidState(_))
        ));
        canvas.end().unwrap();
        assert!(!canvas.in_block());
    }

    #[test]
    fn test_end_without_begin_fails() {
        let (mut canvas, log) = canvas();
        assert!(matches!(canvas.end(), Err(RenderError::InvalidState(_))));
        assert!(log.is_empty());
    }

    #[test]
    fn test_vertex_slice_arity() {
        let (mut canvas, log) = canvas();
        canvas.draw_vertex_slice(&[1.0, 2.0]).unwrap();
        canvas.draw_vertex_slice(&[1.0, 2.0, 3.0]).unwrap();
        canvas.draw_vertex_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(matches!(
            canvas.draw_vertex_slice(&[1.0]),
            Err(RenderError::InvalidArgument(_))
        ));
        assert_eq!(
            log.commands(),
            vec![
                Command::Vertex([1.0, 2.0, 0.0, 1.0]),
                Command::Vertex([1.0, 2.0, 3.0, 1.0]),
                Command::Vertex([1.0, 2.0, 3.0, 4.0]),
            ]
        );
    }

    #[test]
    fn test_negative_draw_range_is_rejected() {
        let (mut canvas, log) = canvas();
        for (start, count) in [(-1, 3), (0, -3)] {
            assert!(matches!(
                canvas.draw_arrays(RenderMode::Triangles, start, count),
                Err(RenderError::InvalidArgument(_))
            ));
        }
        assert!(log.is_empty());
    }

    #[test]
    fn test_integer_vertices_convert() {
        let (mut canvas, log) = canvas();
        canvas.draw_vertex3(1i32, 2u8, 3.5f32).unwrap();
        assert_eq!(log.commands(), vec![Command::Vertex([1.0, 2.0, 3.5, 1.0])]);
    }

    #[test]
    fn test_material_arity() {
        let (mut canvas, _) = canvas();
        assert!(matches!(
            canvas.set_material_vector(FaceName::Front, MaterialParameterName::Shininess, [0.0; 4]),
            Err(RenderError::InvalidArgument(_))
        ));
        assert!(matches!(
            canvas.set_material_scalar(FaceName::Front, MaterialParameterName::Diffuse, 1.0),
            Err(RenderError::InvalidArgument(_))
        ));
        canvas
            .set_material_scalar(FaceName::Both, MaterialParameterName::Shininess, 8.0)
            .unwrap();
    }

    #[test]
    fn test_capability_accessors() {
        let (mut canvas, _) = canvas();
        assert!(!canvas.is_blending_enabled());
        canvas.enable_blending(true).unwrap();
        assert!(canvas.is_blending_enabled());
        canvas.enable_texture_generation_q(true).unwrap();
        assert!(canvas.is_enabled(Capability::TextureGenQ));
    }

    #[test]
    fn test_unbind_uses_last_target() {
        let (mut canvas, log) = canvas();
        let texture = Texture {
            target: TextureTarget::CubeMap,
            ..Texture::new(TextureId(9))
        };
        canvas.engine_mut().generate_texture_ids(9).unwrap();
        canvas.set_texture(Some(&texture)).unwrap();
        canvas.set_texture(None).unwrap();
        let commands = log.commands();
        assert_eq!(
            commands.last(),
            Some(&Command::BindTexture(TextureTarget::CubeMap, None))
        );
        assert!(canvas.texture().is_none());
    }

    #[test]
    fn test_pop_uploads_saved_matrix() {
        let (mut canvas, log) = canvas();
        canvas.push_matrix();
        canvas.translate(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        canvas.pop_matrix().unwrap();
        assert_eq!(log.commands().last(), Some(&Command::ModelView(Mat4::identity())));
        assert!(matches!(canvas.pop_matrix(), Err(RenderError::InvalidState(_))));
    }

    #[test]
    fn test_glyph_quad_layout() {
        let quad = glyph_quad(10.0, 20.0, 5.0, 8.0);
        assert_eq!(&quad[0..4], &[10.0, 28.0, 0.0, 0.0]);
        assert_eq!(&quad[8..12], &[15.0, 20.0, 1.0, 1.0]);
        assert_eq!(&quad[20..24], &[15.0, 28.0, 1.0, 0.0]);
    }

    #[test]
    fn test_bone_cube_faces_are_planar() {
        let cube = bone_cube(0.5);
        for face in cube.chunks_exact(4) {
            let shared_axis = (0..3).any(|axis| face.iter().all(|v| v[axis] == face[0][axis]));
            assert!(shared_axis);
        }
    }

    #[test]
    fn test_text_without_rasterizer_fails() {
        let (mut canvas, _) = canvas();
        assert!(matches!(
            canvas.draw_text("hi", Vec2::new(0.0, 0.0), Color::WHITE, 1.0),
            Err(RenderError::Glyph(_))
        ));
    }
}
