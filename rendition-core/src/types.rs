//! Backend-neutral enumerations and small value types.
//!
//! Every enum here is translated to native constants by the backend; none of
//! them carry API-specific values.

use serde::{Deserialize, Serialize};

/// Primitive assembly mode for `begin`/`end` blocks and array draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderMode {
    /// Each vertex is a point.
    Points,
    /// Each pair of vertices is a segment.
    Lines,
    /// Connected segments, closed back to the first vertex.
    LineLoop,
    /// Connected segments.
    LineStrip,
    /// Each triple of vertices is a triangle.
    Triangles,
    /// Triangle strip.
    TriangleStrip,
    /// Triangle fan around the first vertex.
    TriangleFan,
    /// Each group of four vertices is a quad.
    Quads,
    /// Quad strip.
    QuadStrip,
    /// A single convex polygon.
    Polygon,
}

/// Which polygon faces a material parameter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceName {
    /// Front faces.
    Front,
    /// Back faces.
    Back,
    /// Front and back faces.
    Both,
}

/// Material parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialParameterName {
    /// Ambient reflectance (RGBA).
    Ambient,
    /// Diffuse reflectance (RGBA).
    Diffuse,
    /// Specular reflectance (RGBA).
    Specular,
    /// Emitted light intensity (RGBA).
    Emission,
    /// Specular exponent (scalar).
    Shininess,
    /// Ambient and diffuse set together (RGBA).
    AmbientAndDiffuse,
}

impl MaterialParameterName {
    /// Whether this parameter takes a single scalar rather than an RGBA vector.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        matches!(self, Self::Shininess)
    }
}

/// A value for a material parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaterialValue {
    /// Scalar value (shininess).
    Scalar(f32),
    /// RGBA vector value.
    Vector([f32; 4]),
}

/// Server-side capabilities that can be toggled on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Color blending.
    Blending,
    /// Two-dimensional texturing.
    Texture2D,
    /// Lighting.
    Lighting,
    /// Face culling.
    CullFace,
    /// Depth testing.
    DepthTest,
    /// Texture coordinate generation for S.
    TextureGenS,
    /// Texture coordinate generation for T.
    TextureGenT,
    /// Texture coordinate generation for R.
    TextureGenR,
    /// Texture coordinate generation for Q.
    TextureGenQ,
}

/// Texture binding targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureTarget {
    /// One-dimensional texture.
    Texture1D,
    /// Two-dimensional texture.
    #[default]
    Texture2D,
    /// Three-dimensional texture.
    Texture3D,
    /// Cube map texture.
    CubeMap,
    /// Rectangle texture.
    Rectangle,
}

/// Targets accepted by texture parameter calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureParameterTarget {
    /// One-dimensional texture.
    Texture1D,
    /// Two-dimensional texture.
    Texture2D,
    /// Three-dimensional texture.
    Texture3D,
    /// Cube map texture.
    CubeMap,
}

impl From<TextureTarget> for TextureParameterTarget {
    fn from(target: TextureTarget) -> Self {
        match target {
            TextureTarget::Texture1D => Self::Texture1D,
            TextureTarget::Texture2D | TextureTarget::Rectangle => Self::Texture2D,
            TextureTarget::Texture3D => Self::Texture3D,
            TextureTarget::CubeMap => Self::CubeMap,
        }
    }
}

/// Texture parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureParameterName {
    /// Wrap mode along S.
    WrapS,
    /// Wrap mode along T.
    WrapT,
    /// Wrap mode along R.
    WrapR,
    /// Minification filter.
    MinFilter,
    /// Magnification filter.
    MagFilter,
}

/// Texture wrap modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureWrap {
    /// Tile the texture.
    #[default]
    Repeat,
    /// Tile, mirroring every other repetition.
    MirroredRepeat,
    /// Clamp to the edge texels.
    ClampToEdge,
    /// Clamp to the border color.
    ClampToBorder,
}

/// Texture sampling filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFilter {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation.
    #[default]
    Linear,
    /// Nearest texel from the nearest mipmap.
    NearestMipmapNearest,
    /// Linear interpolation in the nearest mipmap.
    LinearMipmapNearest,
    /// Nearest texel, interpolated between mipmaps.
    NearestMipmapLinear,
    /// Trilinear filtering.
    LinearMipmapLinear,
}

/// Pixel formats for texture images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    /// Single red channel.
    Red,
    /// Red and green channels.
    Rg,
    /// RGB.
    Rgb,
    /// BGR.
    Bgr,
    /// RGBA.
    Rgba,
    /// BGRA.
    Bgra,
    /// Depth component.
    DepthComponent,
}

impl TextureFormat {
    /// Number of components per pixel.
    #[must_use]
    pub const fn components(self) -> usize {
        match self {
            Self::Red | Self::DepthComponent => 1,
            Self::Rg => 2,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }
}

/// Element data types for pixels and vertex attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// Signed 8-bit.
    Byte,
    /// Unsigned 8-bit.
    UnsignedByte,
    /// Signed 16-bit.
    Short,
    /// Unsigned 16-bit.
    UnsignedShort,
    /// Signed 32-bit.
    Int,
    /// Unsigned 32-bit.
    UnsignedInt,
    /// 16-bit float.
    HalfFloat,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
}

impl ElementType {
    /// Size of one element in bytes.
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort | Self::HalfFloat => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
            Self::Double => 8,
        }
    }
}

/// Buffer binding targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferTarget {
    /// Vertex attribute data.
    ArrayBuffer,
    /// Vertex index data.
    ElementArrayBuffer,
    /// Uniform block storage.
    UniformBuffer,
    /// Pixel read-back target.
    PixelPackBuffer,
    /// Pixel upload source.
    PixelUnpackBuffer,
}

/// Usage hint for buffer data stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferDataUsage {
    /// Modified once, used a few times.
    StreamDraw,
    /// Modified once, used many times.
    StaticDraw,
    /// Modified repeatedly, used many times.
    DynamicDraw,
    /// Read back once.
    StreamRead,
    /// Read back many times.
    StaticRead,
    /// Read back repeatedly.
    DynamicRead,
}

/// Shader stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderType {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
    /// Geometry stage.
    Geometry,
    /// Tessellation control stage.
    TessControl,
    /// Tessellation evaluation stage.
    TessEvaluation,
    /// Compute stage.
    Compute,
}

/// Rotation applied to a texture image before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureRotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Rotate90,
    /// 180 degrees.
    Rotate180,
    /// 270 degrees clockwise.
    Rotate270,
}

/// Flip applied to a texture image before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFlip {
    /// No flip.
    #[default]
    None,
    /// Mirror left-right.
    Horizontal,
    /// Mirror top-bottom.
    Vertical,
    /// Mirror both axes.
    Both,
}

/// A shader uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Integer (also used for booleans and sampler units).
    Int(i32),
    /// Float.
    Float(f32),
    /// Two floats.
    Vec2(f32, f32),
    /// Three floats.
    Vec3(f32, f32, f32),
    /// Three doubles.
    DVec3(f64, f64, f64),
    /// Four floats.
    Vec4(f32, f32, f32, f32),
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Int(i32::from(value))
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<(f32, f32)> for UniformValue {
    fn from((a, b): (f32, f32)) -> Self {
        Self::Vec2(a, b)
    }
}

impl From<(f32, f32, f32)> for UniformValue {
    fn from((a, b, c): (f32, f32, f32)) -> Self {
        Self::Vec3(a, b, c)
    }
}

impl From<(f64, f64, f64)> for UniformValue {
    fn from((a, b, c): (f64, f64, f64)) -> Self {
        Self::DVec3(a, b, c)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from([a, b, c, d]: [f32; 4]) -> Self {
        Self::Vec4(a, b, c, d)
    }
}

/// A texture parameter value before backend translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureParameterValue {
    /// Raw float.
    Float(f32),
    /// Raw integer.
    Int(i32),
    /// Wrap mode.
    Wrap(TextureWrap),
    /// Sampling filter.
    Filter(TextureFilter),
}

impl From<f32> for TextureParameterValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for TextureParameterValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<TextureWrap> for TextureParameterValue {
    fn from(value: TextureWrap) -> Self {
        Self::Wrap(value)
    }
}

impl From<TextureFilter> for TextureParameterValue {
    fn from(value: TextureFilter) -> Self {
        Self::Filter(value)
    }
}

/// An RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Alpha.
    pub a: f64,
}

impl Color {
    /// Fully transparent black.
    pub const EMPTY: Self = Self::from_rgba_f64(0.0, 0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Self = Self::from_rgba_f64(1.0, 1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::from_rgba_f64(0.0, 0.0, 0.0, 1.0);
    /// Opaque magenta.
    pub const MAGENTA: Self = Self::from_rgba_f64(1.0, 0.0, 1.0, 1.0);

    /// Create a color from double-precision components.
    #[must_use]
    pub const fn from_rgba_f64(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from single-precision components.
    #[must_use]
    pub fn from_rgba_f32(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::from_rgba_f64(f64::from(r), f64::from(g), f64::from(b), f64::from(a))
    }

    /// Create a color from 8-bit components.
    #[must_use]
    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_rgba_f64(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            f64::from(a) / 255.0,
        )
    }

    /// Components as a single-precision array.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_array_f32(self) -> [f32; 4] {
        [self.r as f32, self.g as f32, self.b as f32, self.a as f32]
    }

    /// Component-wise sum, used when folding ambient into diffuse.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self::from_rgba_f64(
            self.r + other.r,
            self.g + other.g,
            self.b + other.b,
            self.a + other.a,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_format_components() {
        assert_eq!(TextureFormat::Red.components(), 1);
        assert_eq!(TextureFormat::Rgb.components(), 3);
        assert_eq!(TextureFormat::Bgra.components(), 4);
    }

    #[test]
    fn test_color_add() {
        let ambient = Color::from_rgba_f64(0.1, 0.2, 0.3, 0.5);
        let diffuse = Color::from_rgba_f64(0.4, 0.4, 0.4, 0.5);
        let sum = ambient.add(diffuse);
        assert!((sum.r - 0.5).abs() < 1e-9);
        assert!((sum.g - 0.6).abs() < 1e-9);
        assert!((sum.b - 0.7).abs() < 1e-9);
        assert!((sum.a - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_color_from_u8() {
        let c = Color::from_rgba_u8(255, 0, 51, 255);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_rectangle_target_maps_to_2d_parameters() {
        assert_eq!(
            TextureParameterTarget::from(TextureTarget::Rectangle),
            TextureParameterTarget::Texture2D
        );
    }

    #[test]
    fn test_bool_uniform_is_int() {
        assert_eq!(UniformValue::from(true), UniformValue::Int(1));
        assert_eq!(UniformValue::from(false), UniformValue::Int(0));
    }

    #[test]
    fn test_shininess_is_scalar() {
        assert!(MaterialParameterName::Shininess.is_scalar());
        assert!(!MaterialParameterName::Diffuse.is_scalar());
    }
}
