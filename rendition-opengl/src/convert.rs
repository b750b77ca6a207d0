//! Translation of backend-neutral enums to OpenGL constants.

use rendition_core::types::{
    BufferDataUsage, BufferTarget, Capability, ElementType, RenderMode, ShaderType,
    TextureFilter, TextureFormat, TextureParameterName, TextureParameterTarget, TextureTarget,
    TextureWrap,
};

/// GL draw mode for a primitive that GL can draw directly.
///
/// Quads, quad strips and polygons are assembled into triangles before they
/// reach GL; see [`crate::immediate`].
#[must_use]
pub const fn render_mode(mode: RenderMode) -> u32 {
    match mode {
        RenderMode::Points => glow::POINTS,
        RenderMode::Lines => glow::LINES,
        RenderMode::LineLoop => glow::LINE_LOOP,
        RenderMode::LineStrip => glow::LINE_STRIP,
        RenderMode::Triangles | RenderMode::Quads | RenderMode::QuadStrip => glow::TRIANGLES,
        RenderMode::TriangleStrip => glow::TRIANGLE_STRIP,
        RenderMode::TriangleFan | RenderMode::Polygon => glow::TRIANGLE_FAN,
    }
}

/// Real GL capability, if the capability is not emulated in the shader.
#[must_use]
pub const fn capability(capability: Capability) -> Option<u32> {
    match capability {
        Capability::Blending => Some(glow::BLEND),
        Capability::CullFace => Some(glow::CULL_FACE),
        Capability::DepthTest => Some(glow::DEPTH_TEST),
        Capability::Texture2D
        | Capability::Lighting
        | Capability::TextureGenS
        | Capability::TextureGenT
        | Capability::TextureGenR
        | Capability::TextureGenQ => None,
    }
}

/// GL texture binding target.
#[must_use]
pub const fn texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture1D => glow::TEXTURE_1D,
        TextureTarget::Texture2D => glow::TEXTURE_2D,
        TextureTarget::Texture3D => glow::TEXTURE_3D,
        TextureTarget::CubeMap => glow::TEXTURE_CUBE_MAP,
        TextureTarget::Rectangle => glow::TEXTURE_RECTANGLE,
    }
}

/// GL texture parameter target.
#[must_use]
pub const fn texture_parameter_target(target: TextureParameterTarget) -> u32 {
    match target {
        TextureParameterTarget::Texture1D => glow::TEXTURE_1D,
        TextureParameterTarget::Texture2D => glow::TEXTURE_2D,
        TextureParameterTarget::Texture3D => glow::TEXTURE_3D,
        TextureParameterTarget::CubeMap => glow::TEXTURE_CUBE_MAP,
    }
}

/// GL texture parameter name.
#[must_use]
pub const fn texture_parameter_name(name: TextureParameterName) -> u32 {
    match name {
        TextureParameterName::WrapS => glow::TEXTURE_WRAP_S,
        TextureParameterName::WrapT => glow::TEXTURE_WRAP_T,
        TextureParameterName::WrapR => glow::TEXTURE_WRAP_R,
        TextureParameterName::MinFilter => glow::TEXTURE_MIN_FILTER,
        TextureParameterName::MagFilter => glow::TEXTURE_MAG_FILTER,
    }
}

/// GL wrap mode.
#[must_use]
pub const fn texture_wrap(wrap: TextureWrap) -> u32 {
    match wrap {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::ClampToBorder => glow::CLAMP_TO_BORDER,
    }
}

/// GL sampling filter.
#[must_use]
pub const fn texture_filter(filter: TextureFilter) -> u32 {
    match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        TextureFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        TextureFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }
}

/// GL pixel format.
#[must_use]
pub const fn texture_format(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Red => glow::RED,
        TextureFormat::Rg => glow::RG,
        TextureFormat::Rgb => glow::RGB,
        TextureFormat::Bgr => glow::BGR,
        TextureFormat::Rgba => glow::RGBA,
        TextureFormat::Bgra => glow::BGRA,
        TextureFormat::DepthComponent => glow::DEPTH_COMPONENT,
    }
}

/// GL sized internal format. BGR(A) data is stored as RGB(A).
#[must_use]
pub const fn internal_format(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Red => glow::R8,
        TextureFormat::Rg => glow::RG8,
        TextureFormat::Rgb | TextureFormat::Bgr => glow::RGB8,
        TextureFormat::Rgba | TextureFormat::Bgra => glow::RGBA8,
        TextureFormat::DepthComponent => glow::DEPTH_COMPONENT24,
    }
}

/// GL component type.
#[must_use]
pub const fn element_type(ty: ElementType) -> u32 {
    match ty {
        ElementType::Byte => glow::BYTE,
        ElementType::UnsignedByte => glow::UNSIGNED_BYTE,
        ElementType::Short => glow::SHORT,
        ElementType::UnsignedShort => glow::UNSIGNED_SHORT,
        ElementType::Int => glow::INT,
        ElementType::UnsignedInt => glow::UNSIGNED_INT,
        ElementType::HalfFloat => glow::HALF_FLOAT,
        ElementType::Float => glow::FLOAT,
        ElementType::Double => glow::DOUBLE,
    }
}

/// GL buffer binding target.
#[must_use]
pub const fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::ArrayBuffer => glow::ARRAY_BUFFER,
        BufferTarget::ElementArrayBuffer => glow::ELEMENT_ARRAY_BUFFER,
        BufferTarget::UniformBuffer => glow::UNIFORM_BUFFER,
        BufferTarget::PixelPackBuffer => glow::PIXEL_PACK_BUFFER,
        BufferTarget::PixelUnpackBuffer => glow::PIXEL_UNPACK_BUFFER,
    }
}

/// GL buffer usage hint.
#[must_use]
pub const fn buffer_usage(usage: BufferDataUsage) -> u32 {
    match usage {
        BufferDataUsage::StreamDraw => glow::STREAM_DRAW,
        BufferDataUsage::StaticDraw => glow::STATIC_DRAW,
        BufferDataUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferDataUsage::StreamRead => glow::STREAM_READ,
        BufferDataUsage::StaticRead => glow::STATIC_READ,
        BufferDataUsage::DynamicRead => glow::DYNAMIC_READ,
    }
}

/// GL shader stage.
#[must_use]
pub const fn shader_type(kind: ShaderType) -> u32 {
    match kind {
        ShaderType::Vertex => glow::VERTEX_SHADER,
        ShaderType::Fragment => glow::FRAGMENT_SHADER,
        ShaderType::Geometry => glow::GEOMETRY_SHADER,
        ShaderType::TessControl => glow::TESS_CONTROL_SHADER,
        ShaderType::TessEvaluation => glow::TESS_EVALUATION_SHADER,
        ShaderType::Compute => glow::COMPUTE_SHADER,
    }
}

/// Symbolic name of a `glGetError` code.
#[must_use]
pub const fn error_name(code: u32) -> &'static str {
    match code {
        glow::NO_ERROR => "GL_NO_ERROR",
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "GL_UNKNOWN_ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembled_modes_draw_as_triangles() {
        assert_eq!(render_mode(RenderMode::Quads), glow::TRIANGLES);
        assert_eq!(render_mode(RenderMode::QuadStrip), glow::TRIANGLES);
        assert_eq!(render_mode(RenderMode::Polygon), glow::TRIANGLE_FAN);
        assert_eq!(render_mode(RenderMode::LineLoop), glow::LINE_LOOP);
    }

    #[test]
    fn test_emulated_capabilities_have_no_gl_enum() {
        assert_eq!(capability(Capability::Blending), Some(glow::BLEND));
        assert_eq!(capability(Capability::Lighting), None);
        assert_eq!(capability(Capability::TextureGenS), None);
    }

    #[test]
    fn test_error_names() {
        assert_eq!(error_name(glow::INVALID_OPERATION), "GL_INVALID_OPERATION");
        assert_eq!(error_name(0xdead), "GL_UNKNOWN_ERROR");
    }

    #[test]
    fn test_wrap_and_filter_values_fit_f32() {
        // Wrap and filter enums travel through the f32 texture parameter path.
        for wrap in [
            TextureWrap::Repeat,
            TextureWrap::MirroredRepeat,
            TextureWrap::ClampToEdge,
            TextureWrap::ClampToBorder,
        ] {
            let value = texture_wrap(wrap);
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let round_trip = (value as f32) as u32;
            assert_eq!(round_trip, value);
        }
    }

    #[test]
    fn test_internal_format_for_glyphs() {
        assert_eq!(internal_format(TextureFormat::Red), glow::R8);
        assert_eq!(texture_format(TextureFormat::Red), glow::RED);
    }
}
