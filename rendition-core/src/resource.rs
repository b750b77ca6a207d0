//! Opaque handles for backend resources.
//!
//! Handles are plain ids allocated by the backend. Operations on them go
//! through [`Engine`](crate::Engine), which owns the backend.

use serde::{Deserialize, Serialize};

use crate::types::{ElementType, ShaderType};

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

resource_id!(
    /// Identifier of a compiled shader stage.
    ShaderId
);
resource_id!(
    /// Identifier of a shader program.
    ProgramId
);
resource_id!(
    /// Identifier of a vertex array object.
    VertexArrayId
);
resource_id!(
    /// Identifier of a buffer object.
    BufferId
);
resource_id!(
    /// Identifier of a texture object.
    TextureId
);

/// A shader stage created by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shader {
    /// Backend id.
    pub id: ShaderId,
    /// Stage type.
    pub kind: ShaderType,
    /// Whether the stage compiled successfully.
    pub compiled: bool,
}

/// A shader program and the stages attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    /// Backend id.
    pub id: ProgramId,
    /// Attached stages.
    pub shaders: Vec<Shader>,
    /// Whether the program has been linked since the last attach.
    pub linked: bool,
}

impl ShaderProgram {
    pub(crate) fn new(id: ProgramId) -> Self {
        Self {
            id,
            shaders: Vec::new(),
            linked: false,
        }
    }
}

/// A vertex array object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexArray {
    /// Backend id.
    pub id: VertexArrayId,
}

/// A buffer object and the target it was last bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderBuffer {
    /// Backend id.
    pub id: BufferId,
    /// Target of the most recent bind.
    pub target: Option<crate::types::BufferTarget>,
}

/// Layout of one generic vertex attribute inside the bound array buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute index.
    pub index: u32,
    /// Components per vertex (1 to 4).
    pub size: i32,
    /// Component type.
    pub element_type: ElementType,
    /// Whether fixed-point values are normalized.
    pub normalized: bool,
    /// Byte stride between consecutive vertices (0 = tightly packed).
    pub stride: i32,
    /// Byte offset of the first component.
    pub offset: i32,
}

/// Rust component types that map onto a vertex [`ElementType`].
pub trait VertexElement: bytemuck::Pod {
    /// Matching element type.
    const ELEMENT_TYPE: ElementType;
}

macro_rules! vertex_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl VertexElement for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;
        })*
    };
}

vertex_element!(
    i8 => Byte,
    u8 => UnsignedByte,
    i16 => Short,
    u16 => UnsignedShort,
    i32 => Int,
    u32 => UnsignedInt,
    f32 => Float,
    f64 => Double,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_element_types() {
        assert_eq!(<f32 as VertexElement>::ELEMENT_TYPE, ElementType::Float);
        assert_eq!(<u16 as VertexElement>::ELEMENT_TYPE, ElementType::UnsignedShort);
        assert_eq!(<i8 as VertexElement>::ELEMENT_TYPE, ElementType::Byte);
        assert_eq!(<f64 as VertexElement>::ELEMENT_TYPE, ElementType::Double);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(TextureId(7).to_string(), "7");
    }
}
