//! Immediate-mode vertex batches.
//!
//! Vertices emitted between `begin` and `end` are collected here with the
//! attributes that were current when each vertex was emitted. Primitive
//! types that core profiles dropped are rewritten as triangles.

use bytemuck::{Pod, Zeroable};
use rendition_core::types::RenderMode;

/// One latched vertex as uploaded to the streaming buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ImmediateVertex {
    /// Homogeneous position.
    pub position: [f32; 4],
    /// Texture coordinate (s, t, r, q).
    pub tex_coord: [f32; 4],
    /// Normal.
    pub normal: [f32; 3],
    /// RGBA color.
    pub color: [f32; 4],
}

impl ImmediateVertex {
    /// Floats per vertex.
    pub const FLOATS: usize = 15;
    /// Bytes between consecutive vertices.
    pub const STRIDE: i32 = 60;
    /// Byte offset of `tex_coord`.
    pub const TEX_COORD_OFFSET: i32 = 16;
    /// Byte offset of `normal`.
    pub const NORMAL_OFFSET: i32 = 32;
    /// Byte offset of `color`.
    pub const COLOR_OFFSET: i32 = 44;
}

/// Attributes that are latched into the next vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentAttributes {
    /// Current texture coordinate.
    pub tex_coord: [f32; 4],
    /// Current normal.
    pub normal: [f32; 3],
    /// Current color.
    pub color: [f32; 4],
}

impl Default for CurrentAttributes {
    fn default() -> Self {
        Self {
            tex_coord: [0.0, 0.0, 0.0, 1.0],
            normal: [0.0, 0.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// An open `begin`/`end` block.
#[derive(Debug, Clone)]
pub struct Batch {
    mode: RenderMode,
    vertices: Vec<ImmediateVertex>,
}

impl Batch {
    /// Start a batch for `mode`.
    #[must_use]
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            vertices: Vec::new(),
        }
    }

    /// Primitive mode the batch was opened with.
    #[must_use]
    pub const fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Latch a vertex with the current attributes.
    pub fn push(&mut self, position: [f32; 4], current: &CurrentAttributes) {
        self.vertices.push(ImmediateVertex {
            position,
            tex_coord: current.tex_coord,
            normal: current.normal,
            color: current.color,
        });
    }

    /// Number of vertices emitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether no vertex has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Close the batch, returning vertices in a GL-drawable order.
    #[must_use]
    pub fn finish(self) -> Vec<ImmediateVertex> {
        assemble(self.mode, &self.vertices)
    }
}

/// Rewrite vertices so they can be drawn with
/// [`convert::render_mode(mode)`](crate::convert::render_mode).
///
/// Quads become two triangles each and quad strips become triangle pairs;
/// trailing vertices that do not complete a primitive are dropped. Polygons
/// are convex by contract and draw as a fan unchanged. All other modes pass
/// through.
#[must_use]
pub fn assemble<V: Copy>(mode: RenderMode, vertices: &[V]) -> Vec<V> {
    match mode {
        RenderMode::Quads => vertices
            .chunks_exact(4)
            .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
            .collect(),
        RenderMode::QuadStrip => {
            if vertices.len() < 4 {
                return Vec::new();
            }
            (0..=vertices.len() - 4)
                .step_by(2)
                .flat_map(|i| {
                    let (a, b) = (vertices[i], vertices[i + 1]);
                    let (c, d) = (vertices[i + 3], vertices[i + 2]);
                    [a, b, c, a, c, d]
                })
                .collect()
        }
        _ => vertices.to_vec(),
    }
}
