//! Vector and matrix math for the canvas transform stack.
//!
//! Matrices are column-major, matching what the shaders expect.

use serde::{Deserialize, Serialize};

use crate::{RenderError, RenderResult};

/// A 3D vector for positions and directions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Unit vector pointing up (Y+).
    #[must_use]
    pub const fn up() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// Calculate the length (magnitude) of the vector.
    #[must_use]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Normalize the vector to unit length.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len, self.z / len)
        } else {
            *self
        }
    }

    /// Cross product of two vectors.
    #[must_use]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Subtract two vectors.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Components as an array.
    #[must_use]
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// A 2D vector, used for glyph bearings and text positions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
}

impl Vec2 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 4x4 matrix for transformations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    /// Matrix data in column-major order.
    pub data: [f32; 16],
}

impl Mat4 {
    /// Create identity matrix.
    #[must_use]
    pub fn identity() -> Self {
        #[rustfmt::skip]
        let data = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { data }
    }

    /// Create a matrix from 16 column-major values.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice does not hold exactly 16 values.
    pub fn from_slice(values: &[f32]) -> RenderResult<Self> {
        let data: [f32; 16] = values.try_into().map_err(|_| {
            RenderError::InvalidArgument(format!(
                "matrix needs 16 values, got {}",
                values.len()
            ))
        })?;
        Ok(Self { data })
    }

    /// Create a translation matrix.
    #[must_use]
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::identity();
        m.data[12] = x;
        m.data[13] = y;
        m.data[14] = z;
        m
    }

    /// Create a scale matrix.
    #[must_use]
    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::identity();
        m.data[0] = x;
        m.data[5] = y;
        m.data[10] = z;
        m
    }

    /// Create a look-at view matrix.
    #[must_use]
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let f = target.sub(&eye).normalize();
        let s = f.cross(&up).normalize();
        let u = s.cross(&f);

        #[rustfmt::skip]
        let data = [
            s.x,  u.x,  -f.x, 0.0,
            s.y,  u.y,  -f.y, 0.0,
            s.z,  u.z,  -f.z, 0.0,
            -s.dot(&eye), -u.dot(&eye), f.dot(&eye), 1.0,
        ];
        Self { data }
    }

    /// Create a perspective projection matrix.
    #[must_use]
    pub fn perspective(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y_radians / 2.0).tan();
        let nf = 1.0 / (near - far);

        #[rustfmt::skip]
        let data = [
            f / aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, (far + near) * nf, -1.0,
            0.0, 0.0, 2.0 * far * near * nf, 0.0,
        ];
        Self { data }
    }

    /// Create an orthographic projection matrix.
    #[must_use]
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rl = 1.0 / (right - left);
        let tb = 1.0 / (top - bottom);
        let fn_ = 1.0 / (far - near);

        #[rustfmt::skip]
        let data = [
            2.0 * rl, 0.0, 0.0, 0.0,
            0.0, 2.0 * tb, 0.0, 0.0,
            0.0, 0.0, -2.0 * fn_, 0.0,
            -(right + left) * rl, -(top + bottom) * tb, -(far + near) * fn_, 1.0,
        ];
        Self { data }
    }

    /// Multiply two matrices.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        let mut result = [0.0f32; 16];

        for row in 0..4 {
            for col in 0..4 {
                for k in 0..4 {
                    result[col * 4 + row] += self.data[k * 4 + row] * other.data[col * 4 + k];
                }
            }
        }

        Self { data: result }
    }

    /// Transform a point (w = 1).
    #[must_use]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let d = &self.data;
        Vec3::new(
            d[0] * p.x + d[4] * p.y + d[8] * p.z + d[12],
            d[1] * p.x + d[5] * p.y + d[9] * p.z + d[13],
            d[2] * p.x + d[6] * p.y + d[10] * p.z + d[14],
        )
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

/// A model-view matrix stack.
///
/// Always holds at least one matrix; popping the last one fails.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    stack: Vec<Mat4>,
}

impl MatrixStack {
    /// Create a stack holding the identity matrix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![Mat4::identity()],
        }
    }

    /// The current (top) matrix.
    #[must_use]
    pub fn top(&self) -> &Mat4 {
        // The stack is never empty.
        &self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Mat4 {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Duplicate the current matrix.
    pub fn push(&mut self) {
        let top = *self.top();
        self.stack.push(top);
    }

    /// Discard the current matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if only the base matrix remains.
    pub fn pop(&mut self) -> RenderResult<()> {
        if self.stack.len() <= 1 {
            return Err(RenderError::InvalidState(
                "matrix stack underflow".to_string(),
            ));
        }
        self.stack.pop();
        Ok(())
    }

    /// Post-multiply the current matrix.
    pub fn multiply(&mut self, m: &Mat4) {
        let top = self.top_mut();
        *top = top.mul(m);
    }

    /// Replace the current matrix.
    pub fn load(&mut self, m: Mat4) {
        *self.top_mut() = m;
    }

    /// Number of matrices on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_translation_moves_point() {
        let m = Mat4::translation(1.0, 2.0, 3.0);
        let p = m.transform_point(Vec3::new(1.0, 1.0, 1.0));
        assert!(approx_eq(p.x, 2.0));
        assert!(approx_eq(p.y, 3.0));
        assert!(approx_eq(p.z, 4.0));
    }

    #[test]
    fn test_mul_applies_right_first() {
        let t = Mat4::translation(10.0, 0.0, 0.0);
        let s = Mat4::scale(2.0, 2.0, 2.0);
        let p = t.mul(&s).transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert!(approx_eq(p.x, 12.0));
    }

    #[test]
    fn test_orthographic_maps_corners() {
        let m = Mat4::orthographic(0.0, 800.0, 0.0, 600.0, -1.0, 1.0);
        let lo = m.transform_point(Vec3::new(0.0, 0.0, 0.0));
        let hi = m.transform_point(Vec3::new(800.0, 600.0, 0.0));
        assert!(approx_eq(lo.x, -1.0) && approx_eq(lo.y, -1.0));
        assert!(approx_eq(hi.x, 1.0) && approx_eq(hi.y, 1.0));
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(Mat4::from_slice(&[0.0; 15]).is_err());
        assert!(Mat4::from_slice(&Mat4::identity().data).is_ok());
    }

    #[test]
    fn test_stack_push_pop() {
        let mut stack = MatrixStack::new();
        stack.push();
        stack.multiply(&Mat4::translation(1.0, 0.0, 0.0));
        assert_eq!(stack.depth(), 2);
        assert!(approx_eq(stack.top().data[12], 1.0));

        stack.pop().unwrap();
        assert_eq!(*stack.top(), Mat4::identity());
    }

    #[test]
    fn test_stack_underflow() {
        let mut stack = MatrixStack::new();
        assert!(matches!(stack.pop(), Err(RenderError::InvalidState(_))));
    }
}
