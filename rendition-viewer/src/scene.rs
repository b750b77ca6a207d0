//! Built-in demo content.

use rendition_core::math::Vec3;
use rendition_core::model::{Bone, Material, ModelVertex, TexCoord, Triangle};
use rendition_core::{Color, Model};

/// Face normal and the two in-plane axes, ordered so that `u x v = normal`.
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
];

const QUAD_CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

fn cube_vertex(face: &([f32; 3], [f32; 3], [f32; 3]), corner: (f32, f32), half: f32) -> ModelVertex {
    let (n, u, v) = face;
    let (su, sv) = corner;
    let axis = |i: usize| (n[i] + u[i] * su + v[i] * sv) * half;
    ModelVertex {
        position: Vec3::new(axis(0), axis(1), axis(2)),
        normal: Vec3::new(n[0], n[1], n[2]),
        texture: TexCoord {
            u: f64::from(su + 1.0) / 2.0,
            v: f64::from(sv + 1.0) / 2.0,
        },
    }
}

/// A lit cube of edge `size` centred on the origin, with a two-bone
/// skeleton running up its middle.
#[must_use]
pub fn demo_cube(size: f32) -> Model {
    let half = size / 2.0;
    let triangles = CUBE_FACES
        .iter()
        .flat_map(|face| {
            let [a, b, c, d] = QUAD_CORNERS.map(|corner| cube_vertex(face, corner, half));
            [Triangle(a, b, c), Triangle(a, c, d)]
        })
        .collect();

    Model {
        materials: vec![Material {
            diffuse: Color::from_rgba_f64(0.35, 0.55, 0.9, 1.0),
            ambient: Color::from_rgba_f64(0.2, 0.2, 0.3, 1.0),
            specular: Color::from_rgba_f64(0.6, 0.6, 0.6, 1.0),
            shininess: 24.0,
            edge_flag: true,
            triangles,
            ..Material::default()
        }],
        bones: vec![
            Bone {
                name: "base".to_string(),
                position: Vec3::new(0.0, -half, 0.0),
                parent: None,
            },
            Bone {
                name: "top".to_string(),
                position: Vec3::new(0.0, half, 0.0),
                parent: Some(0),
            },
        ],
        ..Model::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_has_six_faces() {
        let model = demo_cube(2.0);
        assert_eq!(model.materials[0].triangles.len(), 12);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_cube_winding_faces_outward() {
        let model = demo_cube(2.0);
        for Triangle(a, b, c) in &model.materials[0].triangles {
            let face_normal = b
                .position
                .sub(&a.position)
                .cross(&c.position.sub(&a.position));
            assert!(face_normal.dot(&a.normal) > 0.0);
        }
    }

    #[test]
    fn test_cube_extent() {
        let model = demo_cube(2.0);
        for Triangle(a, _, _) in &model.materials[0].triangles {
            for value in [a.position.x, a.position.y, a.position.z] {
                assert!((value.abs() - 1.0).abs() < f32::EPSILON);
            }
        }
    }

    #[test]
    fn test_bundled_model_parses() {
        let model = Model::from_json(include_str!("../assets/tetrahedron.json")).unwrap();
        assert_eq!(model.materials.len(), 1);
        assert_eq!(model.materials[0].triangles.len(), 4);
        assert_eq!(model.bones.len(), 2);
    }
}
