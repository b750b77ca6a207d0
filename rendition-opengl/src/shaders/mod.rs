//! Shader used to draw immediate-mode batches.

/// Vertex stage.
pub const IMMEDIATE_VERTEX: &str = include_str!("immediate.vert");
/// Fragment stage.
pub const IMMEDIATE_FRAGMENT: &str = include_str!("immediate.frag");

/// Attribute location of the vertex position.
pub const POSITION_LOCATION: u32 = 0;
/// Attribute location of the texture coordinate.
pub const TEX_COORD_LOCATION: u32 = 1;
/// Attribute location of the normal.
pub const NORMAL_LOCATION: u32 = 2;
/// Attribute location of the color.
pub const COLOR_LOCATION: u32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_locations_match_source() {
        assert!(IMMEDIATE_VERTEX.contains("location = 0) in vec4 a_position"));
        assert!(IMMEDIATE_VERTEX.contains("location = 3) in vec4 a_color"));
        assert_eq!(COLOR_LOCATION, 3);
    }

    #[test]
    fn test_sources_have_no_version() {
        assert!(!IMMEDIATE_VERTEX.contains("#version"));
        assert!(!IMMEDIATE_FRAGMENT.contains("#version"));
    }
}
