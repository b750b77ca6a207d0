//! Built-in shader sources.
//!
//! Sources omit the `#version` line; backends prepend the header that matches
//! their context.

use crate::types::ShaderType;

/// Vertex stage of the text program.
pub const TEXT_VERTEX: &str = include_str!("text.vert");
/// Fragment stage of the text program.
pub const TEXT_FRAGMENT: &str = include_str!("text.frag");

/// Resource name of the text vertex shader.
pub const TEXT_VERTEX_NAME: &str = "text.vert";
/// Resource name of the text fragment shader.
pub const TEXT_FRAGMENT_NAME: &str = "text.frag";

const BUILTINS: &[(&str, ShaderType, &str)] = &[
    (TEXT_VERTEX_NAME, ShaderType::Vertex, TEXT_VERTEX),
    (TEXT_FRAGMENT_NAME, ShaderType::Fragment, TEXT_FRAGMENT),
];

/// Look up a built-in shader source by resource name and stage.
#[must_use]
pub fn builtin(name: &str, kind: ShaderType) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|(n, k, _)| *n == name && *k == kind)
        .map(|(_, _, source)| *source)
}

/// Names of all built-in shader sources.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, _, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert!(builtin(TEXT_VERTEX_NAME, ShaderType::Vertex).is_some());
        assert!(builtin(TEXT_VERTEX_NAME, ShaderType::Fragment).is_none());
        assert!(builtin("missing", ShaderType::Vertex).is_none());
    }

    #[test]
    fn test_text_shaders_use_expected_uniforms() {
        assert!(TEXT_VERTEX.contains("projection"));
        assert!(TEXT_FRAGMENT.contains("textColor"));
        assert!(!TEXT_VERTEX.contains("#version"));
    }
}
