//! Texture handles and the per-canvas texture registry.
//!
//! The registry indexes created textures by id and by source file name so
//! that a file is decoded and uploaded at most once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::resource::TextureId;
use crate::types::{TextureFilter, TextureFlip, TextureRotation, TextureTarget, TextureWrap};

/// A texture known to a canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Backend id.
    pub id: TextureId,
    /// Binding target.
    pub target: TextureTarget,
    /// Source file, if the texture was loaded from disk.
    pub file_name: Option<PathBuf>,
    /// Minification filter.
    pub min_filter: TextureFilter,
    /// Magnification filter.
    pub mag_filter: TextureFilter,
    /// Wrap along S.
    pub wrap_s: TextureWrap,
    /// Wrap along T.
    pub wrap_t: TextureWrap,
    /// Rotation applied at upload.
    pub rotation: TextureRotation,
    /// Flip applied at upload.
    pub flip: TextureFlip,
    /// Width in texels (0 if no image was uploaded).
    pub width: u32,
    /// Height in texels (0 if no image was uploaded).
    pub height: u32,
}

impl Texture {
    /// A 2D texture handle with default sampling state.
    #[must_use]
    pub fn new(id: TextureId) -> Self {
        Self {
            id,
            target: TextureTarget::Texture2D,
            file_name: None,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            rotation: TextureRotation::None,
            flip: TextureFlip::None,
            width: 0,
            height: 0,
        }
    }
}

/// Lookup statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// File lookups answered from the registry.
    pub hits: u64,
    /// File lookups that required a load.
    pub misses: u64,
}

/// Textures by id and by file name.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    by_id: HashMap<TextureId, Texture>,
    by_file_name: HashMap<PathBuf, TextureId>,
    stats: RegistryStats,
}

impl TextureRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture. Replaces any previous entry with the same id.
    pub fn insert(&mut self, texture: Texture) {
        if let Some(file) = &texture.file_name {
            self.by_file_name.entry(file.clone()).or_insert(texture.id);
        }
        self.by_id.insert(texture.id, texture);
    }

    /// Look up by id.
    #[must_use]
    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.by_id.get(&id)
    }

    /// Look up by source file, counting hits and misses.
    pub fn get_by_file_mut(&mut self, file: &Path) -> Option<&mut Texture> {
        match self.by_file_name.get(file) {
            Some(id) => {
                self.stats.hits += 1;
                self.by_id.get_mut(id)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Whether a file has already been loaded.
    #[must_use]
    pub fn contains_file(&self, file: &Path) -> bool {
        self.by_file_name.contains_key(file)
    }

    /// Remove a texture by id.
    pub fn remove(&mut self, id: TextureId) -> Option<Texture> {
        let texture = self.by_id.remove(&id)?;
        self.by_file_name.retain(|_, v| *v != id);
        Some(texture)
    }

    /// Remove every entry and return the ids that were registered.
    pub fn drain_ids(&mut self) -> Vec<TextureId> {
        self.by_file_name.clear();
        self.by_id.drain().map(|(id, _)| id).collect()
    }

    /// Number of registered textures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Lookup statistics.
    #[must_use]
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_texture(id: u32, file: &str) -> Texture {
        Texture {
            file_name: Some(PathBuf::from(file)),
            ..Texture::new(TextureId(id))
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = TextureRegistry::new();
        registry.insert(file_texture(1, "a.png"));

        assert!(registry.contains_file(Path::new("a.png")));
        assert_eq!(registry.get(TextureId(1)).unwrap().id, TextureId(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_file_lookup_stats() {
        let mut registry = TextureRegistry::new();
        registry.insert(file_texture(1, "a.png"));

        assert!(registry.get_by_file_mut(Path::new("a.png")).is_some());
        assert!(registry.get_by_file_mut(Path::new("b.png")).is_none());
        assert!(registry.get_by_file_mut(Path::new("a.png")).is_some());

        assert_eq!(registry.stats().hits, 2);
        assert_eq!(registry.stats().misses, 1);
    }

    #[test]
    fn test_remove_clears_file_index() {
        let mut registry = TextureRegistry::new();
        registry.insert(file_texture(1, "a.png"));

        assert!(registry.remove(TextureId(1)).is_some());
        assert!(!registry.contains_file(Path::new("a.png")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_first_file_registration_wins() {
        let mut registry = TextureRegistry::new();
        registry.insert(file_texture(1, "a.png"));
        registry.insert(file_texture(2, "a.png"));

        let hit = registry.get_by_file_mut(Path::new("a.png")).unwrap();
        assert_eq!(hit.id, TextureId(1));
    }

    #[test]
    fn test_drain_ids() {
        let mut registry = TextureRegistry::new();
        registry.insert(file_texture(1, "a.png"));
        registry.insert(Texture::new(TextureId(2)));

        let mut ids = registry.drain_ids();
        ids.sort();
        assert_eq!(ids, vec![TextureId(1), TextureId(2)]);
        assert!(registry.is_empty());
    }
}
