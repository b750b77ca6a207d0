//! Integration tests for canvas texture creation.

use rendition_core::backend::{Command, CommandLog, RecordingBackend};
use rendition_core::image::{create_solid_color, ImageFormat, TextureData};
use rendition_core::resource::TextureId;
use rendition_core::types::{TextureFlip, TextureRotation, TextureTarget};
use rendition_core::{Canvas, CanvasConfig, Engine, RenderError};

fn canvas() -> (Canvas, CommandLog) {
    let backend = RecordingBackend::new();
    let log = backend.log();
    (
        Engine::new(Box::new(backend)).create_canvas(CanvasConfig::default()),
        log,
    )
}

#[test]
fn test_file_texture_is_cached_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.png");
    image::RgbaImage::new(4, 2).save(&path).unwrap();
    let (mut canvas, log) = canvas();

    let first = canvas.create_texture_from_file(&path).unwrap();
    let second = canvas
        .create_texture_from_file_with(&path, TextureRotation::Rotate90, TextureFlip::Vertical)
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.rotation, TextureRotation::Rotate90);
    // The cached pixels are not re-uploaded.
    assert_eq!(log.count(|c| matches!(c, Command::TextureImage { .. })), 1);
    assert_eq!((second.width, second.height), (4, 2));
}

#[test]
fn test_rotation_applies_on_first_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.png");
    image::RgbaImage::new(4, 2).save(&path).unwrap();
    let (mut canvas, _) = canvas();

    let texture = canvas
        .create_texture_from_file_with(&path, TextureRotation::Rotate270, TextureFlip::None)
        .unwrap();

    assert_eq!((texture.width, texture.height), (2, 4));
}

#[test]
fn test_unreadable_file_allocates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not an image").unwrap();
    let (mut canvas, log) = canvas();

    assert!(matches!(
        canvas.create_texture_from_file(&path),
        Err(RenderError::Resource(_))
    ));
    assert_eq!(log.count(|c| matches!(c, Command::GenerateTexture(_))), 0);
}

#[test]
fn test_upload_restores_bound_texture() {
    let (mut canvas, log) = canvas();
    let first = canvas
        .create_texture_from_image(&create_solid_color(1, 1, 0, 0, 0, 255).unwrap())
        .unwrap();
    canvas.set_texture(Some(&first)).unwrap();
    canvas
        .create_texture_from_image(&create_solid_color(1, 1, 9, 9, 9, 255).unwrap())
        .unwrap();

    assert_eq!(
        log.commands().last(),
        Some(&Command::BindTexture(TextureTarget::Texture2D, Some(first.id)))
    );
    assert_eq!(canvas.texture().map(|t| t.id), Some(first.id));
}

#[test]
fn test_failed_upload_deletes_texture_and_restores_binding() {
    let (mut canvas, log) = canvas();
    let bound = canvas
        .create_texture_from_image(&create_solid_color(1, 1, 0, 0, 0, 255).unwrap())
        .unwrap();
    canvas.set_texture(Some(&bound)).unwrap();
    let short = TextureData {
        width: 2,
        height: 2,
        data: vec![0; 3],
        format: ImageFormat::Unknown,
    };

    assert!(matches!(
        canvas.create_texture_from_image(&short),
        Err(RenderError::InvalidArgument(_))
    ));

    let commands = log.commands();
    let failed = commands.iter().rev().find_map(|c| match c {
        Command::GenerateTexture(id) => Some(*id),
        _ => None,
    });
    let failed = failed.unwrap();
    assert_ne!(failed, bound.id);
    assert!(commands.contains(&Command::DeleteTexture(failed)));
    assert_eq!(
        commands.last(),
        Some(&Command::BindTexture(TextureTarget::Texture2D, Some(bound.id)))
    );
    assert_eq!(canvas.textures().len(), 1);
    assert_eq!(canvas.texture().map(|t| t.id), Some(bound.id));
}

#[test]
fn test_texture_by_unknown_id_is_default_2d() {
    let (canvas, _) = canvas();
    let texture = canvas.texture_by_id(TextureId(42));
    assert_eq!(texture.id, TextureId(42));
    assert_eq!(texture.target, TextureTarget::Texture2D);
    assert!(texture.file_name.is_none());
}
