//! Integration tests for text rendering.
//!
//! A fixed-metric rasterizer stands in for a font so that glyph placement
//! can be checked against the recorded vertex uploads.

use std::cell::Cell;
use std::rc::Rc;

use rendition_core::backend::{Command, CommandLog, RecordingBackend};
use rendition_core::glyph::{GlyphBearing, GlyphSize};
use rendition_core::resource::ProgramId;
use rendition_core::types::{RenderMode, ShaderType, TextureFormat, UniformValue};
use rendition_core::{
    CanvasConfig, Color, Engine, GlyphRasterizer, Mat4, RasterizedGlyph, RenderError,
    RenderResult, Vec2,
};

/// Every non-space glyph is 2x3 pixels, sits on the baseline with a left
/// bearing of 1, and advances 10 pixels.
struct FixedRasterizer {
    calls: Rc<Cell<usize>>,
}

impl GlyphRasterizer for FixedRasterizer {
    fn rasterize(&mut self, ch: char, _pixel_size: f32) -> RenderResult<RasterizedGlyph> {
        self.calls.set(self.calls.get() + 1);
        if ch == ' ' {
            return Ok(RasterizedGlyph {
                advance: 5 << 6,
                ..RasterizedGlyph::default()
            });
        }
        Ok(RasterizedGlyph {
            size: GlyphSize {
                width: 2,
                height: 3,
            },
            bearing: GlyphBearing { x: 1, y: 3 },
            advance: 10 << 6,
            bitmap: vec![255; 6],
        })
    }
}

fn canvas() -> (rendition_core::Canvas, CommandLog, Rc<Cell<usize>>) {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let calls = Rc::new(Cell::new(0));
    let mut canvas = Engine::new(Box::new(backend)).create_canvas(CanvasConfig::default());
    canvas.set_font_rasterizer(Box::new(FixedRasterizer {
        calls: Rc::clone(&calls),
    }));
    (canvas, log, calls)
}

fn uploaded_quads(log: &CommandLog) -> Vec<Vec<f32>> {
    log.commands()
        .into_iter()
        .filter_map(|c| match c {
            Command::BufferSubData { data, .. } => Some(
                data.chunks_exact(4)
                    .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            _ => None,
        })
        .collect()
}

fn last_program_use(commands: &[Command]) -> Option<Option<ProgramId>> {
    commands.iter().rev().find_map(|c| match c {
        Command::UseProgram(p) => Some(*p),
        _ => None,
    })
}

#[test]
fn test_glyphs_are_rasterized_once() {
    let (mut canvas, log, calls) = canvas();
    canvas.initialize_character_glyphs("abba").unwrap();
    canvas.initialize_character_glyphs("ab").unwrap();

    assert_eq!(calls.get(), 2);
    assert!(canvas.is_character_glyph_initialized('a'));
    assert!(!canvas.is_character_glyph_initialized('c'));
    assert_eq!(
        log.count(|c| matches!(c, Command::TextureImage { format: TextureFormat::Red, .. })),
        2
    );
}

#[test]
fn test_glyph_metrics_are_kept() {
    let (mut canvas, _, _) = canvas();
    canvas.initialize_character_glyphs("x").unwrap();
    let glyph = canvas.character_glyph('x').unwrap();
    assert_eq!(glyph.size.width, 2);
    assert_eq!(glyph.advance_pixels(), 10);
}

#[test]
fn test_pen_advances_per_glyph() {
    let (mut canvas, log, _) = canvas();
    canvas
        .draw_text("aa", Vec2::new(5.0, 7.0), Color::WHITE, 2.0)
        .unwrap();

    let quads = uploaded_quads(&log);
    assert_eq!(quads.len(), 2);
    // First vertex is the top-left corner: (x, y + h).
    assert_eq!(&quads[0][0..2], &[7.0, 13.0]);
    // Second glyph starts 10px * scale further right.
    assert_eq!(&quads[1][0..2], &[27.0, 13.0]);
    // Bottom-right corner of the first glyph.
    assert_eq!(&quads[0][8..10], &[11.0, 7.0]);
}

#[test]
fn test_blank_glyphs_only_advance() {
    let (mut canvas, log, _) = canvas();
    canvas
        .draw_text("a b", Vec2::new(0.0, 0.0), Color::WHITE, 1.0)
        .unwrap();

    let draws = log.count(|c| {
        matches!(
            c,
            Command::DrawArrays {
                mode: RenderMode::Triangles,
                start: 0,
                count: 6
            }
        )
    });
    assert_eq!(draws, 2);

    let quads = uploaded_quads(&log);
    // 'b' starts after 'a' (10) and the space (5), plus the bearing.
    assert_eq!(quads[1][0], 16.0);
}

#[test]
fn test_text_resources_are_created_once() {
    let (mut canvas, log, _) = canvas();
    canvas
        .draw_text("hi", Vec2::new(0.0, 0.0), Color::WHITE, 1.0)
        .unwrap();
    canvas
        .draw_text("hi", Vec2::new(0.0, 20.0), Color::WHITE, 1.0)
        .unwrap();

    assert_eq!(log.count(|c| matches!(c, Command::CreateProgram(_))), 1);
    assert_eq!(log.count(|c| matches!(c, Command::CreateVertexArray(_))), 1);
    assert_eq!(log.count(|c| matches!(c, Command::CreateBuffer(_))), 1);
}

#[test]
fn test_text_color_uniform() {
    let (mut canvas, log, _) = canvas();
    canvas
        .draw_text("a", Vec2::new(0.0, 0.0), Color::from_rgba_f64(1.0, 0.5, 0.25, 1.0), 1.0)
        .unwrap();

    let color = log.commands().into_iter().find_map(|c| match c {
        Command::Uniform { name, value, .. } if name == "textColor" => Some(value),
        _ => None,
    });
    assert_eq!(color, Some(UniformValue::Vec3(1.0, 0.5, 0.25)));
}

#[test]
fn test_previous_program_is_restored() {
    let (mut canvas, log, _) = canvas();
    canvas
        .draw_text("a", Vec2::new(0.0, 0.0), Color::WHITE, 1.0)
        .unwrap();

    let commands = log.commands();
    assert_eq!(last_program_use(&commands), Some(None));
    assert!(canvas.texture().is_none());
}

#[test]
fn test_active_program_is_restored() {
    let (mut canvas, log, _) = canvas();
    let engine = canvas.engine_mut();
    let vertex = engine
        .create_shader_from_string(ShaderType::Vertex, "void main() {}")
        .unwrap();
    let fragment = engine
        .create_shader_from_string(ShaderType::Fragment, "void main() {}")
        .unwrap();
    let mut program = engine.create_shader_program().unwrap();
    engine.attach_shader_to_program(&mut program, vertex).unwrap();
    engine.attach_shader_to_program(&mut program, fragment).unwrap();
    engine.link_program(&mut program).unwrap();
    let id = program.id;
    canvas.set_program(Some(program)).unwrap();

    canvas
        .draw_text("a", Vec2::new(0.0, 0.0), Color::WHITE, 1.0)
        .unwrap();

    assert_eq!(last_program_use(&log.commands()), Some(Some(id)));
    assert_eq!(canvas.program().map(|p| p.id), Some(id));
}

#[test]
fn test_failed_draw_still_restores_state() {
    let (mut canvas, log, _) = canvas();
    canvas
        .draw_text("a", Vec2::new(0.0, 0.0), Color::WHITE, 1.0)
        .unwrap();
    let glyph_texture = canvas.character_glyph('a').unwrap().texture_id;
    canvas
        .engine_mut()
        .delete_textures(&[glyph_texture])
        .unwrap();
    let _ = log.take();

    assert!(matches!(
        canvas.draw_text("a", Vec2::new(0.0, 0.0), Color::WHITE, 1.0),
        Err(RenderError::InvalidArgument(_))
    ));

    let commands = log.commands();
    assert_eq!(log.count(|c| matches!(c, Command::DrawArrays { .. })), 0);
    assert_eq!(last_program_use(&commands), Some(None));
    let last_vertex_array = commands.iter().rev().find_map(|c| match c {
        Command::BindVertexArray(array) => Some(*array),
        _ => None,
    });
    assert_eq!(last_vertex_array, Some(None));
    assert!(canvas.texture().is_none());
}

#[test]
fn test_resize_changes_text_projection() {
    let (mut canvas, log, _) = canvas();
    canvas.resize(200, 100).unwrap();
    canvas
        .draw_text("a", Vec2::new(0.0, 0.0), Color::WHITE, 1.0)
        .unwrap();

    let projection = log.commands().into_iter().rev().find_map(|c| match c {
        Command::UniformMatrix { name, values, .. } if name == "projection" => Some(values),
        _ => None,
    });
    let expected = Mat4::orthographic(0.0, 200.0, 0.0, 100.0, -1.0, 1.0);
    assert_eq!(projection, Some(expected.data.to_vec()));
}

#[test]
fn test_pixel_size_change_rerasterizes() {
    let (mut canvas, log, calls) = canvas();
    canvas.initialize_character_glyphs("ab").unwrap();
    let old_texture = canvas.character_glyph('a').unwrap().texture_id;

    canvas.config_mut().glyph_pixel_size = 24.0;
    canvas.initialize_character_glyphs("a").unwrap();

    assert_eq!(calls.get(), 3);
    assert_eq!(log.count(|c| matches!(c, Command::DeleteTexture(_))), 2);
    assert_ne!(canvas.character_glyph('a').unwrap().texture_id, old_texture);
    assert!(!canvas.is_character_glyph_initialized('b'));
    assert_eq!(canvas.textures().len(), 1);
}

#[test]
fn test_release_deletes_glyph_textures() {
    let (mut canvas, log, _) = canvas();
    canvas
        .draw_text("ab", Vec2::new(0.0, 0.0), Color::WHITE, 1.0)
        .unwrap();
    canvas.release_resources().unwrap();

    assert_eq!(log.count(|c| matches!(c, Command::DeleteTexture(_))), 2);
    assert_eq!(log.count(|c| matches!(c, Command::DeleteProgram(_))), 1);
    assert_eq!(log.count(|c| matches!(c, Command::DeleteShader(_))), 2);
    assert!(!canvas.is_character_glyph_initialized('a'));
    assert!(canvas.textures().is_empty());
}
