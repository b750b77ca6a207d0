//! Viewer application using winit 0.30 `ApplicationHandler` and glutin.

use std::ffi::CString;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context as _, Result};
use glutin::{
    config::{ConfigTemplateBuilder, GlConfig},
    context::{
        ContextApi, ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext, Version,
    },
    display::{GetGlDisplay, GlDisplay},
    prelude::GlSurface,
    surface::{Surface, SurfaceAttributesBuilder, WindowSurface},
};
use glutin_winit::DisplayBuilder;
use rendition_core::{Canvas, Color, Engine, FontdueRasterizer, Mat4, Model, Vec2, Vec3};
use rendition_opengl::GlBackend;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    raw_window_handle::HasWindowHandle,
    window::{Window, WindowId},
};

use crate::{scene, ViewerConfig};

const BACKGROUND: Color = Color::from_rgba_f64(0.1, 0.12, 0.18, 1.0);
const CAMERA_DISTANCE: f32 = 5.0;
const CAMERA_HEIGHT: f32 = 2.0;
const SPIN_SPEED: f32 = 0.6;
const TEXT_SCALE: f64 = 0.75;
const TEXT_MARGIN: f64 = 16.0;

/// Window, surface and context, created together in `resumed`.
struct GlWindow {
    window: Arc<Window>,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
}

fn non_zero(value: u32) -> Result<NonZeroU32> {
    NonZeroU32::new(value).ok_or_else(|| anyhow!("window has a zero dimension"))
}

/// Viewer application.
///
/// Owns the window, the GL context and the canvas drawing into it.
pub struct ViewerApp {
    config: ViewerConfig,
    model: Model,
    gl_window: Option<GlWindow>,
    canvas: Option<Canvas>,
    started: Instant,
}

impl ViewerApp {
    /// Create the application, loading the configured model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file cannot be read or parsed.
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let model = match &config.model {
            Some(path) => Model::load(path)
                .with_context(|| format!("failed to load model {}", path.display()))?,
            None => {
                tracing::info!("No model given, showing the built-in cube");
                scene::demo_cube(2.0)
            }
        };

        Ok(Self {
            config,
            model,
            gl_window: None,
            canvas: None,
            started: Instant::now(),
        })
    }

    /// Create the window, the GL context and the canvas.
    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes))
            .build(event_loop, ConfigTemplateBuilder::new(), |configs| {
                configs
                    .reduce(|best, config| {
                        if config.num_samples() > best.num_samples() {
                            config
                        } else {
                            best
                        }
                    })
                    // glutin only calls this with a non-empty set of configs
                    .expect("no GL configs offered")
            })
            .map_err(|e| anyhow!("failed to create window: {e}"))?;
        let window = Arc::new(window.ok_or_else(|| anyhow!("display builder returned no window"))?);
        let size = window.inner_size();

        let gl_display = gl_config.display();
        let raw_window_handle = window.window_handle()?.as_raw();
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_window_handle));
        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes)? };

        let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window_handle,
            non_zero(size.width)?,
            non_zero(size.height)?,
        );
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes)? };
        let context = not_current.make_current(&surface)?;

        let gl = unsafe {
            glow::Context::from_loader_function(|symbol| {
                CString::new(symbol)
                    .map_or(std::ptr::null(), |symbol| gl_display.get_proc_address(&symbol))
            })
        };

        let backend = GlBackend::new(Arc::new(gl), self.config.backend.clone())?;
        let mut canvas = Engine::new(Box::new(backend)).create_canvas(self.config.canvas.clone());
        canvas.resize(size.width, size.height)?;

        if let Some(path) = &self.config.font {
            let rasterizer = FontdueRasterizer::from_file(path)
                .with_context(|| format!("failed to load font {}", path.display()))?;
            canvas.set_font_rasterizer(Box::new(rasterizer));
            canvas.initialize_character_glyphs(&self.config.text)?;
        } else {
            tracing::warn!("No font given, overlay text is disabled");
        }

        tracing::info!(
            "Window created - {}x{} physical",
            size.width,
            size.height
        );

        self.canvas = Some(canvas);
        self.gl_window = Some(GlWindow {
            window,
            surface,
            context,
        });
        Ok(())
    }

    /// Handle window resize.
    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        let (Some(gl_window), Some(canvas)) = (&self.gl_window, &mut self.canvas) else {
            return;
        };
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return;
        };
        gl_window.surface.resize(&gl_window.context, width, height);
        if let Err(e) = canvas.resize(size.width, size.height) {
            tracing::error!("Failed to resize canvas: {e}");
        }
    }

    /// Draw one frame and present it.
    #[allow(clippy::cast_precision_loss)]
    fn render(&mut self) -> Result<()> {
        let (Some(gl_window), Some(canvas)) = (&self.gl_window, &mut self.canvas) else {
            return Ok(());
        };

        let (width, height) = canvas.viewport();
        let aspect = width as f32 / height.max(1) as f32;
        let angle = if self.config.spin {
            self.started.elapsed().as_secs_f32() * SPIN_SPEED
        } else {
            0.0
        };
        let eye = Vec3::new(
            CAMERA_DISTANCE * angle.sin(),
            CAMERA_HEIGHT,
            CAMERA_DISTANCE * angle.cos(),
        );

        canvas.clear(BACKGROUND)?;
        canvas.set_projection(Mat4::perspective(45f32.to_radians(), aspect, 0.1, 100.0))?;
        canvas.load_matrix(Mat4::look_at(eye, Vec3::zero(), Vec3::up()))?;

        canvas.enable_depth_test(true)?;
        canvas.enable_culling(true)?;
        canvas.draw_model(&mut self.model)?;
        canvas.enable_culling(false)?;
        canvas.enable_depth_test(false)?;

        if self.config.font.is_some() {
            canvas.enable_blending(true)?;
            canvas.draw_text(
                &self.config.text,
                Vec2::new(TEXT_MARGIN, TEXT_MARGIN),
                Color::WHITE,
                TEXT_SCALE,
            )?;
            canvas.enable_blending(false)?;
        }

        canvas.engine_mut().flush()?;
        gl_window.surface.swap_buffers(&gl_window.context)?;
        gl_window.window.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gl_window.is_some() {
            tracing::debug!("Window already exists, skipping creation");
            return;
        }

        tracing::debug!(
            "Creating window with size {}x{}",
            self.config.width,
            self.config.height
        );
        if let Err(e) = self.init_graphics(event_loop) {
            tracing::error!("Failed to initialize graphics: {e:#}");
            event_loop.exit();
            return;
        }
        if let Some(gl_window) = &self.gl_window {
            gl_window.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                tracing::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                tracing::debug!("Window resized to {}x{}", size.width, size.height);
                self.handle_resize(size);
                if let Some(gl_window) = &self.gl_window {
                    gl_window.window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    tracing::error!("Render error: {e:#}");
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(canvas) = &mut self.canvas {
            if let Err(e) = canvas.release_resources() {
                tracing::warn!("Failed to release canvas resources: {e}");
            }
        }
        self.canvas = None;
        self.gl_window = None;
    }
}
