//! GUI context lifecycle: font atlas, display size and the UI declared every frame.

use crate::config::AppConfig;
use crate::core::FrameInput;
use crate::error::InitError;

use imgui::{DrawData, FontSource};
use std::time::{Duration, Instant};
use winit::dpi::PhysicalSize;

/// Smallest delta time handed to the GUI, which rejects zero.
const MIN_DELTA_TIME: f32 = 1.0 / 10_000.0;

/// The GUI context and the static content it displays.
pub struct Gui {
    context: imgui::Context,
    label: String,
    font_scale: f32,
    last_frame: Instant,
}

impl Gui {
    /// Creates a GUI context with the default embedded font and no `.ini` persistence.
    pub fn new(config: &AppConfig) -> Self {
        let mut context = imgui::Context::create();
        context.set_ini_filename(None);
        context
            .fonts()
            .add_font(&[FontSource::DefaultFontData { config: None }]);

        Gui {
            context,
            label: config.label.clone(),
            font_scale: config.font_scale,
            last_frame: Instant::now(),
        }
    }

    /// The underlying context, for renderer setup.
    pub fn context_mut(&mut self) -> &mut imgui::Context {
        &mut self.context
    }

    /// Sets the display size to the framebuffer size in pixels.
    ///
    /// Mouse positions are scaled to pixels before they reach the GUI, so the
    /// framebuffer scale stays at one.
    pub fn set_display_size(&mut self, framebuffer: PhysicalSize<u32>) {
        let io = self.context.io_mut();
        io.display_size = [framebuffer.width as f32, framebuffer.height as f32];
        io.display_framebuffer_scale = [1.0, 1.0];
    }

    /// Display size in whole pixels, as used for the viewport.
    pub fn display_size(&self) -> [i32; 2] {
        let [w, h] = self.context.io().display_size;
        [w as i32, h as i32]
    }

    /// Forwards `input`, declares this frame's UI and returns the draw data to render.
    pub fn frame(&mut self, input: &FrameInput, now: Instant) -> &DrawData {
        let io = self.context.io_mut();
        io.delta_time = frame_delta(now.saturating_duration_since(self.last_frame));
        self.last_frame = now;
        input.apply(io);

        let ui = self.context.new_frame();
        ui.text(&self.label);
        ui.set_window_font_scale(self.font_scale);

        self.context.render()
    }
}

/// Seconds elapsed since the previous frame, never zero.
pub(crate) fn frame_delta(elapsed: Duration) -> f32 {
    elapsed.as_secs_f32().max(MIN_DELTA_TIME)
}

/// Checks that a rasterized RGBA32 font atlas is non-empty and fully populated.
pub(crate) fn validate_font_atlas(width: u32, height: u32, len: usize) -> Result<(), InitError> {
    if width == 0 || height == 0 {
        return Err(InitError::FontAtlas(format!("empty atlas ({width}x{height})")));
    }
    let expected = width as usize * height as usize * 4;
    if len != expected {
        return Err(InitError::FontAtlas(format!(
            "expected {expected} bytes for {width}x{height} RGBA, got {len}"
        )));
    }
    Ok(())
}
