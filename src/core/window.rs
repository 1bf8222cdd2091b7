use self::helper::*;
use crate::core::*;
use crate::error::InitError;

use glutin::config::Config;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::GetGlDisplay;
use glutin::surface::{Surface as GLSurface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use std::ffi::CString;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::window::{WindowAttributes, WindowId};

/// A window produced by `winit`.
///
/// The window must have an OpenGL context attached, so it should only be created
/// using [`glutin_winit::DisplayBuilder::build`].
pub(super) type RawWindow = winit::window::Window;

/// A window with a current OpenGL context drawing to its surface.
pub struct Window {
    // Dropped before `raw`, the surface must not outlive its window.
    gl: OpenGL,
    raw: RawWindow,
}

/// The OpenGL context and the surface it draws to.
struct OpenGL {
    surface: GLSurface<WindowSurface>,
    ctx: PossiblyCurrentContext,
}

impl Window {
    /// Attaches an OpenGL context to the window created along with the display config,
    /// makes it current and loads the `gl` function pointers.
    pub(super) fn from_raw(raw: RawWindow, gl_config: &Config, vsync: bool) -> Result<Self, InitError> {
        let gl = OpenGL::new(gl_config, &raw)?;

        gl::load_with(|symbol| match CString::new(symbol) {
            Ok(symbol) => gl_config.display().get_proc_address(&symbol),
            Err(_) => std::ptr::null(),
        });

        let interval = if vsync {
            SwapInterval::Wait(u32_to_nonzero(1))
        } else {
            SwapInterval::DontWait
        };
        if let Err(e) = gl.surface.set_swap_interval(&gl.ctx, interval) {
            log::warn!("Could not set swap interval: {e}");
        }

        Ok(Window { gl, raw })
    }

    /// Returns the window's unique ID.
    pub fn id(&self) -> WindowId {
        self.raw.id()
    }

    /// Size of the drawable area, in pixels.
    pub fn framebuffer_size(&self) -> PhysicalSize<u32> {
        self.raw.inner_size()
    }

    /// Size of the drawable area, in window coordinates.
    pub fn window_size(&self) -> LogicalSize<f64> {
        self.raw.inner_size().to_logical(self.raw.scale_factor())
    }

    /// Ratio between pixels and window coordinates.
    pub fn scale_factor(&self) -> f64 {
        self.raw.scale_factor()
    }

    /// Requests the window to be redrawn.
    pub(super) fn request_redraw(&self) {
        self.raw.request_redraw();
    }

    /// Resizes the window's surface.
    pub(super) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let PhysicalSize { width, height } = new_size;
        self.gl
            .surface
            .resize(&self.gl.ctx, u32_to_nonzero(width), u32_to_nonzero(height));
    }

    /// Makes the window's OpenGL context current. Should be called before
    /// drawing on the window.
    pub(super) fn make_current(&self) -> Result<(), glutin::error::Error> {
        self.gl.ctx.make_current(&self.gl.surface)
    }

    /// Presents the back buffer.
    pub(super) fn swap_buffers(&self) -> Result<(), glutin::error::Error> {
        self.gl.surface.swap_buffers(&self.gl.ctx)
    }

    /// Default attributes for window creation.
    pub(super) fn default_attrs(title: &str, width: u32, height: u32) -> WindowAttributes {
        WindowAttributes::default()
            .with_title(title)
            .with_inner_size(LogicalSize::new(width, height))
    }
}

impl OpenGL {
    fn new(config: &Config, raw_window: &RawWindow) -> Result<Self, InitError> {
        let raw_window_handle = raw_window
            .window_handle()
            .map_err(|e| InitError::Window(e.to_string()))?
            .as_raw();

        let not_current_ctx = create_context(config, raw_window_handle)?;

        let PhysicalSize { width, height } = raw_window.inner_size();

        let surface = unsafe {
            let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
                raw_window_handle,
                u32_to_nonzero(width),
                u32_to_nonzero(height),
            );

            config
                .display()
                .create_window_surface(config, &attrs)
                .map_err(|e| InitError::Surface(e.to_string()))?
        };

        let ctx = not_current_ctx
            .make_current(&surface)
            .map_err(|e| InitError::Surface(format!("could not make context current: {e}")))?;

        Ok(OpenGL { surface, ctx })
    }
}

/// Tries a 3.3 core context, then OpenGL ES 3.0, then whatever the display defaults to.
fn create_context(config: &Config, handle: RawWindowHandle) -> Result<NotCurrentContext, InitError> {
    let attempts = [
        ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(handle)),
        ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(Version::new(3, 0))))
            .build(Some(handle)),
        ContextAttributesBuilder::new().build(Some(handle)),
    ];

    let mut last_error = None;
    for (i, attrs) in attempts.iter().enumerate() {
        match unsafe { config.display().create_context(config, attrs) } {
            Ok(ctx) => {
                log::debug!("Created OpenGL context on attempt {}", i + 1);
                return Ok(ctx);
            }
            Err(e) => {
                log::debug!("Context attempt {} rejected: {e}", i + 1);
                last_error = Some(e);
            }
        }
    }
    Err(InitError::Context(
        last_error.map_or_else(|| "no attributes tried".to_owned(), |e| e.to_string()),
    ))
}

mod helper {
    use std::num::NonZeroU32;

    /// Converts the `value` to a [`NonZeroU32`] if it's greater than 0,
    /// or returns [`NonZeroU32::MIN`] otherwise.
    pub fn u32_to_nonzero(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
    }

}
