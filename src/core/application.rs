use crate::config::AppConfig;
use crate::core::input::InputState;
use crate::core::window::Window;
use crate::core::*;
use crate::error::{Error, InitError, Result};
use crate::gui::Gui;
use crate::renderer::GlRenderer;

use glutin::config::{Config, ConfigTemplateBuilder};
use glutin_winit::DisplayBuilder;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::error::EventLoopError;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

/// A module with known application exit codes.
mod exit_codes {
    /// An error thrown by the OS.
    pub const OS_ERROR: i32 = 1;
    /// An operation is not supported by the rendering backend.
    pub const OP_NOT_SUPPORTED: i32 = 2;
    /// An error with the event loop.
    pub const EVENT_LOOP_ERROR: i32 = 3;
    /// The window, the OpenGL context or the renderer could not be set up.
    pub const INIT_ERROR: i32 = 4;
    /// The configuration file could not be loaded.
    pub const CONFIG_ERROR: i32 = 5;
}

/// The process exit code reporting `error`.
pub fn exit_code(error: &Error) -> i32 {
    match error {
        Error::Config(_) => exit_codes::CONFIG_ERROR,
        Error::Init(_) => exit_codes::INIT_ERROR,
        Error::EventLoop(e) => match e {
            EventLoopError::NotSupported(_) => exit_codes::OP_NOT_SUPPORTED,
            EventLoopError::Os(_) => exit_codes::OS_ERROR,
            EventLoopError::RecreationAttempt => exit_codes::EVENT_LOOP_ERROR,
            EventLoopError::ExitFailure(code) => *code,
        },
    }
}

/// An application, the main entrypoint of the program.
pub struct Application {
    event_loop: EventLoop<()>,
    application: ApplicationInternal,
}

/// An internal struct handling OS events when the application is run.
///
/// Fields drop in declaration order, so the renderer releases its GPU objects
/// while the window's context is still alive.
struct ApplicationInternal {
    renderer: GlRenderer,
    gui: Gui,
    input: InputState,
    window: Window,
    clear_color: [f32; 4],
    quit_requested: bool,
}

impl Application {
    /// Creates the window and its OpenGL context, the GUI context and the renderer.
    pub fn new(config: AppConfig) -> Result<Self> {
        let event_loop = EventLoop::new()?;

        let template = ConfigTemplateBuilder::new().with_alpha_size(8);

        /// A comparator for finding a config with the smallest [number of samples](GlConfig::num_samples).
        fn min_samples(c1: Config, c2: Config) -> Config {
            if c1.num_samples() <= c2.num_samples() {
                c1
            } else {
                c2
            }
        }

        let window_attrs = Window::default_attrs(&config.title, config.width, config.height);
        let (raw_window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(window_attrs))
            .build(&event_loop, template, |configs| {
                configs
                    .reduce(min_samples)
                    .expect("Display offered no OpenGL configs")
            })
            .map_err(|e| InitError::Display(e.to_string()))?;
        let raw_window = raw_window
            .ok_or_else(|| InitError::Window("no window was created with the OpenGL config".into()))?;

        let window = Window::from_raw(raw_window, &gl_config, config.vsync)?;
        let framebuffer = window.framebuffer_size();

        let mut gui = Gui::new(&config);
        gui.set_display_size(framebuffer);
        let mut input = InputState::new();
        input.set_mouse_pos_scale(framebuffer, window.window_size());

        let renderer = GlRenderer::new(gui.context_mut())?;

        event_loop.set_control_flow(ControlFlow::Poll);
        log::info!(
            "Opened \"{}\" with a {}x{} framebuffer",
            config.title,
            framebuffer.width,
            framebuffer.height
        );

        Ok(Application {
            event_loop,
            application: ApplicationInternal {
                renderer,
                gui,
                input,
                window,
                clear_color: config.clear_color,
                quit_requested: false,
            },
        })
    }

    /// Runs the application on the calling thread until the window is closed.
    pub fn run(self) -> Result<()> {
        let Application {
            event_loop,
            mut application,
        } = self;
        event_loop.run_app(&mut application)?;
        log::info!("Event loop finished");
        Ok(())
    }
}

impl ApplicationInternal {
    fn resize(&mut self, framebuffer: PhysicalSize<u32>) {
        self.window.resize(framebuffer);
        self.gui.set_display_size(framebuffer);
        self.input
            .set_mouse_pos_scale(framebuffer, self.window.window_size());
    }

    fn redraw(&mut self) {
        if let Err(e) = self.window.make_current() {
            log::warn!("Could not make OpenGL context current: {e}");
            return;
        }

        let frame_input = self.input.take_frame_input();
        let display_size = self.gui.display_size();
        let draw_data = self.gui.frame(&frame_input, Instant::now());

        self.renderer.clear(display_size, self.clear_color);
        self.renderer.render(draw_data);

        if let Err(e) = self.window.swap_buffers() {
            log::warn!("Could not swap buffers: {e}");
        }
    }
}

impl ApplicationHandler for ApplicationInternal {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if window_id != self.window.id() {
            return;
        }
        if self.input.handle_event(&event, self.window.scale_factor()) {
            return;
        }

        match event {
            WindowEvent::Resized(physical_size) => self.resize(physical_size),
            WindowEvent::ScaleFactorChanged { .. } => {
                self.resize(self.window.framebuffer_size())
            }
            WindowEvent::CloseRequested => {
                log::info!("Quit requested");
                self.quit_requested = true;
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.quit_requested {
            event_loop.exit();
        } else {
            self.window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn errors_map_to_their_exit_codes() {
        let config = Error::Config(ConfigError::Invalid("width must be non-zero".into()));
        assert_eq!(exit_code(&config), exit_codes::CONFIG_ERROR);
        assert_eq!(exit_code(&config), 5);

        let init = Error::Init(InitError::CreateObject("vertex buffer"));
        assert_eq!(exit_code(&init), exit_codes::INIT_ERROR);
        assert_eq!(exit_code(&init), 4);

        let recreated = Error::EventLoop(EventLoopError::RecreationAttempt);
        assert_eq!(exit_code(&recreated), exit_codes::EVENT_LOOP_ERROR);
    }

    #[test]
    fn event_loop_exit_failure_keeps_its_code() {
        let error = Error::EventLoop(EventLoopError::ExitFailure(7));
        assert_eq!(exit_code(&error), 7);
    }
}
