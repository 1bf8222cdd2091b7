//! Error types for the example application.

use thiserror::Error;

/// Errors produced while loading the application configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML or has mistyped fields.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value the application cannot use.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur while setting up the window, the OpenGL context or the renderer.
#[derive(Error, Debug)]
pub enum InitError {
    /// No usable OpenGL display configuration was found.
    #[error("Could not create OpenGL config: {0}")]
    Display(String),

    /// The window could not be created.
    #[error("Could not create window: {0}")]
    Window(String),

    /// Every context attribute set was rejected by the display.
    #[error("Failed to create OpenGL context: {0}")]
    Context(String),

    /// The window surface could not be created or made current.
    #[error("Could not create OpenGL window surface: {0}")]
    Surface(String),

    /// The driver returned a null name for a GL object.
    #[error("Failed to create {0}")]
    CreateObject(&'static str),

    /// A shader failed to compile.
    #[error("Failed to compile shader: {0}")]
    CompileShader(String),

    /// The shader program failed to link.
    #[error("Failed to link program: {0}")]
    LinkProgram(String),

    /// The linked program does not expose a vertex attribute.
    #[error("Could not find {0} attribute")]
    MissingAttribute(&'static str),

    /// The font atlas could not be rasterized.
    #[error("Invalid font atlas: {0}")]
    FontAtlas(String),
}

/// Top-level error returned by the application.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Window, context or renderer setup failed.
    #[error(transparent)]
    Init(#[from] InitError),

    /// The event loop could not be created or stopped with an error.
    #[error(transparent)]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Result type used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
