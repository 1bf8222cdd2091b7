//! A minimal Dear ImGui application drawing its draw lists with OpenGL.
#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod error;
pub mod gui;
pub mod renderer;

pub use config::AppConfig;
pub use error::{Error, Result};

/// Runs the example application until its window is closed.
pub fn run_example(config: AppConfig) -> Result<()> {
    let app = core::Application::new(config)?;
    app.run()
}
