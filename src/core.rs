//! The event loop, the window and the input forwarded to the GUI.

mod application;
mod input;
mod window;

use glutin::prelude::*;

pub use application::{exit_code, Application};
pub use input::{map_key, FrameInput, InputState};
pub use window::Window;
