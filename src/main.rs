use imgui_gl_example::core::exit_code;
use imgui_gl_example::{run_example, AppConfig, Error};

use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => AppConfig::load(&path).map_err(Error::from),
        None => Ok(AppConfig::default()),
    }
    .and_then(run_example);

    if let Err(e) = result {
        log::error!("{e}");
        process::exit(exit_code(&e));
    }
}
