//! Model viewer
//!
//! Reads `viewer.toml` from the working directory (defaults when it is
//! missing), then opens a window and spins the configured model until the
//! window is closed or Escape is pressed.

use std::process::ExitCode;

use vk_renderer::foundation::logging;
use vk_renderer::prelude::*;

const CONFIG_PATH: &str = "viewer.toml";

fn run() -> Result<(), AppError> {
    let config = ApplicationConfig::load_or_default(CONFIG_PATH)?;
    logging::init_with_level(&config.logging.level);
    log::info!("Starting {}", config.renderer.application_name);

    let mut app = Application::new(&config)?;
    app.run()
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Config errors can happen before logging is set up
            logging::init_with_level("error");
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
