mod app;
mod domain;
mod gateway;
mod infra;
mod shared;
pub mod test_support;

pub(crate) use app::app_state;
pub(crate) use infra::{db, settings};
pub(crate) use shared::blocking;

use std::process::ExitCode;

/// Parses the command line, installs logging and runs the selected command.
pub fn run() -> ExitCode {
    app::cli::run()
}
