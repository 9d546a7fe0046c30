mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use std::process::ExitCode;

use ats_flow::error::AppError;

pub fn run() -> Result<ExitCode, AppError> {
    cli::run()
}
