mod cli;
mod commands;
mod demo;
mod digest;
mod infra;

use realtor_ai::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
