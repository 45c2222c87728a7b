use std::process::ExitCode;

use clap::Parser;

use texpaint::cli::{self, CliArgs};

fn main() -> ExitCode {
    cli::run(CliArgs::parse())
}
