use std::process::ExitCode;

use clap::Parser;
use osc::Cli;

fn main() -> ExitCode {
    // clap exits with status 2 on usage errors
    let cli = Cli::parse();
    match osc::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
