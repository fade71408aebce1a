use std::process::ExitCode;

fn main() -> ExitCode {
    travo_cli::run()
}
