use std::process::ExitCode;

fn main() -> ExitCode {
    canvass_cli::run()
}
