use std::process::ExitCode;

fn main() -> ExitCode {
    hanbot_cli::run()
}
