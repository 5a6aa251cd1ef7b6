use std::process::ExitCode;

fn main() -> ExitCode {
    shelfbot_cli::run()
}
