use std::process::ExitCode;

fn main() -> ExitCode {
    motodesk_cli::run()
}
