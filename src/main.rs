use std::process::ExitCode;

fn main() -> ExitCode {
    match partbin::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
