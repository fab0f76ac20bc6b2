use std::process::ExitCode;

/// Exit status for errors raised while validating configuration.
const CONFIG_ERROR_EXIT: u8 = 2;

fn main() -> ExitCode {
    match httpbench::entry::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            if err.is_configuration() {
                ExitCode::from(CONFIG_ERROR_EXIT)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
