//! Regenerates `docs/openapi.yml` for the confirmation route.

use std::process::ExitCode;

use fast_email_confirmation::openapi::openapi_yaml_write_default;

fn main() -> ExitCode {
    match openapi_yaml_write_default() {
        Ok(path) => {
            println!("wrote {}", path.display());
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("openapi: {error}");
            ExitCode::FAILURE
        }
    }
}
