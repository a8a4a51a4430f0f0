use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    match guardian_lib::run(config_path.as_deref()) {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "Summary could not be serialized"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Batch aborted");
            eprintln!("guardian-ingest: {e}");
            ExitCode::FAILURE
        }
    }
}
