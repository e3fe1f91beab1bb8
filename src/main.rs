// src/main.rs

use std::process::ExitCode;

use routewatch::{cli, logging, run};

/// Exit status for configuration and other startup errors.
const STARTUP_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("routewatch error: {err:#}");
            ExitCode::from(STARTUP_ERROR)
        }
    }
}

async fn run_main() -> anyhow::Result<ExitCode> {
    let args = cli::parse();
    logging::init_logging(args.log_level, args.log_file.as_deref())?;
    let exit = run(args).await?;
    Ok(ExitCode::from(exit.exit_code() as u8))
}
