// Start of file: src/main.rs

use std::process::ExitCode;

use tracing::{error, info};

use appservice_bootstrap::core::logging::init_tracing;
use appservice_bootstrap::utils::error_handling::EXIT_CONFIG;
use appservice_bootstrap::{Bootstrap, BootstrapConfig, EnvSnapshot, ProcessHandoff, SystemRunner};

// * Startup command: takes no arguments, everything comes from the environment.
#[tokio::main]
async fn main() -> ExitCode {
    // set up logging
    init_tracing();

    let snapshot: EnvSnapshot = EnvSnapshot::capture();

    let config: BootstrapConfig = match BootstrapConfig::from_snapshot(&snapshot) {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid bootstrap configuration: {:#}", err);
            return exit_code(EXIT_CONFIG);
        }
    };

    let mut bootstrap = Bootstrap::new(
        &config,
        &snapshot,
        SystemRunner,
        ProcessHandoff::new(config.handoff),
    );

    match bootstrap.run().await {
        Ok(code) => {
            info!(code, "Bootstrap finished");
            exit_code(code)
        }
        Err(err) => {
            error!(
                kind = err.kind(),
                state = %bootstrap.state(),
                "Bootstrap failed: {}",
                err
            );
            exit_code(err.exit_code())
        }
    }
}

// * ExitCode only carries a byte; out-of-range codes collapse to a generic failure.
fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(byte) => ExitCode::from(byte),
        Err(_) => ExitCode::FAILURE,
    }
}

// End of file: src/main.rs
