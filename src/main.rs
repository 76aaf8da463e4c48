//! appify - wrap a standalone executable into a macOS .app bundle and .dmg.

use appify::cli;
use appify::cli::OutputManager;
use std::process;

/// Exit status for any failure, matching clap's usage error status.
const FAILURE_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Create output manager for error display (never quiet for fatal errors)
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }

            process::exit(FAILURE_EXIT_CODE);
        }
    }
}
