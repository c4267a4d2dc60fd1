//! Fatal error reporting for the command-line entry point

use tracing::error;

use crate::error::Error;

/// Exit code for usage errors the caller can fix.
pub const ARGUMENT_ERROR: i32 = 2;
/// Exit code for everything else.
pub const GENERAL_ERROR: i32 = 1;

pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<Error>() {
        Some(e) if e.is_client_error() => ARGUMENT_ERROR,
        Some(Error::MissingCredential(_)) | Some(Error::Config(_)) => ARGUMENT_ERROR,
        _ => GENERAL_ERROR,
    }
}

/// Print `error` and exit. With `verbose >= 1` the full cause chain is shown.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}
