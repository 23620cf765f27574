//! User interface module - terminal output for the command line.
//!
//! Library code logs through `tracing`; this module is what the binary prints
//! for the user: errors, progress and the final release summary.

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_error, display_finding, display_release_summary, display_status, display_success,
    format_release_summary,
};
