//! CLI commands
//!
//! Command implementations for the `sfm` binary.

mod prepare;
mod progress;
mod style;
mod submit;

pub use prepare::{parse_kib, run_prepare};
pub use submit::{parse_pair, run_submit, SubmitArgs};
