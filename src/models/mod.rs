//! Result and display models for CLI output
//!
//! `RunOutcome` is the structured result of one invocation; `AlertRow` is the
//! table view of a single alert.

pub mod alert;
pub mod outcome;

pub use alert::AlertRow;
pub use outcome::{ReportOutcome, RunOutcome, ScanStatus};
