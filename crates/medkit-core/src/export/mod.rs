//! Export functionality for status reports.

mod report;

pub use report::*;
