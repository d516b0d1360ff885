//! Output module for harvest artifacts and reports
//!
//! This module handles:
//! - The newline-delimited names and links lists used to resume a run
//! - Writing extracted records as CSV
//! - Recording and printing run statistics

mod artifacts;
mod csv_writer;
pub mod stats;

pub use artifacts::{read_lines, read_links, write_lines, write_links};
pub use csv_writer::{record_columns, write_records};
pub use stats::{print_cache_summary, print_statistics, RunStatistics};
