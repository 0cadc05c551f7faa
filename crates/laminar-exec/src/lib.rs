//! Subprocess execution, metric scraping, and tool results.
//!
//! This crate is the leaf of the execution stack: [`CommandRunner`] invokes
//! one external process with a timeout, [`MetricParser`] scrapes named
//! numeric metrics from its stdout, and [`ToolExecutor`] combines the two
//! into a uniform [`laminar_types::ToolResult`]. Nothing here returns an
//! error for a failing tool — failures are values.

pub mod command;
pub mod metrics;
pub mod tool;
pub mod truncation;

pub use command::{CommandOutput, CommandRunner};
pub use metrics::{MetricParser, PatternMatch};
pub use tool::ToolExecutor;
pub use truncation::{truncate_output, TruncationMode};
