//! blockql - declarative block configuration language
//!
//! The small `key: value` language notelite blocks are written in.
//!
//! # Syntax Overview
//!
//! ```text
//! table: Habits
//! columns: habit, count
//! filterColumn: habit
//! filterValue: meditation
//! dateColumn: date
//! startDate: 2024-01-01
//! endDate: 2024-01-31
//! orderBy: date
//! orderDirection: desc
//! limit: 20
//! displayFormat: table
//! ```
//!
//! Chart blocks carry a `chartType` plus their own column keys and an
//! optional nested options block:
//!
//! ```text
//! table: Time
//! chartType: pie
//! categoryColumn: project
//! valueColumn: duration
//! chartOptions: {
//!   showLegend: true,
//!   aspectRatio: 1.5
//! }
//! ```
//!
//! Parsing is pure: a block either produces a fully-typed configuration
//! or a [`ConfigError`], never a partial result. Column and table names
//! are *not* validated here; identifier safety and schema checks happen
//! downstream, before any SQL is built.

mod config;
mod error;
mod parser;

pub use config::*;
pub use error::ConfigError;

/// Parse a row-query block into its typed configuration.
pub fn parse_query_block(source: &str) -> Result<QueryBlock, ConfigError> {
    parser::parse_query_block(source)
}

/// Parse a chart block into its typed configuration.
pub fn parse_chart_block(source: &str) -> Result<ChartBlock, ConfigError> {
    parser::parse_chart_block(source)
}
