//! Query compilation and block execution

pub mod compiler;
mod executor;

pub use compiler::{compile_chart, compile_query, CompiledQuery};
pub use executor::{process_chart_block, process_query_block};
