pub mod alignment;
pub mod cli;
pub mod config;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod pipeline;
pub mod read_filter;
pub mod reconcile;
pub mod record_source;
pub mod seq_parse;
pub mod tally;
pub mod types;
pub mod utils;

pub use error::{RefconsError, Result};
