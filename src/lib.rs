pub mod analyzers;
pub mod config;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod paths;
pub mod records;
pub mod schema;

pub use error::{Error, Result};
