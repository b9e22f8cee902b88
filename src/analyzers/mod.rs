//! Analysis of the canonical datasets.
//!
//! Loads the merged traffic and weather files, classifies days against a
//! holiday calendar, summarizes delay distributions, and relates hourly delay
//! statistics to the weather.

pub mod aggregate;
pub mod analyzer;
pub mod correlation;
pub mod day_type;
pub mod regression;
pub mod types;
pub mod utility;
