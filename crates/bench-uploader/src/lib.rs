//! Benchmark uploader: CLI configuration, Go benchmark report parsing and
//! the wiring that hands a parsed report to the [`reporter`] pipeline.

pub mod config;
pub mod parse;
pub mod run;
