//! Parsing Strategy Module
//!
//! - Parallel: independent documents spread over the Rayon pool

pub mod parallel;

pub use parallel::parse_parallel;
