//! Render commit timing and language statistics from GitHub into a README.
//!
//! The pipeline is: list repositories, fetch commits and language byte
//! counts, bucket them into histograms and rankings, render fixed-width
//! tables, and splice the result between marker comments in a README.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod github;
pub mod model;
pub mod readme;
pub mod stats;

pub use error::{Result, StatsError};
