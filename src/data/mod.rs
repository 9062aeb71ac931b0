//! Record normalization module
//!
//! Accepts column-oriented or row-oriented input and produces one canonical
//! column map. Nothing downstream branches on the input shape again.
//!
//! # Overview
//!
//! - [`normalize`] validates and pivots raw input
//! - [`Dataset`] owns the result and offers `fill`, `row_count`,
//!   `column_kinds`, and record materialization

mod dataset;
mod normalizer;

pub use dataset::Dataset;
pub use normalizer::{check_lengths, normalize, NormalizeOptions, RawDataset};

#[cfg(test)]
mod tests;
