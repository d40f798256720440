//! Single integration test binary.
//!
//! - pipeline: CSV file → dataset → projection → plot provider

mod pipeline;
