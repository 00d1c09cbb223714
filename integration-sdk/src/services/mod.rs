//! Service-specific client implementations
//!
//! One module per external dependency of the pipeline.

pub mod collections;
mod common;
pub mod kv_store;
pub mod reports;
pub mod tokenizer;
pub mod vector_search;

pub use common::UserAgent;
