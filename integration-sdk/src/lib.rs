//! # Integration SDK
//!
//! Clients for every external service the API quality pipeline talks to.
//!
//! Each client is built from its settings struct and owns a
//! [`error_handling::FailSoft`] handle, so a missing credential or a broken
//! backend turns into a degraded result instead of an error:
//!
//! - `kv_store`: key-value persistence with an in-memory fallback
//! - `tokenizer`: PII field tokenization
//! - `collections`: test collection registration
//! - `reports`: report document storage
//! - `vector_search`: snippet search and indexing

pub mod error;
pub use error::{ErrorContext, Result, ServiceError};

pub mod services;
pub use services::collections::CollectionClient;
pub use services::kv_store::{KeyValueBackend, KeyValueStore, MemoryBackend, RedisBackend};
pub use services::reports::ReportStoreClient;
pub use services::tokenizer::TokenizerClient;
pub use services::vector_search::{IndexDocument, VectorSearchClient};
pub use services::UserAgent;

#[cfg(test)]
mod tests;
