//! Embedded, file-backed exact nearest-neighbor vector index.
//!
//! A `Collection` keeps `D`-dimensional vectors on one sorted permutation
//! per dimension and answers `search` by intersecting per-dimension
//! candidate ranges before a true Euclidean refinement. No ANN graphs, no
//! network server, no multi-writer concurrency: the contract is exact
//! recall on a single host with near-instant cold start via a
//! memory-mapped, lazy-index-build load path.

pub mod codec;
pub mod collection;
pub mod config;
pub mod embedding;
pub mod error;
pub mod filter;
mod index;
pub mod node;
mod query;
pub mod semantic;
pub mod storage;

pub use codec::{Quantized, Quantizer};
pub use collection::Collection;
pub use config::CollectionConfig;
pub use embedding::EmbeddingProvider;
pub use error::{Error, Result};
pub use filter::Filter;
pub use node::{InsertItem, Metadata, Node, Timestamp};
pub use semantic::semantic_radius;
pub use storage::VectorSource;
