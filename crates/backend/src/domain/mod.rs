//! Domain types for the indexing backend.

pub mod repository;

pub use repository::{Repository, RepositoryStorage};
