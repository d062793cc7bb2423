//! Thought repositories.

pub mod http_repo;
pub mod thought_repo;

pub use http_repo::HttpThoughtRepository;
pub use thought_repo::{
    InMemoryThoughtRepository, RepoResult, RepositoryError, ThoughtRepository,
};
