//! Cache-first sync of GitHub users.
//!
//! The sync layer ([`sync`]) sits between a paginated remote source
//! ([`remote::RemoteSource`], implemented by [`github::GitHubClient`]) and a
//! local store ([`cache::CacheStore`], implemented by [`cache::SqliteStore`]),
//! and publishes a single [`load_state::LoadState`] per list or profile.

pub mod cache;
pub mod config;
pub mod github;
pub mod load_state;
pub mod logging;
pub mod model;
pub mod remote;
pub mod sync;

#[cfg(test)]
mod testing;

pub use load_state::LoadState;
pub use model::User;
