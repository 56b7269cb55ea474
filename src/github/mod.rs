//! GitHub REST API adapter for the remote user source.

mod api_types;
mod client;

pub use client::GitHubClient;
