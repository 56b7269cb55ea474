//! Contract for the remote user source.

use std::future::Future;

use thiserror::Error;

use crate::model::User;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Any failure talking to the remote source.
///
/// The sync layer does not distinguish between variants; they exist for log
/// messages and for callers that talk to the client directly.
#[derive(Debug, Error)]
pub enum RemoteFailure {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("unexpected status {status} from {url}")]
  Status {
    status: reqwest::StatusCode,
    url: String,
  },

  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("invalid url: {0}")]
  InvalidUrl(#[from] url::ParseError),
}

/// A paginated source of users.
pub trait RemoteSource: Send + Sync {
  /// Fetch up to `per_page` users whose id is strictly greater than `since_id`.
  ///
  /// `since_id == 0` is the first page. An empty page means there is no more data.
  fn fetch_page(
    &self,
    since_id: u64,
    per_page: u32,
  ) -> impl Future<Output = Result<Vec<User>, RemoteFailure>> + Send;

  /// Fetch the detailed profile of `login`.
  fn fetch_detail(&self, login: &str) -> impl Future<Output = Result<User, RemoteFailure>> + Send;
}
