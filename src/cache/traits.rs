//! The cache contract used by the sync layer.

use std::future::Future;

use crate::model::User;

/// Persistent store of users, keyed by `id` with `login` as a secondary key.
///
/// Implementations serialize their own access, so callers may invoke any
/// method concurrently. None of the methods fail observably.
pub trait CacheStore: Send + Sync {
  /// All stored users ordered by ascending `id`. Empty when nothing is stored.
  fn fetch_all(&self) -> impl Future<Output = Vec<User>> + Send;

  /// Point lookup by `login`.
  fn fetch_one(&self, login: &str) -> impl Future<Output = Option<User>> + Send;

  /// Insert new users and replace existing ones (matched by `id`) wholesale.
  fn upsert_many(&self, users: &[User]) -> impl Future<Output = ()> + Send;

  /// Equivalent to `clear` followed by `upsert_many`, applied atomically.
  fn replace_all(&self, users: &[User]) -> impl Future<Output = ()> + Send;

  /// Remove every stored user.
  fn clear(&self) -> impl Future<Output = ()> + Send;

  /// Replace the stored user with the same `id`. Does nothing if there is none.
  fn update_one(&self, user: &User) -> impl Future<Output = ()> + Send;
}
