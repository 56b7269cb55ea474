//! In-process user cache.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::traits::CacheStore;
use crate::model::User;

/// Cache that keeps users in memory and forgets them on drop.
///
/// Used for `--ephemeral` runs and as the backing store of test doubles.
#[derive(Debug, Default)]
pub struct MemoryStore {
  users: Mutex<BTreeMap<u64, User>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// A store pre-filled with `users`.
  pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
    Self {
      users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
    }
  }

  // A panic while holding the lock cannot leave the map half-written, so the
  // poisoned state is safe to reuse.
  fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, User>> {
    self.users.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl CacheStore for MemoryStore {
  async fn fetch_all(&self) -> Vec<User> {
    self.lock().values().cloned().collect()
  }

  async fn fetch_one(&self, login: &str) -> Option<User> {
    self.lock().values().find(|u| u.login == login).cloned()
  }

  async fn upsert_many(&self, users: &[User]) {
    let mut stored = self.lock();
    for user in users {
      stored.insert(user.id, user.clone());
    }
  }

  async fn replace_all(&self, users: &[User]) {
    let mut stored = self.lock();
    stored.clear();
    for user in users {
      stored.insert(user.id, user.clone());
    }
  }

  async fn clear(&self) {
    self.lock().clear();
  }

  async fn update_one(&self, user: &User) {
    if let Some(existing) = self.lock().get_mut(&user.id) {
      *existing = user.clone();
    }
  }
}
