//! Test doubles for the remote and cache ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::cache::{CacheStore, MemoryStore};
use crate::model::User;
use crate::remote::{RemoteFailure, RemoteSource};

/// Remote source with canned responses and call tracking.
///
/// Every call waits `latency` before answering so that concurrent callers
/// really overlap.
pub struct MockRemote {
  pages: Mutex<HashMap<u64, Vec<User>>>,
  detail: Mutex<Option<User>>,
  fail: AtomicBool,
  latency: Mutex<Duration>,
  page_calls: Mutex<Vec<(u64, u32)>>,
  detail_calls: AtomicUsize,
}

impl Default for MockRemote {
  fn default() -> Self {
    Self {
      pages: Mutex::new(HashMap::new()),
      detail: Mutex::new(None),
      fail: AtomicBool::new(false),
      latency: Mutex::new(Duration::from_millis(10)),
      page_calls: Mutex::new(Vec::new()),
      detail_calls: AtomicUsize::new(0),
    }
  }
}

impl MockRemote {
  pub fn new() -> Self {
    Self::default()
  }

  /// Answer `fetch_page(since_id, _)` with `users`. Unset pages are empty.
  pub fn set_page(&self, since_id: u64, users: Vec<User>) {
    self.pages.lock().unwrap().insert(since_id, users);
  }

  pub fn set_detail(&self, user: User) {
    *self.detail.lock().unwrap() = Some(user);
  }

  pub fn set_failing(&self, fail: bool) {
    self.fail.store(fail, Ordering::SeqCst);
  }

  pub fn set_latency(&self, latency: Duration) {
    *self.latency.lock().unwrap() = latency;
  }

  pub fn page_calls(&self) -> Vec<(u64, u32)> {
    self.page_calls.lock().unwrap().clone()
  }

  pub fn page_call_count(&self) -> usize {
    self.page_calls.lock().unwrap().len()
  }

  pub fn detail_call_count(&self) -> usize {
    self.detail_calls.load(Ordering::SeqCst)
  }

  async fn wait(&self) {
    let latency = *self.latency.lock().unwrap();
    tokio::time::sleep(latency).await;
  }

  fn failure(&self) -> Option<RemoteFailure> {
    self.fail.load(Ordering::SeqCst).then(|| RemoteFailure::Status {
      status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
      url: "mock://users".to_string(),
    })
  }
}

impl RemoteSource for MockRemote {
  async fn fetch_page(&self, since_id: u64, per_page: u32) -> Result<Vec<User>, RemoteFailure> {
    self.page_calls.lock().unwrap().push((since_id, per_page));
    self.wait().await;

    if let Some(err) = self.failure() {
      return Err(err);
    }
    Ok(
      self
        .pages
        .lock()
        .unwrap()
        .get(&since_id)
        .cloned()
        .unwrap_or_default(),
    )
  }

  async fn fetch_detail(&self, login: &str) -> Result<User, RemoteFailure> {
    self.detail_calls.fetch_add(1, Ordering::SeqCst);
    self.wait().await;

    if let Some(err) = self.failure() {
      return Err(err);
    }
    let detail = self.detail.lock().unwrap().clone();
    detail.ok_or_else(|| RemoteFailure::Status {
      status: reqwest::StatusCode::NOT_FOUND,
      url: format!("mock://users/{login}"),
    })
  }
}

/// `MemoryStore` that counts calls per operation.
///
/// Reads take their snapshot first and then wait `read_latency`, so a slow
/// read hands back what the cache held when it started.
#[derive(Default)]
pub struct RecordingCache {
  store: MemoryStore,
  read_latency: Mutex<Duration>,
  pub fetch_all_calls: AtomicUsize,
  pub fetch_one_calls: AtomicUsize,
  pub upsert_calls: AtomicUsize,
  pub replace_calls: AtomicUsize,
  pub clear_calls: AtomicUsize,
  pub update_calls: AtomicUsize,
}

impl RecordingCache {
  pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
    Self {
      store: MemoryStore::with_users(users),
      ..Self::default()
    }
  }

  pub fn set_read_latency(&self, latency: Duration) {
    *self.read_latency.lock().unwrap() = latency;
  }

  async fn read_wait(&self) {
    let latency = *self.read_latency.lock().unwrap();
    if !latency.is_zero() {
      tokio::time::sleep(latency).await;
    }
  }

  pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
  }

  /// Current contents, without counting as a call.
  pub async fn snapshot(&self) -> Vec<User> {
    self.store.fetch_all().await
  }
}

impl CacheStore for RecordingCache {
  async fn fetch_all(&self) -> Vec<User> {
    self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
    let users = self.store.fetch_all().await;
    self.read_wait().await;
    users
  }

  async fn fetch_one(&self, login: &str) -> Option<User> {
    self.fetch_one_calls.fetch_add(1, Ordering::SeqCst);
    let user = self.store.fetch_one(login).await;
    self.read_wait().await;
    user
  }

  async fn upsert_many(&self, users: &[User]) {
    self.upsert_calls.fetch_add(1, Ordering::SeqCst);
    self.store.upsert_many(users).await
  }

  async fn replace_all(&self, users: &[User]) {
    self.replace_calls.fetch_add(1, Ordering::SeqCst);
    self.store.replace_all(users).await
  }

  async fn clear(&self) {
    self.clear_calls.fetch_add(1, Ordering::SeqCst);
    self.store.clear().await
  }

  async fn update_one(&self, user: &User) {
    self.update_calls.fetch_add(1, Ordering::SeqCst);
    self.store.update_one(user).await
  }
}

/// Cache that keeps rows exactly as written, repeated ids included.
pub struct RowCache {
  rows: Mutex<Vec<User>>,
}

impl RowCache {
  pub fn with_rows(rows: Vec<User>) -> Self {
    Self {
      rows: Mutex::new(rows),
    }
  }
}

impl CacheStore for RowCache {
  async fn fetch_all(&self) -> Vec<User> {
    self.rows.lock().unwrap().clone()
  }

  async fn fetch_one(&self, login: &str) -> Option<User> {
    let rows = self.rows.lock().unwrap();
    rows.iter().find(|u| u.login == login).cloned()
  }

  async fn upsert_many(&self, users: &[User]) {
    self.rows.lock().unwrap().extend_from_slice(users);
  }

  async fn replace_all(&self, users: &[User]) {
    *self.rows.lock().unwrap() = users.to_vec();
  }

  async fn clear(&self) {
    self.rows.lock().unwrap().clear();
  }

  async fn update_one(&self, user: &User) {
    for row in self.rows.lock().unwrap().iter_mut() {
      if row.id == user.id {
        *row = user.clone();
      }
    }
  }
}

/// Summary users with the given ids.
pub fn users(ids: &[u64]) -> Vec<User> {
  ids.iter().map(|&id| User::summary(id, format!("user{id}"))).collect()
}

/// A user carrying profile details.
pub fn detailed(id: u64, login: &str) -> User {
  User {
    location: Some("Hanoi".to_string()),
    followers: Some(100),
    following: Some(5),
    bio: Some("Rustacean".to_string()),
    blog: Some("https://blog.example.com".to_string()),
    ..User::summary(id, login)
  }
}
