//! SQLite implementation of the user cache.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::traits::CacheStore;
use crate::model::User;

/// Schema for the user cache.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    login TEXT NOT NULL,
    avatar_url TEXT,
    html_url TEXT,
    location TEXT,
    followers INTEGER,
    following INTEGER,
    bio TEXT,
    blog TEXT
);

CREATE INDEX IF NOT EXISTS idx_users_login ON users(login);
"#;

const SELECT_COLUMNS: &str =
  "id, login, avatar_url, html_url, location, followers, following, bio, blog";

/// SQLite-based user cache.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the cache at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Open or create the cache at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// A private database that lives as long as the store.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("ghsync").join("cache.db"))
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self
      .lock()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }

  fn try_fetch_all(&self) -> Result<Vec<User>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare(&format!("SELECT {SELECT_COLUMNS} FROM users ORDER BY id ASC"))
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let users = stmt
      .query_map([], user_from_row)
      .map_err(|e| eyre!("Failed to query users: {}", e))?
      .collect::<rusqlite::Result<Vec<User>>>()
      .map_err(|e| eyre!("Failed to read user row: {}", e))?;

    Ok(users)
  }

  fn try_fetch_one(&self, login: &str) -> Result<Option<User>> {
    let conn = self.lock()?;

    conn
      .query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM users WHERE login = ? LIMIT 1"),
        params![login],
        user_from_row,
      )
      .optional()
      .map_err(|e| eyre!("Failed to fetch user {}: {}", login, e))
  }

  fn try_upsert_many(&self, users: &[User]) -> Result<()> {
    let mut conn = self.lock()?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;
    insert_users(&tx, users)?;
    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn try_replace_all(&self, users: &[User]) -> Result<()> {
    let mut conn = self.lock()?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;
    tx.execute("DELETE FROM users", [])
      .map_err(|e| eyre!("Failed to delete old users: {}", e))?;
    insert_users(&tx, users)?;
    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn try_clear(&self) -> Result<()> {
    self
      .lock()?
      .execute("DELETE FROM users", [])
      .map_err(|e| eyre!("Failed to delete users: {}", e))?;

    Ok(())
  }

  fn try_update_one(&self, user: &User) -> Result<bool> {
    let changed = self
      .lock()?
      .execute(
        "UPDATE users SET login = ?, avatar_url = ?, html_url = ?, location = ?,
           followers = ?, following = ?, bio = ?, blog = ?
         WHERE id = ?",
        params![
          user.login,
          user.avatar_url,
          user.html_url,
          user.location,
          user.followers,
          user.following,
          user.bio,
          user.blog,
          user.id,
        ],
      )
      .map_err(|e| eyre!("Failed to update user {}: {}", user.login, e))?;

    Ok(changed > 0)
  }
}

fn insert_users(conn: &Connection, users: &[User]) -> Result<()> {
  let mut stmt = conn
    .prepare(&format!(
      "INSERT OR REPLACE INTO users ({SELECT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .map_err(|e| eyre!("Failed to prepare insert: {}", e))?;

  for user in users {
    stmt
      .execute(params![
        user.id,
        user.login,
        user.avatar_url,
        user.html_url,
        user.location,
        user.followers,
        user.following,
        user.bio,
        user.blog,
      ])
      .map_err(|e| eyre!("Failed to store user {}: {}", user.login, e))?;
  }

  Ok(())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
  Ok(User {
    id: row.get(0)?,
    login: row.get(1)?,
    avatar_url: row.get(2)?,
    html_url: row.get(3)?,
    location: row.get(4)?,
    followers: row.get(5)?,
    following: row.get(6)?,
    bio: row.get(7)?,
    blog: row.get(8)?,
  })
}

impl CacheStore for SqliteStore {
  async fn fetch_all(&self) -> Vec<User> {
    self.try_fetch_all().unwrap_or_else(|e| {
      warn!(error = %e, "failed to read cached users");
      Vec::new()
    })
  }

  async fn fetch_one(&self, login: &str) -> Option<User> {
    self.try_fetch_one(login).unwrap_or_else(|e| {
      warn!(error = %e, login, "failed to read cached user");
      None
    })
  }

  async fn upsert_many(&self, users: &[User]) {
    if users.is_empty() {
      return;
    }
    match self.try_upsert_many(users) {
      Ok(()) => debug!(count = users.len(), "cached users"),
      Err(e) => warn!(error = %e, "failed to append users"),
    }
  }

  async fn replace_all(&self, users: &[User]) {
    match self.try_replace_all(users) {
      Ok(()) => debug!(count = users.len(), "replaced cached users"),
      Err(e) => warn!(error = %e, "failed to replace users"),
    }
  }

  async fn clear(&self) {
    if let Err(e) = self.try_clear() {
      warn!(error = %e, "failed to delete all users");
    }
  }

  async fn update_one(&self, user: &User) {
    match self.try_update_one(user) {
      Ok(true) => debug!(login = %user.login, "updated cached user"),
      Ok(false) => debug!(login = %user.login, "user not cached, skipping update"),
      Err(e) => warn!(error = %e, "failed to update user"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
  }

  fn detailed(id: u64, login: &str) -> User {
    User {
      location: Some("Berlin".to_string()),
      followers: Some(10),
      following: Some(2),
      bio: Some("bio".to_string()),
      blog: Some("https://example.com".to_string()),
      ..User::summary(id, login)
    }
  }

  #[tokio::test]
  async fn test_empty_store_returns_empty() {
    let store = store();
    assert!(store.fetch_all().await.is_empty());
    assert_eq!(store.fetch_one("nobody").await, None);
  }

  #[tokio::test]
  async fn test_fetch_all_is_sorted_by_id() {
    let store = store();
    store
      .upsert_many(&[
        User::summary(42, "c"),
        User::summary(1, "a"),
        User::summary(7, "b"),
      ])
      .await;

    let ids: Vec<u64> = store.fetch_all().await.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![1, 7, 42]);
  }

  #[tokio::test]
  async fn test_upsert_replaces_wholesale() {
    let store = store();
    store.upsert_many(&[detailed(1, "octocat")]).await;
    store.upsert_many(&[User::summary(1, "octocat")]).await;

    let user = store.fetch_one("octocat").await.unwrap();
    assert_eq!(user, User::summary(1, "octocat"));
  }

  #[tokio::test]
  async fn test_replace_all_drops_previous_rows() {
    let store = store();
    store
      .upsert_many(&[User::summary(1, "a"), User::summary(2, "b")])
      .await;
    store.replace_all(&[User::summary(3, "c")]).await;

    assert_eq!(store.fetch_all().await, vec![User::summary(3, "c")]);
  }

  #[tokio::test]
  async fn test_update_one_only_touches_existing() {
    let store = store();
    store.upsert_many(&[User::summary(1, "octocat")]).await;

    store.update_one(&detailed(1, "octocat")).await;
    store.update_one(&detailed(2, "ghost")).await;

    let all = store.fetch_all().await;
    assert_eq!(all, vec![detailed(1, "octocat")]);
    assert!(all[0].is_detailed());
  }

  #[tokio::test]
  async fn test_clear_removes_everything() {
    let store = store();
    store
      .upsert_many(&[User::summary(1, "a"), User::summary(2, "b")])
      .await;
    store.clear().await;

    assert!(store.fetch_all().await.is_empty());
  }

  #[tokio::test]
  async fn test_open_creates_parent_directories() {
    let dir = std::env::temp_dir().join(format!("ghsync-test-{}", std::process::id()));
    let path = dir.join("nested").join("cache.db");

    {
      let store = SqliteStore::open(&path).unwrap();
      store.upsert_many(&[User::summary(5, "persisted")]).await;
    }

    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.fetch_all().await, vec![User::summary(5, "persisted")]);

    std::fs::remove_dir_all(&dir).unwrap();
  }
}
