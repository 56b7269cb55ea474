//! Cache-first, paginated sync of the user list.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use super::lock;
use crate::cache::CacheStore;
use crate::load_state::LoadState;
use crate::model::{dedup_by_id, User};
use crate::remote::{RemoteSource, DEFAULT_PAGE_SIZE};

type UsersState = LoadState<Vec<User>>;

/// A page fetch that passed the guard and has not finished yet
struct PendingPage {
  id: u64,
  abort: AbortHandle,
}

struct ListInner {
  state: UsersState,
  /// Set from a refresh's guard until its final transition
  refreshing: bool,
  /// Bumped by every refresh that passes the guard
  refresh_gen: u64,
  is_last_page: bool,
  pending_page: Option<PendingPage>,
  next_page_id: u64,
}

impl ListInner {
  fn is_paginating(&self) -> bool {
    self.pending_page.is_some()
  }

  fn owns_pagination(&self, id: u64) -> bool {
    self.pending_page.as_ref().is_some_and(|p| p.id == id)
  }

  fn cancel_pagination(&mut self) {
    if let Some(pending) = self.pending_page.take() {
      debug!(id = pending.id, "cancelling pending page fetch");
      pending.abort.abort();
    }
  }
}

struct Shared {
  inner: Mutex<ListInner>,
  state_tx: watch::Sender<UsersState>,
}

impl Shared {
  fn lock(&self) -> MutexGuard<'_, ListInner> {
    lock(&self.inner)
  }

  fn publish(&self, inner: &mut ListInner, state: UsersState) {
    debug!(from = inner.state.label(), to = state.label(), "user list state");
    inner.state = state;
    self.state_tx.send_replace(inner.state.clone());
  }
}

/// Releases the refresh flag when a refresh ends.
///
/// A refresh superseded by a later forced refresh leaves the state alone. If
/// the refresh future is dropped while the state is still `Loading`, the state
/// from before the refresh is put back.
struct RefreshGuard<'a> {
  shared: &'a Shared,
  generation: u64,
  restore: Option<UsersState>,
}

impl<'a> RefreshGuard<'a> {
  /// Lock the list unless a later refresh has taken over.
  fn lock_if_current(&self) -> Option<MutexGuard<'a, ListInner>> {
    let inner = self.shared.lock();
    (inner.refresh_gen == self.generation).then_some(inner)
  }

  /// Apply the final transition. Returns false if the refresh was superseded.
  fn finish(mut self, transition: impl FnOnce(&mut ListInner) -> UsersState) -> bool {
    self.restore = None;
    let Some(mut inner) = self.lock_if_current() else {
      debug!("user list refresh superseded, dropping its result");
      return false;
    };
    inner.refreshing = false;
    let state = transition(&mut *inner);
    self.shared.publish(&mut inner, state);
    true
  }
}

impl Drop for RefreshGuard<'_> {
  fn drop(&mut self) {
    let Some(previous) = self.restore.take() else {
      return;
    };
    let Some(mut inner) = self.lock_if_current() else {
      return;
    };
    inner.refreshing = false;
    if inner.state.is_loading() {
      debug!("user list refresh abandoned, restoring previous state");
      self.shared.publish(&mut inner, previous);
    }
  }
}

/// Clears the pagination flag when a page task ends, including on abort.
struct PageGuard {
  shared: Arc<Shared>,
  id: u64,
}

impl Drop for PageGuard {
  fn drop(&mut self) {
    let mut inner = self.shared.lock();
    if inner.owns_pagination(self.id) {
      inner.pending_page = None;
    }
  }
}

/// Keeps a paginated list of users in sync between the remote source and the cache.
///
/// Clones share the same state.
pub struct UserListSync<R, C> {
  remote: Arc<R>,
  cache: Arc<C>,
  page_size: u32,
  shared: Arc<Shared>,
}

impl<R, C> UserListSync<R, C>
where
  R: RemoteSource + 'static,
  C: CacheStore + 'static,
{
  pub fn new(remote: Arc<R>, cache: Arc<C>) -> Self {
    let (state_tx, _) = watch::channel(LoadState::Nothing);

    Self {
      remote,
      cache,
      page_size: DEFAULT_PAGE_SIZE,
      shared: Arc::new(Shared {
        inner: Mutex::new(ListInner {
          state: LoadState::Nothing,
          refreshing: false,
          refresh_gen: 0,
          is_last_page: false,
          pending_page: None,
          next_page_id: 0,
        }),
        state_tx,
      }),
    }
  }

  pub fn with_page_size(mut self, page_size: u32) -> Self {
    self.page_size = page_size.max(1);
    self
  }

  /// Snapshot of the current state.
  pub fn state(&self) -> UsersState {
    self.shared.lock().state.clone()
  }

  /// Receiver that sees every state transition.
  pub fn subscribe(&self) -> watch::Receiver<UsersState> {
    self.shared.state_tx.subscribe()
  }

  pub fn is_paginating(&self) -> bool {
    self.shared.lock().is_paginating()
  }

  /// Whether the remote reported that there are no more pages.
  pub fn is_last_page(&self) -> bool {
    self.shared.lock().is_last_page
  }

  /// Load the first page.
  ///
  /// Without `forced`, this does nothing when data is already loaded or
  /// another refresh is running, and serves the cache when it has anything.
  /// Otherwise the first page is fetched, published, and written to the cache
  /// in place of its contents. A forced refresh also takes over from an
  /// unforced one that is still reading the cache. Any pending page fetch is
  /// cancelled.
  pub async fn refresh(&self, forced: bool) {
    let (guard, previous) = {
      let mut inner = self.shared.lock();

      if !forced && inner.state.data().is_some() {
        return;
      }
      if inner.state.is_loading() || (!forced && inner.refreshing) {
        debug!("user list refresh already in flight");
        return;
      }

      inner.refreshing = true;
      inner.refresh_gen += 1;
      inner.cancel_pagination();
      inner.is_last_page = false;

      let previous = inner.state.clone();
      if forced {
        self
          .shared
          .publish(&mut inner, LoadState::Loading(previous.clone().into_data()));
      }
      let guard = RefreshGuard {
        shared: &self.shared,
        generation: inner.refresh_gen,
        restore: Some(previous.clone()),
      };
      (guard, previous)
    };

    if !forced {
      let cached = self.cache.fetch_all().await;
      {
        let Some(mut inner) = guard.lock_if_current() else {
          debug!("user list cache read superseded by a forced refresh");
          return;
        };
        if cached.is_empty() {
          self
            .shared
            .publish(&mut inner, LoadState::Loading(previous.into_data()));
        }
      }
      if !cached.is_empty() {
        debug!(count = cached.len(), "serving user list from cache");
        let users = dedup_by_id(cached);
        guard.finish(|_| LoadState::Success(users));
        return;
      }
    }

    match self.remote.fetch_page(0, self.page_size).await {
      Ok(page) => {
        let is_last_page = page.is_empty();
        let users = dedup_by_id(page.iter().cloned());
        let applied = guard.finish(|inner| {
          inner.is_last_page = is_last_page;
          LoadState::Success(users)
        });

        if applied {
          self.cache.replace_all(&page).await;
        }
      }
      Err(e) => {
        warn!(error = %e, "failed to refresh user list");
        guard.finish(|_| LoadState::Error);
      }
    }
  }

  /// Fetch the page after `current` if it is the last loaded user.
  ///
  /// Returns the handle of the spawned page fetch, or `None` when nothing was
  /// started: a refresh is running, a page is already being fetched, the end
  /// of the data was reached, or `current` is not the trailing user. Dropping
  /// the handle does not cancel the fetch. Must be called within a Tokio runtime.
  ///
  /// A failed page fetch leaves the state untouched.
  pub fn load_more_if_needed(&self, current: &User) -> Option<JoinHandle<()>> {
    let mut inner = self.shared.lock();

    if inner.refreshing || inner.state.is_loading() || inner.is_paginating() || inner.is_last_page
    {
      return None;
    }
    let last_id = inner.state.data()?.last()?.id;
    if last_id != current.id {
      return None;
    }

    let id = inner.next_page_id;
    inner.next_page_id += 1;

    let guard = PageGuard {
      shared: Arc::clone(&self.shared),
      id,
    };
    let shared = Arc::clone(&self.shared);
    let remote = Arc::clone(&self.remote);
    let cache = Arc::clone(&self.cache);
    let since_id = current.id;
    let page_size = self.page_size;

    debug!(since_id, "loading next page");
    let handle = tokio::spawn(async move {
      let _guard = guard;

      let page = match remote.fetch_page(since_id, page_size).await {
        Ok(page) => page,
        Err(e) => {
          warn!(error = %e, since_id, "failed to load next page");
          return;
        }
      };

      {
        let mut inner = shared.lock();
        if !inner.owns_pagination(id) {
          debug!(since_id, "dropping superseded page");
          return;
        }

        let mut merged = inner.state.data().cloned().unwrap_or_default();
        merged.extend(page.iter().cloned());
        inner.is_last_page = page.is_empty();
        shared.publish(&mut inner, LoadState::Success(dedup_by_id(merged)));
      }

      cache.upsert_many(&page).await;
    });

    inner.pending_page = Some(PendingPage {
      id,
      abort: handle.abort_handle(),
    });

    Some(handle)
  }
}

impl<R, C> Clone for UserListSync<R, C> {
  fn clone(&self) -> Self {
    Self {
      remote: Arc::clone(&self.remote),
      cache: Arc::clone(&self.cache),
      page_size: self.page_size,
      shared: Arc::clone(&self.shared),
    }
  }
}
