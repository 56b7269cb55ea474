//! Cache-first sync of a single user's profile.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::lock;
use crate::cache::CacheStore;
use crate::load_state::LoadState;
use crate::model::User;
use crate::remote::RemoteSource;

type DetailState = LoadState<User>;

struct DetailInner {
  state: DetailState,
  refreshing: bool,
  generation: u64,
}

/// Keeps the detailed profile of one user in sync.
///
/// A cached user only satisfies a non-forced refresh if it carries profile
/// details; summaries stored by the list sync are re-fetched.
pub struct UserDetailSync<R, C> {
  login: String,
  remote: Arc<R>,
  cache: Arc<C>,
  inner: Mutex<DetailInner>,
  state_tx: watch::Sender<DetailState>,
}

impl<R, C> UserDetailSync<R, C>
where
  R: RemoteSource,
  C: CacheStore,
{
  pub fn new(login: impl Into<String>, remote: Arc<R>, cache: Arc<C>) -> Self {
    let (state_tx, _) = watch::channel(LoadState::Nothing);

    Self {
      login: login.into(),
      remote,
      cache,
      inner: Mutex::new(DetailInner {
        state: LoadState::Nothing,
        refreshing: false,
        generation: 0,
      }),
      state_tx,
    }
  }

  pub fn login(&self) -> &str {
    &self.login
  }

  pub fn state(&self) -> DetailState {
    self.lock().state.clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<DetailState> {
    self.state_tx.subscribe()
  }

  fn lock(&self) -> MutexGuard<'_, DetailInner> {
    lock(&self.inner)
  }

  fn publish(&self, inner: &mut DetailInner, state: DetailState) {
    debug!(login = %self.login, from = inner.state.label(), to = state.label(), "user detail state");
    inner.state = state;
    self.state_tx.send_replace(inner.state.clone());
  }

  /// Load the profile.
  ///
  /// Without `forced`, this does nothing when a profile is already loaded or
  /// another refresh is running, and serves a detailed cached user when there
  /// is one. Otherwise the profile is fetched, published, and written back
  /// over the cached user. A forced refresh also takes over from an unforced
  /// one that is still reading the cache.
  pub async fn refresh(&self, forced: bool) {
    let (guard, previous) = {
      let mut inner = self.lock();

      if !forced && inner.state.data().is_some() {
        return;
      }
      if inner.state.is_loading() || (!forced && inner.refreshing) {
        debug!(login = %self.login, "user detail refresh already in flight");
        return;
      }

      inner.refreshing = true;
      inner.generation += 1;

      let previous = inner.state.clone();
      if forced {
        self.publish(&mut inner, LoadState::Loading(previous.clone().into_data()));
      }
      let guard = RefreshGuard {
        sync: self,
        generation: inner.generation,
        restore: Some(previous.clone()),
      };
      (guard, previous)
    };

    if !forced {
      let cached = self
        .cache
        .fetch_one(&self.login)
        .await
        .filter(User::is_detailed);
      {
        let Some(mut inner) = guard.lock_if_current() else {
          debug!(login = %self.login, "user detail cache read superseded by a forced refresh");
          return;
        };
        if cached.is_none() {
          self.publish(&mut inner, LoadState::Loading(previous.into_data()));
        }
      }
      if let Some(user) = cached {
        debug!(login = %self.login, "serving user detail from cache");
        guard.finish(LoadState::Success(user));
        return;
      }
    }

    match self.remote.fetch_detail(&self.login).await {
      Ok(user) => {
        if guard.finish(LoadState::Success(user.clone())) {
          self.cache.update_one(&user).await;
        }
      }
      Err(e) => {
        warn!(error = %e, login = %self.login, "failed to refresh user detail");
        guard.finish(LoadState::Error);
      }
    }
  }
}

/// Releases the refresh flag when a refresh ends.
///
/// A refresh superseded by a later forced refresh leaves the state alone. If
/// the refresh future is dropped while the state is still `Loading`, the state
/// from before the refresh is put back.
struct RefreshGuard<'a, R, C>
where
  R: RemoteSource,
  C: CacheStore,
{
  sync: &'a UserDetailSync<R, C>,
  generation: u64,
  restore: Option<DetailState>,
}

impl<'a, R, C> RefreshGuard<'a, R, C>
where
  R: RemoteSource,
  C: CacheStore,
{
  /// Lock the profile unless a later refresh has taken over.
  fn lock_if_current(&self) -> Option<MutexGuard<'a, DetailInner>> {
    let inner = self.sync.lock();
    (inner.generation == self.generation).then_some(inner)
  }

  /// Publish the final state. Returns false if the refresh was superseded.
  fn finish(mut self, state: DetailState) -> bool {
    self.restore = None;
    let Some(mut inner) = self.lock_if_current() else {
      debug!(login = %self.sync.login, "user detail refresh superseded, dropping its result");
      return false;
    };
    inner.refreshing = false;
    self.sync.publish(&mut inner, state);
    true
  }
}

impl<R, C> Drop for RefreshGuard<'_, R, C>
where
  R: RemoteSource,
  C: CacheStore,
{
  fn drop(&mut self) {
    let Some(previous) = self.restore.take() else {
      return;
    };
    let Some(mut inner) = self.lock_if_current() else {
      return;
    };
    inner.refreshing = false;
    if inner.state.is_loading() {
      debug!(login = %self.sync.login, "user detail refresh abandoned, restoring previous state");
      self.sync.publish(&mut inner, previous);
    }
  }
}
