//! Orchestration between the remote source and the local cache.
//!
//! Each sync object owns one observable [`LoadState`](crate::load_state::LoadState)
//! and decides, per request, whether to serve the cache, hit the remote, or
//! do nothing because an equivalent request is already in flight.
//!
//! Guards and the state transitions they protect run under a `std::sync::Mutex`
//! that is released before any `.await`. Of N concurrent callers, exactly one
//! passes the guard and the rest return immediately.

mod detail;
mod list;

pub use detail::UserDetailSync;
pub use list::UserListSync;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Guard sections only flip flags and swap the state value, so a panic inside
// one cannot leave the data inconsistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
