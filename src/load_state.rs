//! Lifecycle of a value that is fetched asynchronously.
//!
//! `LoadState<T>` is what the sync layer publishes to its observers. Each
//! variant is a complete description of what a view can show:
//!
//! ```ignore
//! match sync.state() {
//!     LoadState::Nothing => {}
//!     LoadState::Loading(Some(stale)) => render_dimmed(&stale),
//!     LoadState::Loading(None) => render_spinner(),
//!     LoadState::Success(users) => render(&users),
//!     LoadState::Error => render_retry(),
//! }
//! ```

/// The state of a loadable value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState<T> {
  /// No load has been attempted yet
  #[default]
  Nothing,
  /// A load is in flight, carrying the last known value if there was one
  Loading(Option<T>),
  /// The last load succeeded
  Success(T),
  /// The last load failed. Previous data is not carried over.
  Error,
}

impl<T> LoadState<T> {
  pub fn nothing() -> Self {
    LoadState::Nothing
  }

  pub fn loading(previous: Option<T>) -> Self {
    LoadState::Loading(previous)
  }

  pub fn success(value: T) -> Self {
    LoadState::Success(value)
  }

  pub fn error() -> Self {
    LoadState::Error
  }

  /// The payload of a `Loading` or `Success` state.
  pub fn data(&self) -> Option<&T> {
    match self {
      LoadState::Success(data) => Some(data),
      LoadState::Loading(data) => data.as_ref(),
      LoadState::Nothing | LoadState::Error => None,
    }
  }

  pub fn into_data(self) -> Option<T> {
    match self {
      LoadState::Success(data) => Some(data),
      LoadState::Loading(data) => data,
      LoadState::Nothing | LoadState::Error => None,
    }
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, LoadState::Loading(_))
  }

  pub fn is_success(&self) -> bool {
    matches!(self, LoadState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, LoadState::Error)
  }

  /// Short name of the variant, used in log lines.
  pub fn label(&self) -> &'static str {
    match self {
      LoadState::Nothing => "nothing",
      LoadState::Loading(_) => "loading",
      LoadState::Success(_) => "success",
      LoadState::Error => "error",
    }
  }
}
