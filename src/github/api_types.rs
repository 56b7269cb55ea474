//! Serde-deserializable types matching GitHub API responses.
//!
//! These types are separate from the domain `User` so that wire quirks
//! (extra keys, nulls, renamed fields) stay out of the sync layer.

use serde::Deserialize;

use crate::model::User;

/// A user as returned by `GET /users` and `GET /users/{login}`.
///
/// The list endpoint omits the profile fields entirely; the detail endpoint
/// sends them, possibly as `null`.
#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub id: u64,
  pub login: String,
  pub avatar_url: Option<String>,
  pub html_url: Option<String>,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub followers: Option<u64>,
  #[serde(default)]
  pub following: Option<u64>,
  #[serde(default)]
  pub bio: Option<String>,
  #[serde(default)]
  pub blog: Option<String>,
}

impl ApiUser {
  pub fn into_user(self) -> User {
    User {
      id: self.id,
      login: self.login,
      avatar_url: self.avatar_url,
      html_url: self.html_url,
      location: self.location,
      followers: self.followers,
      following: self.following,
      bio: self.bio,
      blog: self.blog,
    }
  }
}
