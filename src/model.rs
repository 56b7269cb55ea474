//! The GitHub user record shared by the cache, the remote client and the sync layer.

use std::collections::HashSet;

/// A GitHub user.
///
/// The list endpoint only fills the summary fields (`id`, `login`, `avatar_url`,
/// `html_url`). The detail endpoint also fills the profile fields, which is what
/// [`User::is_detailed`] checks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub id: u64,
  pub login: String,
  pub avatar_url: Option<String>,
  pub html_url: Option<String>,

  // Profile fields, only present on detail responses
  pub location: Option<String>,
  pub followers: Option<u64>,
  pub following: Option<u64>,
  pub bio: Option<String>,
  pub blog: Option<String>,
}

impl User {
  /// A summary user with only `id` and `login` set.
  pub fn summary(id: u64, login: impl Into<String>) -> Self {
    Self {
      id,
      login: login.into(),
      avatar_url: None,
      html_url: None,
      location: None,
      followers: None,
      following: None,
      bio: None,
      blog: None,
    }
  }

  /// Whether this record carries profile details.
  ///
  /// True when at least one profile field is present and, for text fields,
  /// non-empty. A cached user that is not detailed is not enough to satisfy a
  /// detail view and has to be fetched again.
  pub fn is_detailed(&self) -> bool {
    let has_text = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());

    has_text(&self.location)
      || self.followers.is_some()
      || self.following.is_some()
      || has_text(&self.bio)
      || has_text(&self.blog)
  }
}

/// Remove users with a repeated `id`, keeping the first occurrence and the
/// original order.
pub fn dedup_by_id<I>(users: I) -> Vec<User>
where
  I: IntoIterator<Item = User>,
{
  let mut seen = HashSet::new();
  users.into_iter().filter(|u| seen.insert(u.id)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn ids(users: &[User]) -> Vec<u64> {
    users.iter().map(|u| u.id).collect()
  }

  #[test]
  fn test_dedup_keeps_first_occurrence_order() {
    let input = vec![
      User::summary(3, "c"),
      User::summary(1, "a"),
      User::summary(3, "c-again"),
      User::summary(2, "b"),
      User::summary(1, "a-again"),
    ];

    let deduped = dedup_by_id(input);

    assert_eq!(ids(&deduped), vec![3, 1, 2]);
    assert_eq!(deduped[0].login, "c");
    assert_eq!(deduped[1].login, "a");
  }

  #[test]
  fn test_dedup_is_idempotent() {
    let input: Vec<User> = [5, 5, 4, 9, 4, 1, 9]
      .into_iter()
      .map(|id| User::summary(id, format!("user{id}")))
      .collect();

    let once = dedup_by_id(input);
    let twice = dedup_by_id(once.clone());

    assert_eq!(once, twice);
  }

  #[test]
  fn test_dedup_empty() {
    assert!(dedup_by_id(Vec::new()).is_empty());
  }

  #[test]
  fn test_summary_is_not_detailed() {
    assert!(!User::summary(1, "octocat").is_detailed());
  }

  #[test]
  fn test_any_profile_field_makes_detailed() {
    let mut user = User::summary(1, "octocat");
    user.followers = Some(0);
    assert!(user.is_detailed());

    let mut user = User::summary(1, "octocat");
    user.bio = Some("hello".to_string());
    assert!(user.is_detailed());
  }

  #[test]
  fn test_empty_text_fields_are_not_details() {
    let mut user = User::summary(1, "octocat");
    user.blog = Some(String::new());
    user.location = Some(String::new());
    assert!(!user.is_detailed());
  }
}
