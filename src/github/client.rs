use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::api_types::ApiUser;
use crate::config::GitHubConfig;
use crate::model::User;
use crate::remote::{RemoteFailure, RemoteSource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// GitHub REST API client
#[derive(Clone)]
pub struct GitHubClient {
  http: reqwest::Client,
  base_url: Url,
}

impl GitHubClient {
  pub fn new(config: &GitHubConfig, token: Option<&str>) -> Result<Self> {
    let base_url = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid GitHub API url {}: {}", config.url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Invalid GitHub API url {}: not a base url", config.url));
    }

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    if let Some(token) = token {
      let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| eyre!("Invalid GitHub token: {}", e))?;
      value.set_sensitive(true);
      headers.insert(AUTHORIZATION, value);
    }

    let http = reqwest::Client::builder()
      .user_agent(&config.user_agent)
      .default_headers(headers)
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// Build `{base}/{segments...}`, percent-encoding each segment.
  fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteFailure> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|()| RemoteFailure::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteFailure> {
    debug!(%url, "GET");

    let response = self.http.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(RemoteFailure::Status {
        status,
        url: url.to_string(),
      });
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
  }
}

impl RemoteSource for GitHubClient {
  async fn fetch_page(&self, since_id: u64, per_page: u32) -> Result<Vec<User>, RemoteFailure> {
    let mut url = self.endpoint(&["users"])?;
    url
      .query_pairs_mut()
      .append_pair("since", &since_id.to_string())
      .append_pair("per_page", &per_page.to_string());

    let users: Vec<ApiUser> = self.get_json(url).await?;
    Ok(users.into_iter().map(ApiUser::into_user).collect())
  }

  async fn fetch_detail(&self, login: &str) -> Result<User, RemoteFailure> {
    let url = self.endpoint(&["users", login])?;

    let user: ApiUser = self.get_json(url).await?;
    Ok(user.into_user())
  }
}
