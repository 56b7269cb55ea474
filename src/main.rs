use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use ghsync::cache::{CacheStore, MemoryStore, SqliteStore};
use ghsync::config::Config;
use ghsync::github::GitHubClient;
use ghsync::sync::{UserDetailSync, UserListSync};
use ghsync::{logging, LoadState, User};

#[derive(Parser, Debug)]
#[command(name = "ghsync")]
#[command(about = "Browse GitHub users through a local cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ghsync/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Log debug output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Keep the cache in memory for this run only
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List users, served from the cache when it has any
  List {
    /// Ignore the cache and fetch the first page again
    #[arg(short, long)]
    refresh: bool,

    /// Extra pages to load after the first one
    #[arg(short, long, default_value_t = 0)]
    pages: u32,
  },
  /// Show user profiles
  Show {
    #[arg(required = true)]
    logins: Vec<String>,

    /// Ignore cached profiles
    #[arg(short, long)]
    refresh: bool,
  },
  /// Delete every cached user
  ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log, args.verbose)?;

  let token = Config::api_token();
  let remote = Arc::new(GitHubClient::new(&config.github, token.as_deref())?);

  if args.ephemeral {
    run(args.command, &config, remote, Arc::new(MemoryStore::new())).await
  } else {
    let cache = match &config.cache.path {
      Some(path) => SqliteStore::open(path)?,
      None => SqliteStore::open_default()?,
    };
    run(args.command, &config, remote, Arc::new(cache)).await
  }
}

async fn run<C>(
  command: Command,
  config: &Config,
  remote: Arc<GitHubClient>,
  cache: Arc<C>,
) -> Result<()>
where
  C: CacheStore + 'static,
{
  match command {
    Command::List { refresh, pages } => {
      let sync = UserListSync::new(remote, cache).with_page_size(config.github.per_page);
      list_users(&sync, refresh, pages).await
    }
    Command::Show { logins, refresh } => show_users(&logins, refresh, remote, cache).await,
    Command::ClearCache => {
      cache.clear().await;
      info!("cache cleared");
      Ok(())
    }
  }
}

async fn list_users<C>(
  sync: &UserListSync<GitHubClient, C>,
  refresh: bool,
  pages: u32,
) -> Result<()>
where
  C: CacheStore + 'static,
{
  sync.refresh(refresh).await;

  for _ in 0..pages {
    let Some(users) = sync.state().into_data() else {
      break;
    };
    let Some(last) = users.last() else {
      break;
    };
    let Some(handle) = sync.load_more_if_needed(last) else {
      break;
    };
    handle
      .await
      .map_err(|e| eyre!("Page fetch task failed: {}", e))?;

    // A failed page leaves the list as it was
    let loaded = sync.state().data().map_or(0, Vec::len);
    if sync.is_last_page() || loaded == users.len() {
      break;
    }
  }

  match sync.state() {
    LoadState::Success(users) => {
      for user in &users {
        println!("{:>10}  {}", user.id, user.login);
      }
      info!(count = users.len(), "listed users");
      Ok(())
    }
    state => Err(eyre!("Failed to load users (state: {})", state.label())),
  }
}

async fn show_users<C>(
  logins: &[String],
  refresh: bool,
  remote: Arc<GitHubClient>,
  cache: Arc<C>,
) -> Result<()>
where
  C: CacheStore + 'static,
{
  let syncs: Vec<_> = logins
    .iter()
    .map(|login| UserDetailSync::new(login.as_str(), Arc::clone(&remote), Arc::clone(&cache)))
    .collect();

  futures::future::join_all(syncs.iter().map(|sync| sync.refresh(refresh))).await;

  let mut failed = Vec::new();
  for sync in &syncs {
    match sync.state() {
      LoadState::Success(user) => print_profile(&user),
      _ => failed.push(sync.login().to_string()),
    }
  }

  if failed.is_empty() {
    Ok(())
  } else {
    Err(eyre!("Failed to load profiles: {}", failed.join(", ")))
  }
}

fn print_profile(user: &User) {
  println!("{} (#{})", user.login, user.id);

  let fields = [
    ("url", user.html_url.clone()),
    ("location", user.location.clone()),
    ("blog", user.blog.clone()),
    ("bio", user.bio.clone()),
    ("followers", user.followers.map(|n| n.to_string())),
    ("following", user.following.map(|n| n.to_string())),
  ];
  for (label, value) in fields {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
      println!("  {:<10} {}", format!("{label}:"), value);
    }
  }
  println!();
}
