//! lineage binary.
//!
//! Reads `lineage.toml` (or the path given with `--config`) plus `LINEAGE_*`
//! environment variables, reconciles one tree from the upstream, saves the
//! result in the SQLite store and prints a summary.
//!
//! Nested engine settings can be set from the environment with a double
//! underscore, e.g. `LINEAGE_ENGINE__WORKERS=8`.

mod http;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::Parser;
use lineage_core::{report::FailureReport, tree::ReconciledTree};
use lineage_engine::{CatalogParams, EngineConfig, Reconciler};
use lineage_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::http::{HttpConfig, HttpUpstream};

#[derive(Parser)]
#[command(author, version, about = "Reconcile a family tree from its upstream")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "lineage.toml")]
  config: PathBuf,

  /// Tree to reconcile; overrides `tree_id` from the configuration.
  #[arg(long)]
  tree: Option<String>,

  /// Continue from the catalog of the most recent saved run.
  #[arg(long)]
  resume: bool,

  /// Catalog page size for this run.
  #[arg(long)]
  page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Settings {
  #[serde(default = "default_base_url")]
  base_url:       String,
  #[serde(default)]
  tree_id:        String,
  #[serde(default)]
  session_cookie: String,
  #[serde(default = "default_store_path")]
  store_path:     PathBuf,
  #[serde(default = "default_media_dir")]
  media_dir:      PathBuf,
  #[serde(default)]
  engine:         EngineConfig,
}

fn default_base_url() -> String { "https://www.ancestry.com".into() }

fn default_store_path() -> PathBuf { "~/.local/share/lineage/lineage.db".into() }

fn default_media_dir() -> PathBuf { "~/.local/share/lineage/media".into() }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration: file, then environment, then flags.
  let settings: Settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(
      config::Environment::with_prefix("LINEAGE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .set_override_option("tree_id", cli.tree.clone())
    .context("invalid --tree override")?
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise settings")?;

  if settings.tree_id.is_empty() {
    bail!("no tree configured; set `tree_id` or pass --tree");
  }

  let store_path = expand_tilde(&settings.store_path);
  let media_dir = expand_tilde(&settings.media_dir);
  if let Some(parent) = store_path.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path, media_dir)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let mut params = if cli.resume {
    match store.latest_snapshot().await.context("failed to load last run")? {
      Some(last) => {
        info!(run_id = %last.tree.run_id, "resuming catalog of previous run");
        CatalogParams::resume(last.tree.catalog)
      }
      None => {
        info!("no previous run; starting fresh");
        CatalogParams::default()
      }
    }
  } else {
    CatalogParams::default()
  };
  if let Some(page_size) = cli.page_size {
    params.page_size = Some(page_size);
  }

  let upstream = HttpUpstream::new(HttpConfig {
    base_url:       settings.base_url.clone(),
    tree_id:        settings.tree_id.clone(),
    session_cookie: settings.session_cookie.clone(),
  })?;

  let reconciler = Reconciler::new(upstream, store.clone(), settings.engine.clone())
    .context("invalid engine configuration")?;

  // Ctrl-C stops new work; units already running finish.
  let cancel = reconciler.cancellation_token();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received; finishing in-flight work");
      cancel.cancel();
    }
  });

  info!(tree_id = %settings.tree_id, "reconciling");
  let (tree, report) = reconciler
    .reconcile(params)
    .await
    .context("reconciliation failed")?;

  store
    .save_snapshot(&tree, &report)
    .await
    .context("failed to save snapshot")?;

  print_summary(&tree, &report);
  Ok(())
}

fn print_summary(tree: &ReconciledTree, report: &FailureReport) {
  let stats = &tree.stats;
  println!("run {}", tree.run_id);
  println!("  catalog total      {}", stats.catalog_total);
  println!("  persons            {}", stats.persons);
  println!("  edges              {}", stats.edges);
  println!("  citations          {}", stats.citations);
  println!("  assets downloaded  {}", stats.assets_downloaded);
  println!("  assets reused      {}", stats.assets_reused);
  println!("  inferred events    {}", stats.inferred_events);

  if report.is_clean() {
    println!("no failures");
    return;
  }

  if report.cancelled {
    println!("run was cancelled before completing");
  }
  println!("{} failure(s):", report.failures.len());
  for failure in &report.failures {
    let subject = serde_json::to_string(&failure.subject)
      .unwrap_or_else(|_| format!("{:?}", failure.subject));
    println!(
      "  [{}] {} {}: {}",
      failure.stage, failure.kind, subject, failure.reason
    );
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
