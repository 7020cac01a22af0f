//! Command-line surface and wiring.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use patchbay_catalog::CatalogStore;
use patchbay_fetch::{Fetcher, HttpClient, ReqwestClient, RetryPolicy, Timeouts};
use patchbay_update::{BatchOptions, Updater, check_for_updates};

use crate::config::{self, Config};
use crate::paths::{Mode, resolve_base, resolve_target};

/// Embedded build version, compared against the version service.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const VERSION_URL: &str = "https://content.patchbay.app/down/version.json";

/// Catalog endpoint, shipped obfuscated; see `patchbay_catalog::reveal`.
const CATALOG_KEY: &str = "Patchbay_Online_List_Key_2yV#x@7";
const CATALOG_ENDPOINT: &str = "OBUAExtYTlY8IAAYDAARcTwIBxc3KQQAcVMJJgwbIUMxDRsERwsVHDI8QAYaAQs=";

/// How long to keep running after launching the replacer, so it finds a
/// parent that is about to release its file lock.
const HANDOFF_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "patchbay", version, about = "Keeps game content and the loader itself up to date")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List content files that are missing or stale.
    Check {
        #[arg(long, value_enum, default_value = "plus")]
        mode: Mode,
        /// Base install directory override for this run.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Download and install everything that is stale.
    Apply {
        #[arg(long, value_enum, default_value = "plus")]
        mode: Mode,
        #[arg(long)]
        path: Option<PathBuf>,
        /// How many downloads may run at once.
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Install one catalog item into the content tree.
    Install {
        #[arg(long, value_enum, default_value = "plus")]
        mode: Mode,
        category: String,
        slug: String,
    },
    /// Remove an installed catalog item.
    Uninstall {
        #[arg(long, value_enum, default_value = "plus")]
        mode: Mode,
        category: String,
        slug: String,
    },
    /// List the catalog items in one category.
    Items { category: String },
    /// Update the loader binary itself.
    SelfUpdate,
    /// Show or change the configured base directory.
    Config {
        /// New base install directory; omit to print the current one.
        #[arg(long)]
        set_base: Option<String>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config_path = config::config_path()?;
    let config = config::load(&config_path);

    match cli.command {
        Command::Check { mode, path } => check(&config, mode, path.as_deref()).await,
        Command::Apply {
            mode,
            path,
            concurrency,
        } => apply(&config, mode, path.as_deref(), concurrency).await,
        Command::Install {
            mode,
            category,
            slug,
        } => install(&config, mode, &category, &slug).await,
        Command::Uninstall {
            mode,
            category,
            slug,
        } => uninstall(&config, mode, &category, &slug).await,
        Command::Items { category } => items(&category).await,
        Command::SelfUpdate => self_update().await,
        Command::Config { set_base } => configure(&config_path, config, set_base),
    }
}

/// Cancellation for long-running commands: Ctrl-C fires the token, the
/// pipelines wind down, and the partial report still comes back.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight downloads");
            handle.cancel();
        }
    });
    token
}

fn client() -> Result<ReqwestClient> {
    Ok(ReqwestClient::new(Timeouts::default())?)
}

async fn check(config: &Config, mode: Mode, path: Option<&std::path::Path>) -> Result<()> {
    let base = resolve_base(config, path)?;
    let batch = check_for_updates(&client()?, mode.manifest_url(), &base).await?;

    if batch.is_empty() {
        println!("all content is up to date");
        return Ok(());
    }

    println!("{} file(s) need updating:", batch.len());
    for item in &batch {
        println!("  {}  ({} bytes)", item.relative_path, item.size_expected);
    }
    Ok(())
}

async fn apply(
    config: &Config,
    mode: Mode,
    path: Option<&std::path::Path>,
    concurrency: usize,
) -> Result<()> {
    let base = resolve_base(config, path)?;
    let batch = check_for_updates(&client()?, mode.manifest_url(), &base).await?;

    if batch.is_empty() {
        println!("all content is up to date");
        return Ok(());
    }

    println!("updating {} file(s)...", batch.len());
    let updater = Updater::new(
        Fetcher::new(client()?, RetryPolicy::default()),
        BatchOptions { concurrency },
    );
    let report = updater.apply(batch, &cancel_on_ctrl_c()).await;

    for path in &report.updated {
        println!("  updated {path}");
    }
    for failure in &report.failed {
        eprintln!("  failed  {}: {}", failure.path, failure.error);
    }

    if report.permission_denied {
        eprintln!("some writes were blocked by the OS; re-run with elevated privileges");
    }
    if !report.is_all_ok() {
        bail!("{} update(s) failed", report.failed.len());
    }
    println!("{} file(s) updated", report.updated.len());
    Ok(())
}

async fn load_catalog<C: HttpClient>(client: &C) -> Result<CatalogStore> {
    let url = patchbay_catalog::reveal(CATALOG_ENDPOINT, CATALOG_KEY)?;
    let body = client
        .get_bytes(&url)
        .await
        .map_err(anyhow::Error::new)
        .context("cannot download the item catalog")?;
    let store = CatalogStore::from_json(&body)?;
    tracing::debug!(items = store.len(), "catalog loaded");
    Ok(store)
}

async fn items(category: &str) -> Result<()> {
    let http = client()?;
    let store = load_catalog(&http).await?;
    let items = store
        .category(category)
        .with_context(|| format!("no category '{category}' in the catalog"))?;

    for item in items {
        println!("{:24} {}", item.slug, item.name);
    }
    Ok(())
}

async fn install(config: &Config, mode: Mode, category: &str, slug: &str) -> Result<()> {
    let http = client()?;
    let store = load_catalog(&http).await?;
    let item = store
        .find(category, slug)
        .with_context(|| format!("no item '{slug}' in category '{category}'"))?;

    let base = resolve_base(config, None)?;
    let target = resolve_target(mode, &base);

    let updater = Updater::new(
        Fetcher::new(client()?, RetryPolicy::default()),
        BatchOptions::default(),
    );
    let written = updater
        .install_item(item, &target, &cancel_on_ctrl_c())
        .await?;

    println!("installed {} ({} bytes)", item.name, written);
    Ok(())
}

async fn uninstall(config: &Config, mode: Mode, category: &str, slug: &str) -> Result<()> {
    let http = client()?;
    let store = load_catalog(&http).await?;
    let item = store
        .find(category, slug)
        .with_context(|| format!("no item '{slug}' in category '{category}'"))?;

    let base = resolve_base(config, None)?;
    let target = resolve_target(mode, &base);

    let updater = Updater::new(
        Fetcher::new(client()?, RetryPolicy::default()),
        BatchOptions::default(),
    );
    updater.uninstall_item(item, &target).await?;

    println!("removed {}", item.name);
    Ok(())
}

async fn self_update() -> Result<()> {
    let check = patchbay_selfupdate::check(&client()?, VERSION_URL, APP_VERSION).await?;
    if !check.update_available {
        println!("already current ({})", check.current_version);
        return Ok(());
    }
    let latest = check
        .latest
        .context("version service offered an update without a descriptor")?;

    println!(
        "updating {} -> {}: {}",
        check.current_version, latest.version, latest.notes
    );

    let fetcher = Fetcher::new(client()?, RetryPolicy::default());
    let current_exe = std::env::current_exe().context("cannot locate the running executable")?;
    patchbay_selfupdate::apply(&fetcher, &latest, &current_exe, &cancel_on_ctrl_c()).await?;

    // The replacer takes over from here; it waits for this process to
    // release its file lock before swapping the binaries.
    println!("update handed off, restarting...");
    tokio::time::sleep(HANDOFF_GRACE).await;
    std::process::exit(0);
}

fn configure(
    config_path: &std::path::Path,
    mut config: Config,
    set_base: Option<String>,
) -> Result<()> {
    match set_base {
        Some(base) => {
            if !std::path::Path::new(&base).is_dir() {
                bail!("{base} is not a directory");
            }
            config.custom_base_path = base;
            config::save(config_path, &config)?;
            println!("base directory set to {}", config.custom_base_path);
        }
        None => {
            if config.custom_base_path.is_empty() {
                println!("base directory: <platform default>");
            } else {
                println!("base directory: {}", config.custom_base_path);
            }
        }
    }
    Ok(())
}
