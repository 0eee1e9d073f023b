use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use offline_sync_links::metadata::{FileMetadataSource, OfflineMetadataSource};
use offline_sync_links::queue::DEFAULT_BATCH_SIZE;
use offline_sync_links::{
    HtmlRewriter, HttpFileMetadataSource, InMemoryFileStore, RewriterConfig, StoreSnapshot,
    SyncQueue,
};

/// Prepare LMS HTML content for offline viewing.
#[derive(Debug, Parser)]
#[command(name = "offline-links", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rewrite one HTML fragment and print the result as JSON.
    Rewrite {
        /// HTML file to rewrite, or `-` for stdin.
        #[arg(long)]
        html: PathBuf,
        #[command(flatten)]
        shared: SharedArgs,
    },
    /// Rewrite several fragments and print the resulting download batches.
    Queue {
        /// HTML files belonging to the course.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Downloads per batch.
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[command(flatten)]
        shared: SharedArgs,
    },
}

#[derive(Debug, Args)]
struct SharedArgs {
    /// Course id the content belongs to.
    #[arg(long)]
    scope: i64,
    /// JSON snapshot of synced files and sync settings.
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Configuration file. Defaults to discovery in the current directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the API domain.
    #[arg(long)]
    domain: Option<String>,
    /// Override the on-device files directory.
    #[arg(long)]
    files_dir: Option<String>,
    /// Skip metadata requests and use placeholder names.
    #[arg(long)]
    offline: bool,
}

impl SharedArgs {
    fn load_config(&self) -> Result<RewriterConfig> {
        let mut config = match &self.config {
            Some(path) => RewriterConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => RewriterConfig::discover(&std::env::current_dir()?),
        };
        if let Some(domain) = &self.domain {
            config = config.with_api_domain(domain);
        }
        if let Some(dir) = &self.files_dir {
            config = config.with_app_files_dir(dir);
        }
        Ok(config)
    }

    fn load_store(&self) -> Result<InMemoryFileStore> {
        let snapshot = match &self.snapshot {
            Some(path) => StoreSnapshot::load_from_path(path)?,
            None => StoreSnapshot::default(),
        };
        Ok(InMemoryFileStore::from(snapshot))
    }

    fn metadata_source(&self, config: &RewriterConfig) -> Result<Box<dyn FileMetadataSource>> {
        if self.offline {
            return Ok(Box::new(OfflineMetadataSource));
        }
        let source = HttpFileMetadataSource::new(config)
            .context("failed to build metadata client")?;
        Ok(Box::new(source))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Rewrite { html, shared } => rewrite(&html, &shared).await,
        Command::Queue {
            files,
            batch_size,
            shared,
        } => queue(&files, batch_size, &shared).await,
    }
}

async fn rewrite(html_path: &Path, shared: &SharedArgs) -> Result<()> {
    let config = shared.load_config()?;
    let store = shared.load_store()?;
    let metadata = shared.metadata_source(&config)?;
    let rewriter = HtmlRewriter::new(&config, &store, metadata.as_ref());

    let html = read_html(html_path)?;
    let result = rewriter.rewrite(Some(html.as_str()), shared.scope).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn queue(files: &[PathBuf], batch_size: usize, shared: &SharedArgs) -> Result<()> {
    let config = shared.load_config()?;
    let store = shared.load_store()?;
    let metadata = shared.metadata_source(&config)?;
    let rewriter = HtmlRewriter::new(&config, &store, metadata.as_ref());

    let mut queue = SyncQueue::new(shared.scope);
    for path in files {
        let html = read_html(path)?;
        queue.absorb(rewriter.rewrite(Some(html.as_str()), shared.scope).await);
        tracing::info!(file = %path.display(), queued = queue.len(), "processed fragment");
    }

    let batches = queue.download_batches(batch_size);
    println!("{}", serde_json::to_string_pretty(&batches)?);
    Ok(())
}

fn read_html(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read html from stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
