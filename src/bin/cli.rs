//! glowfic-dl CLI
//!
//! Downloads a post, board section or board and writes the assembled book.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use glowfic_dl::{
    error::{AppError, FailureKind, Result},
    models::{BookAssembler, Config, JsonAssembler, Manuscript},
    pipeline::{FetchContext, Pipeline, RunOutcome},
    storage::{LocalCache, PostCache},
    utils::{credentials::SessionCookie, fs::sanitize_filename},
};
use tokio_util::sync::CancellationToken;

/// glowfic-dl - Glowfic post, section and board downloader
#[derive(Parser, Debug)]
#[command(name = "glowfic-dl", version, about = "Download Glowfic posts into a book")]
struct Cli {
    /// URL of a post, board section or board
    #[arg(required_unless_present = "list_cache")]
    url: Option<String>,

    /// Path to the configuration file
    #[arg(short, long, default_value = "glowfic-dl.toml")]
    config: PathBuf,

    /// File holding the session cookie, needed for private posts
    #[arg(long, default_value = "cookie")]
    cookie_file: PathBuf,

    /// Cache directory (overrides the configuration)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Output file (default: derived from the book title)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum posts fetched at once (overrides the configuration)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Refetch posts even when cached
    #[arg(long)]
    refresh: bool,

    /// List cached post ids and exit
    #[arg(long)]
    list_cache: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::load_or_default(&cli.config);
    if let Some(dir) = &cli.cache_dir {
        config.cache.dir = dir.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.fetch.max_concurrent = concurrency;
    }
    if cli.refresh {
        config.fetch.refresh = true;
    }
    config
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            if e.kind() == FailureKind::Forbidden {
                eprintln!("Access denied; put a session cookie in the cookie file.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli);

    if cli.list_cache {
        let cache = LocalCache::new(&config.cache.dir);
        for id in cache.ids().await? {
            println!("{id}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let url = cli
        .url
        .as_deref()
        .ok_or_else(|| AppError::config("no URL given"))?;

    let cookie = SessionCookie::load(&cli.cookie_file)?;
    if cookie.is_none() {
        log::info!(
            "No cookie at {}; only public posts are available",
            cli.cookie_file.display()
        );
    }

    let cancel = CancellationToken::new();
    let ctx = FetchContext::from_config(Arc::new(config), cookie.as_ref())?
        .with_cancel(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; finishing posts already in flight");
            cancel.cancel();
        }
    });

    let outcome = Pipeline::new(ctx).run(url).await?;
    report_omissions(&outcome);

    if outcome.is_total_failure() {
        log::error!("Every post of {} failed", outcome.target);
        return Ok(ExitCode::FAILURE);
    }
    if outcome.posts.is_empty() {
        log::warn!("Nothing to write");
        return Ok(ExitCode::SUCCESS);
    }

    let manuscript = outcome.manuscript();
    let path = write_book(&manuscript, cli.output.as_deref()).await?;
    log::info!(
        "Wrote {} ({} chapters by {})",
        path.display(),
        manuscript.chapters.len(),
        manuscript.authors().join(", ")
    );
    Ok(ExitCode::SUCCESS)
}

fn report_omissions(outcome: &RunOutcome) {
    if outcome.failures.is_empty() {
        return;
    }
    eprintln!(
        "{} of {} posts omitted:",
        outcome.failures.len(),
        outcome.failures.len() + outcome.posts.len()
    );
    for failure in &outcome.failures {
        eprintln!("  post {} ({}): {}", failure.post_id, failure.kind, failure.message);
    }
}

async fn write_book(manuscript: &Manuscript, output: Option<&Path>) -> Result<PathBuf> {
    let assembler = JsonAssembler;
    let bytes = assembler.assemble(manuscript)?;

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(sanitize_filename(&format!(
            "{}.{}",
            manuscript.title,
            assembler.format().extension()
        ))?),
    };
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}
