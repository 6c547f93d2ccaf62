//! Terminal front end: search a title, pick chapters, download them as CBZ parts.
//!
//! ```bash
//! mangapack "blue period"                    # list results and chapters
//! mangapack "blue period" --chapter 12       # one chapter
//! mangapack "blue period" --pick 2 --all     # every chapter of the 2nd result
//! ```

use async_trait::async_trait;
use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mangapack::archive::DirectorySink;
use mangapack::config::{ClientConfigBuilder, PageFailurePolicy, PipelineConfigBuilder};
use mangapack::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "mangapack", version, about = "Download manga chapters as size-bounded CBZ archives")]
struct Args {
    /// Title to search for
    query: String,

    /// Which search result to use (1-based)
    #[arg(long, default_value_t = 1)]
    pick: usize,

    /// Download a single chapter, by number (e.g. 12 or 12.5) or handle
    #[arg(long, conflicts_with = "all")]
    chapter: Option<String>,

    /// Download every chapter
    #[arg(long)]
    all: bool,

    /// Directory the archives are saved to (defaults to the download directory)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Working directory for scratch pages
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Maximum size of one archive, in MiB
    #[arg(long, default_value_t = 48)]
    ceiling_mib: u64,

    /// Chapter language (defaults to the client's language, `en`)
    #[arg(long)]
    lang: Option<String>,

    /// Skip pages whose image fails to download instead of aborting
    #[arg(long)]
    skip_failed_pages: bool,
}

/// Status surface drawing a single status line on stderr.
struct TerminalStatus;

#[async_trait]
impl StatusSurface for TerminalStatus {
    async fn edit_status(&self, _target: &StatusTarget, text: &str) -> mangapack::Result<()> {
        let mut stderr = std::io::stderr().lock();
        write!(stderr, "\r\x1b[2K{}", text.replace('\n', " | "))?;
        stderr.flush()?;
        Ok(())
    }

    async fn delete_status(&self, _target: &StatusTarget) -> mangapack::Result<()> {
        let mut stderr = std::io::stderr().lock();
        write!(stderr, "\r\x1b[2K")?;
        stderr.flush()?;
        Ok(())
    }

    async fn post_notice(&self, _session_id: &str, text: &str) -> mangapack::Result<()> {
        eprintln!();
        println!("{}", text);
        Ok(())
    }
}

fn print_chapters(manga: &Manga, chapters: &[ChapterRef]) {
    println!("{} ({} chapters)", manga.title, chapters.len());
    for chapter in chapters {
        println!("  {}", chapter.display_label());
    }
    println!("\nUse --chapter <number> or --all to download.");
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut client_config = ClientConfigBuilder::default();
    if let Some(lang) = &args.lang {
        client_config.language(lang.as_str());
    }
    let client_config = client_config.build()?;
    let client = Arc::new(ComickClient::new(client_config)?);

    let results = client.search(&args.query).await?;
    if results.is_empty() {
        return Err(eyre!("Nothing found for {:?}", args.query));
    }
    for (i, manga) in results.iter().enumerate() {
        println!("{}. {}", i + 1, manga.title);
    }
    let manga = args
        .pick
        .checked_sub(1)
        .and_then(|i| results.get(i))
        .ok_or_else(|| eyre!("--pick must be between 1 and {}", results.len()))?
        .clone();

    let chapters = client
        .list_chapters(&manga.hid, &client.config().language)
        .await?;
    if chapters.is_empty() {
        return Err(eyre!("{:?} has no downloadable chapters", manga.title));
    }

    let selection = match (&args.chapter, args.all) {
        (Some(wanted), _) => {
            let chapter = chapters
                .iter()
                .find(|c| &c.number_label() == wanted || &c.hid == wanted)
                .ok_or_else(|| eyre!("No chapter {} in {:?}", wanted, manga.title))?;
            ChapterSelection::Single(chapter.clone())
        }
        (None, true) => ChapterSelection::All(chapters),
        (None, false) => {
            print_chapters(&manga, &chapters);
            return Ok(());
        }
    };

    let out_dir = args
        .out
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let work_dir = args
        .work_dir
        .unwrap_or_else(|| std::env::temp_dir().join("mangapack"));
    let policy = if args.skip_failed_pages {
        PageFailurePolicy::Skip
    } else {
        PageFailurePolicy::Abort
    };

    let pipeline_config = PipelineConfigBuilder::default()
        .size_ceiling(args.ceiling_mib.saturating_mul(1024 * 1024))
        .work_dir(work_dir)
        .page_failure_policy(policy)
        .build()?;

    let pipeline = Pipeline::new(
        client,
        Arc::new(DirectorySink::new(out_dir.clone())),
        Arc::new(TerminalStatus),
        pipeline_config,
    );

    let session = format!("local-{}", std::process::id());
    let request = JobRequest::new(session, "status", &manga.title, selection);

    tokio::select! {
        result = pipeline.run(request) => {
            let report = result?;
            println!(
                "Saved {} part(s), {} pages, to {}",
                report.parts.len(),
                report.pages,
                out_dir.display()
            );
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted.");
        }
    }

    Ok(())
}
