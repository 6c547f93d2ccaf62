//! # mangapack - Bulk manga downloads packed into size-bounded CBZ archives
//!
//! mangapack downloads any number of chapters of a title from a manga content
//! API, writes every page into a scratch area, and packs the pages, in reading
//! order, into one or more CBZ archives that each stay under a size ceiling
//! (typically a chat platform's upload limit).
//!
//! ## Features
//!
//! - **Content Client**: Search, chapter listing, page listing and image
//!   downloads behind the [`ContentClient`] trait
//! - **Page Planning**: Page counts resolved up front for accurate progress
//! - **Sequential Fetching**: One request in flight, globally ordered scratch files
//! - **Size-Bounded Packing**: Containers split before they exceed the ceiling
//! - **Single Status Message**: Progress streamed to one editable status surface
//! - **Guaranteed Cleanup**: Scratch data removed on every exit path
//! - **Per-Session Jobs**: One running job per session, sessions isolated on disk
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mangapack::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(surface: Arc<dyn StatusSurface>) -> mangapack::Result<()> {
//! let client = Arc::new(ComickClient::new(ClientConfig::default())?);
//!
//! let manga = client.search("one piece").await?.remove(0);
//! let chapters = client.list_chapters(&manga.hid, "en").await?;
//! let selection = ChapterSelection::Single(chapters[0].clone());
//!
//! let pipeline = Pipeline::new(
//!     client,
//!     Arc::new(DirectorySink::new("./downloads")),
//!     surface,
//!     PipelineConfig::default(),
//! );
//!
//! let report = pipeline
//!     .run(JobRequest::new("local", "status", &manga.title, selection))
//!     .await?;
//! println!("{} pages in {} part(s)", report.pages, report.parts.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`client`]: The content client trait and the Comick implementation
//! - [`plan`]: Per-chapter page counts for a job
//! - [`fetch`]: The sequential page fetcher
//! - [`archive`]: Size-bounded container packing and output sinks
//! - [`progress`]: Progress events and the status surface
//! - [`job`]: Pipeline orchestration, cleanup and the session registry
//! - [`config`], [`error`], [`naming`], [`net`], [`types`]: Supporting pieces

pub mod archive;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod job;
pub mod naming;
pub mod net;
pub mod plan;
pub mod progress;
pub mod types;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use mangapack::prelude::*;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.size_ceiling, 48 * 1024 * 1024);
/// ```
pub mod prelude {
    pub use crate::{
        archive::{ArchivePacker, ArchiveSink, DirectorySink},
        client::{ComickClient, ContentClient},
        config::{ClientConfig, PageFailurePolicy, PipelineConfig},
        job::{JobRegistry, JobReport, JobRequest, Pipeline},
        progress::{ProgressEvent, StatusSurface, StatusTarget},
        types::{ChapterRef, ChapterSelection, Manga, PageRef, SealedPart},
    };
}

// Re-export main types at crate root for direct access
pub use client::{ComickClient, ContentClient};
pub use error::{Error, Result};
pub use job::{JobRegistry, JobRequest, Pipeline};
pub use types::{ChapterRef, ChapterSelection, Manga, PageRef};
