//! Download jobs: pipeline orchestration, cleanup and the per-session registry.
//!
//! A job runs strictly in sequence: build the page plan, fetch every page into
//! the session's scratch area, then pack and deliver containers one at a time.
//! Progress is streamed to a [`StatusRenderer`] running beside the job.
//!
//! Whatever the outcome, the scratch area and any stray containers are
//! removed when the job ends. Cleanup lives in a drop guard, so it also runs
//! when the job future is dropped mid-flight or its task panics.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mangapack::archive::DirectorySink;
//! use mangapack::client::{ComickClient, ContentClient};
//! use mangapack::config::{ClientConfig, PipelineConfig};
//! use mangapack::job::{JobRegistry, JobRequest, Pipeline};
//! use mangapack::progress::{StatusSurface, StatusTarget};
//! use mangapack::types::ChapterSelection;
//! use std::sync::Arc;
//!
//! # async fn example(surface: Arc<dyn StatusSurface>) -> mangapack::Result<()> {
//! let client = Arc::new(ComickClient::new(ClientConfig::default())?);
//! let manga = client.search("frieren").await?.remove(0);
//! let chapters = client.list_chapters(&manga.hid, "en").await?;
//!
//! let pipeline = Pipeline::new(
//!     client,
//!     Arc::new(DirectorySink::new("./out")),
//!     surface,
//!     PipelineConfig::default(),
//! );
//! let registry = JobRegistry::new(pipeline);
//!
//! let request = JobRequest::new("chat-42", "msg-7", &manga.title, ChapterSelection::All(chapters));
//! let report = registry.submit(request)?.await??;
//! println!("sent {} parts", report.parts.len());
//! # Ok(())
//! # }
//! ```

use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    archive::{ArchivePacker, ArchiveSink},
    client::ContentClient,
    config::PipelineConfig,
    error::{Error, Result},
    fetch::SequentialFetcher,
    naming::{is_stray_container, sanitize_title},
    plan::PagePlan,
    progress::{self, ProgressEvent, ProgressSender, StatusRenderer, StatusSurface, StatusTarget},
    types::{ChapterRef, ChapterSelection, SealedPart},
};

/// A request to download chapters for one session.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Chat or session the job belongs to
    pub session_id: String,
    /// Identifier of the status message the job edits
    pub status_message_id: String,
    /// Archive title, before sanitization
    pub title: String,
    /// Chapters to download
    pub selection: ChapterSelection,
}

impl JobRequest {
    /// Creates a request whose archive title is derived from `manga_title`
    /// and the selection (see [`ChapterSelection::archive_title`]).
    pub fn new(
        session_id: impl Into<String>,
        status_message_id: impl Into<String>,
        manga_title: &str,
        selection: ChapterSelection,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            status_message_id: status_message_id.into(),
            title: selection.archive_title(manga_title),
            selection,
        }
    }
}

/// Everything one job execution owns.
#[derive(Debug, Clone)]
pub struct JobState {
    pub status: StatusTarget,
    pub chapters: Vec<ChapterRef>,
    pub title: String,
    pub sanitized_title: String,
    pub single_chapter: bool,
    /// Where fetched pages are written
    pub scratch_dir: PathBuf,
    /// Where containers are staged before delivery
    pub staging_dir: PathBuf,
}

impl JobState {
    /// Lays out the job's directories under `work_dir/<session>`.
    pub fn new(request: JobRequest, config: &PipelineConfig) -> Self {
        let staging_dir = config.work_dir.join(session_dir_name(&request.session_id));
        Self {
            status: StatusTarget {
                session_id: request.session_id,
                message_id: request.status_message_id,
            },
            chapters: request.selection.chapters().to_vec(),
            sanitized_title: sanitize_title(&request.title),
            title: request.title,
            single_chapter: request.selection.is_single(),
            scratch_dir: staging_dir.join("pages"),
            staging_dir,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.status.session_id
    }
}

/// Directory name for a session; anything outside `[A-Za-z0-9_-]` becomes `_`.
fn session_dir_name(session_id: &str) -> String {
    let name: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("session_{}", name)
}

/// Outcome of a successful job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub title: String,
    /// Pages written to the scratch area
    pub pages: usize,
    /// Delivered parts, in part order
    pub parts: Vec<SealedPart>,
}

/// Removes a job's scratch area and stray containers when dropped.
struct CleanupGuard {
    scratch_dir: PathBuf,
    staging_dir: PathBuf,
    sanitized_title: String,
    extension: String,
}

impl CleanupGuard {
    fn new(state: &JobState, extension: &str) -> Self {
        Self {
            scratch_dir: state.scratch_dir.clone(),
            staging_dir: state.staging_dir.clone(),
            sanitized_title: state.sanitized_title.clone(),
            extension: extension.to_string(),
        }
    }

    fn sweep(&self) {
        if self.scratch_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.scratch_dir) {
                warn!(dir = %self.scratch_dir.display(), error = %e, "Failed to remove scratch directory");
            }
        }

        let Ok(entries) = std::fs::read_dir(&self.staging_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if is_stray_container(&name, &self.sanitized_title, &self.extension) {
                debug!(file = %name, "Removing stray container");
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    warn!(file = %name, error = %e, "Failed to remove stray container");
                }
            }
        }

        // Only succeeds once the staging directory is empty.
        let _ = std::fs::remove_dir(&self.staging_dir);
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.sweep();
    }
}

/// The fetch-then-pack download pipeline with its collaborators.
pub struct Pipeline {
    client: Arc<dyn ContentClient>,
    sink: Arc<dyn ArchiveSink>,
    surface: Arc<dyn StatusSurface>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        client: Arc<dyn ContentClient>,
        sink: Arc<dyn ArchiveSink>,
        surface: Arc<dyn StatusSurface>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            sink,
            surface,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one job to completion.
    ///
    /// The terminal outcome is reported once on the status surface: on
    /// success the status message is deleted and a completion notice posted;
    /// on failure the status shows the error and a follow-up notice is posted.
    /// Cleanup runs after the status surface has been updated.
    ///
    /// # Errors
    ///
    /// * [`Error::EmptyPlan`] - The chapters have no pages
    /// * [`Error::NoPagesFetched`] - No page could be fetched
    /// * [`Error::Remote`] - A listing failed, or an image failed under the abort policy
    /// * [`Error::Io`] / [`Error::Archive`] / [`Error::Join`] - Local failures
    /// * Any error returned by the archive sink
    pub async fn run(&self, request: JobRequest) -> Result<JobReport> {
        let state = JobState::new(request, &self.config);
        let _cleanup = CleanupGuard::new(&state, &self.config.archive_extension);

        let (progress, events) = progress::channel();
        let renderer = StatusRenderer::new(Arc::clone(&self.surface), state.status.clone());
        let renderer = tokio::spawn(renderer.run(events));

        info!(
            session = %state.session_id(),
            title = %state.title,
            chapters = state.chapters.len(),
            "Starting download job"
        );

        let result = self.execute(&state, &progress).await;
        match &result {
            Ok(report) => {
                info!(
                    session = %state.session_id(),
                    pages = report.pages,
                    parts = report.parts.len(),
                    "Download job complete"
                );
                progress.emit(ProgressEvent::Completed {
                    title: state.title.clone(),
                    parts: report.parts.len(),
                    single_chapter: state.single_chapter,
                });
            }
            Err(e) => {
                error!(session = %state.session_id(), error = %e, "Download job failed");
                progress.emit(ProgressEvent::failed(e));
            }
        }

        drop(progress);
        if let Err(e) = renderer.await {
            warn!(session = %state.session_id(), error = %e, "Status renderer stopped abnormally");
        }

        result
    }

    async fn execute(&self, state: &JobState, progress: &ProgressSender) -> Result<JobReport> {
        let plan = PagePlan::build(self.client.as_ref(), &state.chapters)
            .await?
            .ensure_pages()?;
        debug!(session = %state.session_id(), total = plan.total(), "Page plan ready");

        if state.scratch_dir.exists() {
            tokio::fs::remove_dir_all(&state.scratch_dir).await?;
        }

        let pages = SequentialFetcher::new(self.client.as_ref(), &state.scratch_dir, progress)
            .with_policy(self.config.page_failure_policy)
            .fetch(&plan)
            .await?;

        let parts = ArchivePacker::new(
            &state.title,
            &state.staging_dir,
            self.config.size_ceiling,
            progress,
        )
        .single_chapter(state.single_chapter)
        .extension(self.config.archive_extension.as_str())
        .pack(&pages, self.sink.as_ref())
        .await?;

        Ok(JobReport {
            title: state.title.clone(),
            pages: pages.len(),
            parts,
        })
    }
}

/// Releases a session's registry slot when its job ends.
struct SessionSlot {
    active: Arc<Mutex<HashSet<String>>>,
    session: String,
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.active.lock().remove(&self.session);
    }
}

/// Runs jobs in the background, at most one per session.
///
/// Jobs for different sessions run concurrently. A job submitted for a
/// session that already has one running is rejected with
/// [`Error::JobInProgress`]; the session frees up as soon as its job ends,
/// whatever the outcome.
#[derive(Clone)]
pub struct JobRegistry {
    pipeline: Arc<Pipeline>,
    active: Arc<Mutex<HashSet<String>>>,
}

impl JobRegistry {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Spawns a job on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// * [`Error::JobInProgress`] - The session already has a running job
    pub fn submit(&self, request: JobRequest) -> Result<JoinHandle<Result<JobReport>>> {
        let session = request.session_id.clone();
        if !self.active.lock().insert(session.clone()) {
            warn!(%session, "Rejecting job, session busy");
            return Err(Error::JobInProgress { session });
        }

        let slot = SessionSlot {
            active: Arc::clone(&self.active),
            session,
        };
        let pipeline = Arc::clone(&self.pipeline);

        Ok(tokio::spawn(async move {
            let _slot = slot;
            pipeline.run(request).await
        }))
    }

    /// Whether `session_id` currently has a running job.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.active.lock().contains(session_id)
    }

    /// Number of running jobs.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}
