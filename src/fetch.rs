//! Sequential page fetcher.
//!
//! Walks a [`PagePlan`] chapter by chapter and page by page, downloads every
//! image through the [`ContentClient`] and writes it into the scratch area.
//! One request is in flight at a time; the global sequence number of a page is
//! assigned when its file is written, so scratch file names sort in reading
//! order across chapter boundaries.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    client::ContentClient,
    config::PageFailurePolicy,
    error::{Error, Result},
    naming::{DEFAULT_IMAGE_EXTENSION, extract_extension, page_file_name},
    plan::PagePlan,
    progress::{PageProgress, ProgressEvent, ProgressSender},
    types::FetchedPage,
};

/// Downloads every page of a plan into a scratch directory.
///
/// # Examples
///
/// ```rust,no_run
/// use mangapack::client::{ComickClient, ContentClient};
/// use mangapack::config::{ClientConfig, PageFailurePolicy};
/// use mangapack::fetch::SequentialFetcher;
/// use mangapack::plan::PagePlan;
/// use mangapack::progress;
/// use std::path::Path;
///
/// # async fn example() -> mangapack::Result<()> {
/// let client = ComickClient::new(ClientConfig::default())?;
/// let chapters = client.list_chapters("comic-hid", "en").await?;
/// let plan = PagePlan::build(&client, &chapters[..1]).await?.ensure_pages()?;
///
/// let (progress, _events) = progress::channel();
/// let fetcher = SequentialFetcher::new(&client, Path::new("./scratch"), &progress)
///     .with_policy(PageFailurePolicy::Skip);
/// let pages = fetcher.fetch(&plan).await?;
/// println!("{} pages on disk", pages.len());
/// # Ok(())
/// # }
/// ```
pub struct SequentialFetcher<'a> {
    client: &'a dyn ContentClient,
    scratch_dir: &'a Path,
    progress: &'a ProgressSender,
    policy: PageFailurePolicy,
}

impl<'a> SequentialFetcher<'a> {
    /// Creates a fetcher writing into `scratch_dir`, aborting on failed downloads.
    pub fn new(
        client: &'a dyn ContentClient,
        scratch_dir: &'a Path,
        progress: &'a ProgressSender,
    ) -> Self {
        Self {
            client,
            scratch_dir,
            progress,
            policy: PageFailurePolicy::default(),
        }
    }

    /// Sets the policy for pages whose download fails.
    pub fn with_policy(mut self, policy: PageFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetches every page of `plan`, in order.
    ///
    /// The chapter's page list is re-resolved before each page so that an
    /// expired image link from the planning pass is never used. Pages whose
    /// key is missing (or that disappeared from the re-resolved list) are
    /// skipped. A progress event is emitted after every page, skipped or not.
    ///
    /// # Errors
    ///
    /// * [`Error::Remote`] - If a page list cannot be re-resolved, or an image
    ///   download fails under [`PageFailurePolicy::Abort`]
    /// * [`Error::Io`] - If the scratch area cannot be written
    /// * [`Error::NoPagesFetched`] - If no page ended up on disk
    pub async fn fetch(&self, plan: &PagePlan) -> Result<Vec<FetchedPage>> {
        fs::create_dir_all(self.scratch_dir).await?;

        let total = plan.total();
        let mut fetched = Vec::with_capacity(total);
        let mut processed = 0;

        for entry in plan.chapters() {
            let label = entry.chapter.display_label();

            for position in 0..entry.pages {
                processed += 1;

                let pages = self.client.list_pages(&entry.chapter.hid).await?;
                match pages.get(position).and_then(|page| page.valid_key()) {
                    Some(key) => {
                        let index = fetched.len() + 1;
                        if let Some(page) =
                            self.fetch_one(key, &entry.chapter.hid, index, total).await?
                        {
                            fetched.push(page);
                        }
                    }
                    None => {
                        debug!(
                            chapter = %entry.chapter.hid,
                            position,
                            "Skipping page without image key"
                        );
                    }
                }

                self.progress.emit(ProgressEvent::PageFetched(PageProgress {
                    chapter_label: label.clone(),
                    page_in_chapter: position + 1,
                    chapter_pages: entry.pages,
                    global_page: processed,
                    global_total: total,
                }));
            }
        }

        if fetched.is_empty() {
            return Err(Error::NoPagesFetched { planned: total });
        }

        debug!(fetched = fetched.len(), planned = total, "Fetch pass finished");
        Ok(fetched)
    }

    /// Downloads one image and writes it as global page `index`.
    ///
    /// Returns `Ok(None)` when the download failed and the policy skips it.
    async fn fetch_one(
        &self,
        key: &str,
        chapter_hid: &str,
        index: usize,
        total: usize,
    ) -> Result<Option<FetchedPage>> {
        let bytes = match self.client.fetch_image(key).await {
            Ok(bytes) => bytes,
            Err(e) if self.policy == PageFailurePolicy::Skip => {
                warn!(chapter = %chapter_hid, %key, error = %e, "Skipping page that failed to download");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let ext = extract_extension(key).unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string());
        let path = self.scratch_dir.join(page_file_name(index, total, &ext));
        fs::write(&path, &bytes).await?;

        Ok(Some(FetchedPage {
            index,
            path,
        }))
    }
}
