//! Progress events and the single-message status surface.
//!
//! The pipeline never touches a UI. It emits [`ProgressEvent`]s into a channel;
//! a [`StatusRenderer`] consumes that stream and edits one status message in
//! place through a [`StatusSurface`]. On a terminal event the renderer either
//! deletes the status and posts a permanent completion notice, or leaves the
//! error text in the status and posts a follow-up notice.
//!
//! # Examples
//!
//! ```rust
//! use mangapack::progress::{PageProgress, ProgressEvent, render_status};
//!
//! let event = ProgressEvent::PageFetched(PageProgress {
//!     chapter_label: "Ch. 3".to_string(),
//!     page_in_chapter: 5,
//!     chapter_pages: 20,
//!     global_page: 45,
//!     global_total: 90,
//! });
//!
//! let text = render_status(&event).unwrap();
//! assert!(text.contains("Ch. 3 (5/20 pages, 25%)"));
//! assert!(text.contains("Overall: 45/90 pages, 50%"));
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Integer percentage of `done` over `total`, rounded down. Zero totals give 0.
pub fn percent(done: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        done.saturating_mul(100) / total
    }
}

/// Progress of the sequential fetcher after one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgress {
    /// Display label of the current chapter
    pub chapter_label: String,
    /// 1-based position of the page within its chapter
    pub page_in_chapter: usize,
    /// Number of pages in the current chapter
    pub chapter_pages: usize,
    /// 1-based position of the page within the whole job
    pub global_page: usize,
    /// Number of pages in the whole job
    pub global_total: usize,
}

impl PageProgress {
    /// Percentage of the current chapter processed.
    pub fn chapter_percent(&self) -> usize {
        percent(self.page_in_chapter, self.chapter_pages)
    }

    /// Percentage of the whole job processed.
    pub fn overall_percent(&self) -> usize {
        percent(self.global_page, self.global_total)
    }
}

/// A meaningful step of a download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// One page was processed (written or skipped)
    PageFetched(PageProgress),

    /// A container is being filled; `placed` pages of `total` are already sealed
    Packing {
        part_name: String,
        placed: usize,
        total: usize,
    },

    /// A sealed container is being handed to the output sink
    Uploading { part_name: String },

    /// The job delivered every part
    Completed {
        title: String,
        parts: usize,
        single_chapter: bool,
    },

    /// The job failed; `status` replaces the status text, `notice` is posted after it
    Failed { status: String, notice: String },
}

impl ProgressEvent {
    /// Builds the terminal failure event for a job error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mangapack::Error;
    /// use mangapack::progress::ProgressEvent;
    ///
    /// let event = ProgressEvent::failed(&Error::EmptyPlan);
    /// assert!(matches!(
    ///     event,
    ///     ProgressEvent::Failed { ref status, .. } if status == "Could not get page counts. Aborting."
    /// ));
    /// ```
    pub fn failed(error: &Error) -> Self {
        let (status, notice) = match error {
            Error::EmptyPlan => (
                "Could not get page counts. Aborting.".to_string(),
                "Error retrieving page information. Please try again or start a new search."
                    .to_string(),
            ),
            Error::NoPagesFetched { .. } => (
                "Could not download any images. Aborting.".to_string(),
                "No pages could be downloaded for this chapter/manga. \
                 Please try again or start a new search."
                    .to_string(),
            ),
            other => (
                format!("An unexpected error occurred: {}", other),
                "Please try again or start a new search.".to_string(),
            ),
        };
        ProgressEvent::Failed { status, notice }
    }

    /// Whether this event ends the job's status stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Completed { .. } | ProgressEvent::Failed { .. }
        )
    }
}

/// Renders the in-place status text for an event.
///
/// Returns `None` for [`ProgressEvent::Completed`], whose status message is
/// deleted instead of edited.
pub fn render_status(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::PageFetched(p) => Some(format!(
            "Downloading {} ({}/{} pages, {}%)\nOverall: {}/{} pages, {}%",
            p.chapter_label,
            p.page_in_chapter,
            p.chapter_pages,
            p.chapter_percent(),
            p.global_page,
            p.global_total,
            p.overall_percent()
        )),
        ProgressEvent::Packing {
            part_name,
            placed,
            total,
        } => Some(format!(
            "Creating archive: {}... ({}%)",
            part_name,
            percent(*placed, *total)
        )),
        ProgressEvent::Uploading { part_name } => Some(format!("Uploading: {}...", part_name)),
        ProgressEvent::Completed { .. } => None,
        ProgressEvent::Failed { status, .. } => Some(status.clone()),
    }
}

/// Builds the permanent completion notice.
///
/// The part count is mentioned when more than one part was sent, or when a
/// multi-chapter job sent a single part.
///
/// # Examples
///
/// ```rust
/// use mangapack::progress::completion_notice;
///
/// assert!(completion_notice("Title_Ch_1", 1, true).starts_with(
///     "Your download of 'Title_Ch_1' is complete!\n"
/// ));
/// assert!(completion_notice("Title", 1, false).contains("(1 parts sent)."));
/// assert!(completion_notice("Title_Ch_1", 2, true).contains("(2 parts sent)."));
/// ```
pub fn completion_notice(title: &str, parts: usize, single_chapter: bool) -> String {
    let mut notice = format!("Your download of '{}' is complete!", title);
    if parts > 1 || (!single_chapter && parts == 1) {
        notice.push_str(&format!(" ({} parts sent).", parts));
    }
    notice.push_str("\n\nTo search for another manga, start a new search.");
    notice
}

/// Identifies the status message of one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusTarget {
    /// Chat or session the job belongs to
    pub session_id: String,
    /// Identifier of the editable status message
    pub message_id: String,
}

/// Host-provided surface holding one editable status message per job.
///
/// A chat host maps these calls onto message edits, deletes and sends; a
/// terminal host redraws a status line.
#[async_trait]
pub trait StatusSurface: Send + Sync {
    /// Replaces the text of the status message.
    async fn edit_status(&self, target: &StatusTarget, text: &str) -> Result<()>;

    /// Removes the status message.
    async fn delete_status(&self, target: &StatusTarget) -> Result<()>;

    /// Posts a permanent notice to the session.
    async fn post_notice(&self, session_id: &str, text: &str) -> Result<()>;
}

/// Sending half of a job's progress stream.
///
/// Emitting never fails; events sent after the renderer stopped are dropped.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    /// Sends an event to the renderer.
    pub fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            debug!("Progress receiver closed, dropping event");
        }
    }
}

/// Creates a progress stream.
pub fn channel() -> (ProgressSender, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, rx)
}

/// Consumes a progress stream and drives a [`StatusSurface`].
///
/// Surface failures are logged and never stop the renderer or the job.
pub struct StatusRenderer {
    surface: Arc<dyn StatusSurface>,
    target: StatusTarget,
}

impl StatusRenderer {
    /// Creates a renderer for the status message `target`.
    pub fn new(surface: Arc<dyn StatusSurface>, target: StatusTarget) -> Self {
        Self { surface, target }
    }

    /// Renders events until the stream closes.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<ProgressEvent>) {
        while let Some(event) = events.recv().await {
            self.apply(&event).await;
        }
    }

    /// Applies a single event to the surface.
    pub async fn apply(&self, event: &ProgressEvent) {
        if let Some(text) = render_status(event) {
            if let Err(e) = self.surface.edit_status(&self.target, &text).await {
                warn!(session = %self.target.session_id, error = %e, "Failed to edit status");
            }
        }

        let notice = match event {
            ProgressEvent::Completed {
                title,
                parts,
                single_chapter,
            } => {
                if let Err(e) = self.surface.delete_status(&self.target).await {
                    warn!(session = %self.target.session_id, error = %e, "Failed to delete status");
                }
                Some(completion_notice(title, *parts, *single_chapter))
            }
            ProgressEvent::Failed { notice, .. } => Some(notice.clone()),
            _ => None,
        };

        if let Some(notice) = notice {
            if let Err(e) = self
                .surface
                .post_notice(&self.target.session_id, &notice)
                .await
            {
                warn!(session = %self.target.session_id, error = %e, "Failed to post notice");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds_down() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn test_render_packing_and_upload() {
        let packing = ProgressEvent::Packing {
            part_name: "Title_Part_2.cbz".to_string(),
            placed: 50,
            total: 200,
        };
        assert_eq!(
            render_status(&packing).unwrap(),
            "Creating archive: Title_Part_2.cbz... (25%)"
        );

        let uploading = ProgressEvent::Uploading {
            part_name: "Title_Part_2.cbz".to_string(),
        };
        assert_eq!(
            render_status(&uploading).unwrap(),
            "Uploading: Title_Part_2.cbz..."
        );
    }

    #[test]
    fn test_completed_has_no_status_text() {
        let event = ProgressEvent::Completed {
            title: "T".to_string(),
            parts: 1,
            single_chapter: true,
        };
        assert!(event.is_terminal());
        assert_eq!(render_status(&event), None);
        assert!(!completion_notice("T", 1, true).contains("parts sent"));
    }

    #[test]
    fn test_failed_from_remote_error() {
        let err = Error::remote(crate::error::RemoteOperation::Image, "timed out");
        match ProgressEvent::failed(&err) {
            ProgressEvent::Failed { status, notice } => {
                assert!(status.starts_with("An unexpected error occurred:"));
                assert!(status.contains("timed out"));
                assert!(notice.contains("try again"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sender_survives_closed_receiver() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit(ProgressEvent::Uploading {
            part_name: "x".to_string(),
        });
    }
}
