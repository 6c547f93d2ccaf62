//! Page plan: the per-chapter page counts of a job, resolved up front.
//!
//! Knowing the total before any image is fetched lets progress be reported
//! against a fixed denominator. Building the plan costs one page-list call per
//! chapter.

use tracing::debug;

use crate::{
    client::ContentClient,
    error::{Error, Result},
    types::ChapterRef,
};

/// Page count of one chapter in a [`PagePlan`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterPlan {
    pub chapter: ChapterRef,
    pub pages: usize,
}

/// Total and per-chapter page counts for an ordered list of chapters.
///
/// The total always equals the sum of the per-chapter counts. A plan is built
/// once per job and read-only afterwards.
///
/// # Examples
///
/// ```rust
/// use mangapack::plan::{ChapterPlan, PagePlan};
/// use mangapack::types::ChapterRef;
///
/// let chapter = ChapterRef { hid: "c1".into(), number: Some(1.0), title: None };
/// let plan = PagePlan::from_counts(vec![ChapterPlan { chapter, pages: 18 }]);
///
/// assert_eq!(plan.total(), 18);
/// assert_eq!(plan.pages_for("c1"), Some(18));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    chapters: Vec<ChapterPlan>,
    total: usize,
}

impl PagePlan {
    /// Resolves the page count of every chapter, in order.
    ///
    /// Pages without an image key still count; they are skipped later by the
    /// fetcher.
    ///
    /// # Errors
    ///
    /// * [`Error::Remote`] - If any page list cannot be fetched
    pub async fn build(client: &dyn ContentClient, chapters: &[ChapterRef]) -> Result<Self> {
        let mut counts = Vec::with_capacity(chapters.len());

        for chapter in chapters {
            let pages = client.list_pages(&chapter.hid).await?.len();
            debug!(chapter = %chapter.hid, pages, "Planned chapter");
            counts.push(ChapterPlan {
                chapter: chapter.clone(),
                pages,
            });
        }

        Ok(Self::from_counts(counts))
    }

    /// Creates a plan from already known counts.
    pub fn from_counts(chapters: Vec<ChapterPlan>) -> Self {
        let total = chapters.iter().map(|c| c.pages).sum();
        Self { chapters, total }
    }

    /// Fails with [`Error::EmptyPlan`] when the plan holds no pages.
    pub fn ensure_pages(self) -> Result<Self> {
        if self.total == 0 {
            Err(Error::EmptyPlan)
        } else {
            Ok(self)
        }
    }

    /// Total number of pages across all chapters.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether the plan holds no pages at all.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Per-chapter counts, in download order.
    pub fn chapters(&self) -> &[ChapterPlan] {
        &self.chapters
    }

    /// Page count of the chapter with handle `hid`.
    pub fn pages_for(&self, hid: &str) -> Option<usize> {
        self.chapters
            .iter()
            .find(|c| c.chapter.hid == hid)
            .map(|c| c.pages)
    }
}
