//! Core data types for titles, chapters, pages and pipeline artifacts.
//!
//! This module defines the data structures that flow through a download job:
//!
//! - [`Manga`] - A title returned by search
//! - [`ChapterRef`] - A chapter handle with its human-readable number
//! - [`PageRef`] - A page of a chapter, referenced by an opaque image key
//! - [`ChapterSelection`] - Which chapters a job downloads and how it is named
//! - [`FetchedPage`] - A page image persisted in the scratch area
//! - [`SealedPart`] - A finished container ready for the output sink
//!
//! # Examples
//!
//! ```rust
//! use mangapack::types::{ChapterRef, ChapterSelection};
//!
//! let chapter = ChapterRef {
//!     hid: "abc123".to_string(),
//!     number: Some(12.5),
//!     title: Some("The Storm".to_string()),
//! };
//!
//! assert_eq!(chapter.display_label(), "Ch. 12.5: The Storm");
//!
//! let selection = ChapterSelection::Single(chapter);
//! assert_eq!(selection.archive_title("One Piece"), "One Piece_Ch_12.5");
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// A title returned by the content API search.
///
/// # Fields
///
/// * `hid` - Opaque handle used by the API for chapter listing
/// * `title` - Main title
/// * `slug` - URL slug of the title, when the API provides one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manga {
    /// Opaque API handle
    pub hid: String,

    /// Main title
    #[serde(default)]
    pub title: String,

    /// URL slug
    #[serde(default)]
    pub slug: Option<String>,
}

/// A single chapter of a title.
///
/// The chapter number can be fractional (`5.5`) and may be absent entirely,
/// in which case the chapter sorts as `0` and renders as `N/A`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRef {
    /// Opaque API handle of the chapter
    pub hid: String,

    /// Chapter number, if the API provided a numeric one
    pub number: Option<f64>,

    /// Chapter title
    pub title: Option<String>,
}

impl ChapterRef {
    /// Returns the chapter number as text, or `N/A` when it is unknown.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mangapack::types::ChapterRef;
    ///
    /// let whole = ChapterRef { hid: "a".into(), number: Some(3.0), title: None };
    /// let missing = ChapterRef { hid: "b".into(), number: None, title: None };
    ///
    /// assert_eq!(whole.number_label(), "3");
    /// assert_eq!(missing.number_label(), "N/A");
    /// ```
    pub fn number_label(&self) -> String {
        match self.number {
            Some(number) => number.to_string(),
            None => "N/A".to_string(),
        }
    }

    /// Returns the label shown to users: `Ch. <number>[: <title>]`.
    pub fn display_label(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => {
                format!("Ch. {}: {}", self.number_label(), title)
            }
            _ => format!("Ch. {}", self.number_label()),
        }
    }

    /// Sort key used for chapter ordering; unknown numbers sort as `0`.
    pub fn sort_key(&self) -> f64 {
        self.number.unwrap_or(0.0)
    }
}

/// A page of a chapter.
///
/// A page whose `key` is missing or empty cannot be downloaded and is skipped
/// by the fetcher rather than failing the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    /// Handle of the chapter this page belongs to
    pub chapter_hid: String,

    /// Opaque remote image key
    pub key: Option<String>,
}

impl PageRef {
    /// Returns the image key if it is present and non-empty.
    pub fn valid_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|key| !key.trim().is_empty())
    }
}

/// The chapters a job downloads.
///
/// The selection decides both the chapter order and the archive naming mode:
/// a single chapter is packed under a bare title unless it has to be split,
/// while a multi-chapter job always numbers its parts.
#[derive(Debug, Clone, PartialEq)]
pub enum ChapterSelection {
    /// Every chapter of the title, in the given order
    All(Vec<ChapterRef>),

    /// One chapter
    Single(ChapterRef),
}

impl ChapterSelection {
    /// Returns the chapters to download, in download order.
    pub fn chapters(&self) -> &[ChapterRef] {
        match self {
            ChapterSelection::All(chapters) => chapters,
            ChapterSelection::Single(chapter) => std::slice::from_ref(chapter),
        }
    }

    /// Whether this is a single-chapter job.
    pub fn is_single(&self) -> bool {
        matches!(self, ChapterSelection::Single(_))
    }

    /// Derives the archive title for a job over `manga_title`.
    ///
    /// Single chapters get a `_Ch_<number>` suffix; full downloads use the
    /// title unchanged.
    pub fn archive_title(&self, manga_title: &str) -> String {
        match self {
            ChapterSelection::All(_) => manga_title.to_string(),
            ChapterSelection::Single(chapter) => {
                format!("{}_Ch_{}", manga_title, chapter.number_label())
            }
        }
    }
}

/// A page image written to the scratch area.
///
/// `index` is the global sequence number across all chapters of the job,
/// starting at 1, so sorting scratch files by name yields reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Global sequence number (1-based)
    pub index: usize,

    /// Location of the page in the scratch area
    pub path: PathBuf,
}

impl FetchedPage {
    /// Name of the page inside a container.
    pub fn entry_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.index.to_string())
    }
}

/// A sealed container ready to be handed to an [`ArchiveSink`](crate::archive::ArchiveSink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPart {
    /// Part number (1-based, increments once per sealed container)
    pub number: usize,

    /// Output file name, including the extension
    pub file_name: String,

    /// Location of the sealed container in the staging directory
    pub path: PathBuf,

    /// Range of fetched pages (0-based positions) held by this part
    pub pages: Range<usize>,

    /// Serialized size in bytes
    pub size: u64,
}

impl SealedPart {
    /// Number of pages in the part.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
