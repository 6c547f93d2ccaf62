//! Error types and result handling for mangapack operations.
//!
//! This module defines the error handling system used throughout the crate.
//! All operations return a [`Result<T>`] which is a type alias for
//! `std::result::Result<T, Error>`.
//!
//! # Error Categories
//!
//! - **Remote Errors**: Any failure talking to the content API or the image CDN
//! - **Plan Errors**: A job whose chapters resolve to zero pages
//! - **Fetch Errors**: A job where no page could be written to the scratch area
//! - **Job Errors**: A second job submitted for a busy session
//! - **Archive / IO Errors**: Container writing and scratch file operations
//!
//! # Examples
//!
//! ```rust
//! use mangapack::error::{Error, RemoteOperation};
//!
//! fn describe(err: &Error) -> &'static str {
//!     match err {
//!         Error::Remote { operation: RemoteOperation::Image, .. } => "image download failed",
//!         Error::Remote { .. } => "listing failed",
//!         Error::EmptyPlan => "nothing to download",
//!         Error::NoPagesFetched { .. } => "every page was skipped",
//!         _ => "other failure",
//!     }
//! }
//!
//! assert_eq!(describe(&Error::EmptyPlan), "nothing to download");
//! ```

use std::fmt;

use thiserror::Error;

/// Type alias for Results with mangapack errors.
///
/// All public APIs in the crate return this Result type.
///
/// # Examples
///
/// ```rust
/// use mangapack::{Error, Result};
///
/// fn check_ceiling(ceiling: u64) -> Result<u64> {
///     if ceiling == 0 {
///         return Err(Error::config("size ceiling must be positive"));
///     }
///     Ok(ceiling)
/// }
///
/// assert!(check_ceiling(0).is_err());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The remote read operation that was being attempted when a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    /// Title search
    Search,
    /// Chapter list of a title
    ChapterList,
    /// Page list of a chapter
    PageList,
    /// Raw image bytes of a page
    Image,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteOperation::Search => "search",
            RemoteOperation::ChapterList => "chapter list",
            RemoteOperation::PageList => "page list",
            RemoteOperation::Image => "image download",
        };
        f.write_str(name)
    }
}

/// Error type for all mangapack operations.
///
/// # Variants
///
/// * [`Remote`](Error::Remote) - Transport, HTTP status, or decode failures
/// * [`EmptyPlan`](Error::EmptyPlan) - The requested chapters have no pages
/// * [`NoPagesFetched`](Error::NoPagesFetched) - Every planned page was skipped
/// * [`JobInProgress`](Error::JobInProgress) - The session already runs a job
/// * [`Archive`](Error::Archive) - Container writing errors
/// * [`Io`](Error::Io) - File system errors
/// * [`Join`](Error::Join) - Blocking task failures
/// * [`Config`](Error::Config) - Invalid configuration
#[derive(Error, Debug)]
pub enum Error {
    /// A remote read failed.
    ///
    /// Every failure of the content API or image CDN is normalized into this
    /// variant, whether it came from the connection, a non-success HTTP status,
    /// or a response body that could not be decoded. The raw transport error
    /// is rendered into `cause` and never exposed as its own type.
    #[error("Remote {operation} failed: {cause}")]
    Remote {
        operation: RemoteOperation,
        cause: String,
    },

    /// The page plan for the requested chapters totals zero pages.
    #[error("No pages available for the requested chapters")]
    EmptyPlan,

    /// Pages were planned but none ended up in the scratch area.
    #[error("None of the {planned} planned pages could be fetched")]
    NoPagesFetched { planned: usize },

    /// A job is already running for this session.
    #[error("A download is already running for session {session}")]
    JobInProgress { session: String },

    /// Errors raised while writing a container.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// File system and IO operation errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Join errors from blocking archive tasks.
    #[error("Join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Invalid configuration or client construction failure.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Creates a remote error for the given operation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mangapack::error::{Error, RemoteOperation};
    ///
    /// let err = Error::remote(RemoteOperation::PageList, "HTTP 404 Not Found");
    /// assert_eq!(err.to_string(), "Remote page list failed: HTTP 404 Not Found");
    /// ```
    pub fn remote(operation: RemoteOperation, cause: impl fmt::Display) -> Self {
        Error::Remote {
            operation,
            cause: cause.to_string(),
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Returns the remote operation for [`Error::Remote`], `None` otherwise.
    pub fn remote_operation(&self) -> Option<RemoteOperation> {
        match self {
            Error::Remote { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}
