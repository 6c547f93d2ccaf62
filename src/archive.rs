//! Size-bounded archive packing.
//!
//! Fetched pages are partitioned, in order, into one or more CBZ containers
//! (stored zip archives). Each container is filled page by page until the next
//! page would push its serialized size over the ceiling; that page is left for
//! the next container. A container always receives at least one page, so a
//! single oversized page ends up alone in its own container.
//!
//! Every sealed container is handed to an [`ArchiveSink`] and deleted locally
//! before the next one is opened, so at most one container sits on disk.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mangapack::archive::{ArchivePacker, DirectorySink};
//! use mangapack::progress;
//! use mangapack::types::FetchedPage;
//!
//! # async fn example(pages: Vec<FetchedPage>) -> mangapack::Result<()> {
//! let (progress, _events) = progress::channel();
//! let sink = DirectorySink::new("./out");
//!
//! let parts = ArchivePacker::new("Blue Period", "./staging", 48 * 1024 * 1024, &progress)
//!     .single_chapter(false)
//!     .pack(&pages, &sink)
//!     .await?;
//! println!("sent {} parts", parts.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    error::Result,
    naming::{part_file_name, sanitize_title},
    progress::{ProgressEvent, ProgressSender},
    types::{FetchedPage, SealedPart},
};

/// Fixed part of a zip local file header.
const LOCAL_HEADER_LEN: u64 = 30;
/// Fixed part of a zip central directory entry.
const CENTRAL_HEADER_LEN: u64 = 46;
/// End of central directory record without a comment.
const END_RECORD_LEN: u64 = 22;

/// Destination of sealed containers.
///
/// A chat host uploads the file; [`DirectorySink`] saves it to disk. The
/// container file at `part.path` is deleted by the packer once `deliver`
/// returns successfully.
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    /// Delivers one sealed container.
    async fn deliver(&self, part: &SealedPart) -> Result<()>;
}

/// [`ArchiveSink`] that copies each container into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Creates a sink saving into `dir`; the directory is created on first delivery.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory of this sink.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArchiveSink for DirectorySink {
    async fn deliver(&self, part: &SealedPart) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let target = self.dir.join(&part.file_name);
        fs::copy(&part.path, &target).await?;
        info!(path = %target.display(), size = part.size, "Saved archive part");
        Ok(())
    }
}

/// Running size of a stored zip archive, header arithmetic included.
///
/// Stored entries written with default options carry no extra fields, data
/// descriptor or zip64 records, so for entries under 4 GiB this is the exact
/// serialized size.
#[derive(Debug, Default, Clone, Copy)]
struct SizeProjection {
    entries: u64,
    central: u64,
}

impl SizeProjection {
    fn local_len(name: &str, data_len: u64) -> u64 {
        LOCAL_HEADER_LEN + name.len() as u64 + data_len
    }

    fn central_len(name: &str) -> u64 {
        CENTRAL_HEADER_LEN + name.len() as u64
    }

    /// Serialized size of the archive if it were sealed now.
    fn sealed(&self) -> u64 {
        self.entries + self.central + END_RECORD_LEN
    }

    /// Serialized size of the archive after appending one more entry.
    fn with_entry(&self, name: &str, data_len: u64) -> u64 {
        self.sealed() + Self::local_len(name, data_len) + Self::central_len(name)
    }

    fn push(&mut self, name: &str, data_len: u64) {
        self.entries += Self::local_len(name, data_len);
        self.central += Self::central_len(name);
    }
}

/// A page as seen by the container writer.
#[derive(Debug, Clone)]
struct PageEntry {
    name: String,
    path: PathBuf,
}

/// Fills one container starting at `start` and seals it.
///
/// Returns how many pages went in and the sealed size on disk. A container
/// that measures over the ceiling once sealed is rewritten with one page
/// fewer, down to a single page.
fn write_container(
    path: &Path,
    entries: &[PageEntry],
    start: usize,
    ceiling: u64,
) -> Result<(usize, u64)> {
    let mut limit = entries.len() - start;

    loop {
        let (count, size) = fill_container(path, &entries[start..start + limit], ceiling)?;
        if size <= ceiling || count <= 1 {
            return Ok((count, size));
        }
        warn!(size, ceiling, pages = count, "Sealed container exceeds ceiling, dropping last page");
        limit = count - 1;
    }
}

/// Writes pages from `entries` until the next one would push the projected
/// size over `ceiling`. The first page always goes in.
fn fill_container(path: &Path, entries: &[PageEntry], ceiling: u64) -> Result<(usize, u64)> {
    let mut writer = ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let mut projection = SizeProjection::default();
    let mut count = 0;

    for entry in entries {
        let data_len = std::fs::metadata(&entry.path)?.len();

        // Undo the append: the page is left for the next container.
        if projection.with_entry(&entry.name, data_len) > ceiling && count > 0 {
            break;
        }

        writer.start_file(entry.name.as_str(), options)?;
        let mut source = File::open(&entry.path)?;
        std::io::copy(&mut source, &mut writer)?;

        projection.push(&entry.name, data_len);
        count += 1;
    }

    let file = writer.finish()?;
    let size = file.metadata()?.len();
    if size != projection.sealed() {
        debug!(size, projected = projection.sealed(), "Container size differs from projection");
    }

    Ok((count, size))
}

/// Partitions fetched pages into size-bounded containers and delivers them.
pub struct ArchivePacker<'a> {
    title: String,
    staging_dir: PathBuf,
    ceiling: u64,
    single_chapter: bool,
    extension: String,
    progress: &'a ProgressSender,
}

impl<'a> ArchivePacker<'a> {
    /// Creates a packer for `title` staging containers in `staging_dir`.
    ///
    /// The title is sanitized before being used in file names. The packer
    /// defaults to multi-chapter naming and the `cbz` extension.
    pub fn new(
        title: &str,
        staging_dir: impl Into<PathBuf>,
        ceiling: u64,
        progress: &'a ProgressSender,
    ) -> Self {
        Self {
            title: sanitize_title(title),
            staging_dir: staging_dir.into(),
            ceiling,
            single_chapter: false,
            extension: "cbz".to_string(),
            progress,
        }
    }

    /// Selects single-chapter naming: no part suffix unless the job splits.
    pub fn single_chapter(mut self, single_chapter: bool) -> Self {
        self.single_chapter = single_chapter;
        self
    }

    /// Sets the container file extension.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Packs `pages` in order and hands every sealed container to `sink`.
    ///
    /// Returns the delivered parts in part order. Their `path` no longer
    /// exists once this returns.
    ///
    /// # Errors
    ///
    /// * [`Error::Archive`](crate::Error::Archive) / [`Error::Io`](crate::Error::Io) - If a container cannot be written
    /// * Any error returned by the sink
    pub async fn pack(
        &self,
        pages: &[FetchedPage],
        sink: &dyn ArchiveSink,
    ) -> Result<Vec<SealedPart>> {
        fs::create_dir_all(&self.staging_dir).await?;

        let entries: Arc<[PageEntry]> = pages
            .iter()
            .map(|page| PageEntry {
                name: page.entry_name(),
                path: page.path.clone(),
            })
            .collect();

        let total = entries.len();
        let mut parts = Vec::new();
        let mut cursor = 0;
        let mut number = 1;

        while cursor < total {
            let provisional = self.file_name(number, !self.single_chapter || number > 1);
            self.progress.emit(ProgressEvent::Packing {
                part_name: provisional.clone(),
                placed: cursor,
                total,
            });

            let staged = self.staging_dir.join(&provisional);
            let (count, size) = {
                let entries = Arc::clone(&entries);
                let staged = staged.clone();
                let ceiling = self.ceiling;
                tokio::task::spawn_blocking(move || {
                    write_container(&staged, &entries, cursor, ceiling)
                })
                .await??
            };

            let end = cursor + count;
            let suffixed = !self.single_chapter || number > 1 || end < total;
            let file_name = self.file_name(number, suffixed);
            let path = if file_name == provisional {
                staged
            } else {
                let renamed = self.staging_dir.join(&file_name);
                fs::rename(&staged, &renamed).await?;
                renamed
            };

            let part = SealedPart {
                number,
                file_name,
                path,
                pages: cursor..end,
                size,
            };
            debug!(part = %part.file_name, pages = count, size, "Sealed archive part");

            self.progress.emit(ProgressEvent::Uploading {
                part_name: part.file_name.clone(),
            });
            sink.deliver(&part).await?;
            fs::remove_file(&part.path).await?;

            parts.push(part);
            cursor = end;
            number += 1;
        }

        Ok(parts)
    }

    fn file_name(&self, number: usize, suffixed: bool) -> String {
        part_file_name(&self.title, number, suffixed, &self.extension)
    }
}
