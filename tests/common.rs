//! Common test utilities and doubles
//!
//! Shared functionality used across all test modules.
// Common test utilities - all must be public

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mangapack::archive::ArchiveSink;
use mangapack::client::ContentClient;
use mangapack::config::{PageFailurePolicy, PipelineConfig, PipelineConfigBuilder};
use mangapack::error::{Error, RemoteOperation, Result};
use mangapack::job::Pipeline;
use mangapack::progress::{StatusSurface, StatusTarget};
use mangapack::types::{ChapterRef, Manga, PageRef, SealedPart};

#[allow(dead_code)]
pub const TEST_TITLE: &str = "Blue Period";

/// Builds a numbered chapter handle.
#[allow(dead_code)]
pub fn chapter(hid: &str, number: f64) -> ChapterRef {
    ChapterRef {
        hid: hid.to_string(),
        number: Some(number),
        title: None,
    }
}

/// Image key of page `page` (1-based) in chapter `hid`.
#[allow(dead_code)]
pub fn page_key(hid: &str, page: usize) -> String {
    format!("{}-{:03}.jpg", hid, page)
}

/// In-memory content API.
///
/// Each chapter holds a list of optional image keys; every key maps to image
/// bytes unless it was registered as failing.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeClient {
    chapters: Vec<(ChapterRef, Vec<Option<String>>)>,
    images: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    stalling: HashSet<String>,
    pub page_list_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a chapter with `pages` pages of `page_size` bytes each.
    pub fn with_chapter(self, hid: &str, number: f64, pages: usize, page_size: usize) -> Self {
        let sizes = vec![page_size; pages];
        self.with_sized_chapter(hid, number, &sizes)
    }

    /// Adds a chapter whose pages have the given sizes.
    pub fn with_sized_chapter(mut self, hid: &str, number: f64, sizes: &[usize]) -> Self {
        let mut keys = Vec::with_capacity(sizes.len());
        for (i, size) in sizes.iter().enumerate() {
            let key = page_key(hid, i + 1);
            self.images.insert(key.clone(), vec![(i % 251) as u8; *size]);
            keys.push(Some(key));
        }
        self.chapters.push((chapter(hid, number), keys));
        self
    }

    /// Adds a chapter with raw keys, `None` standing for a missing key.
    pub fn with_keys(mut self, hid: &str, number: f64, keys: Vec<Option<&str>>) -> Self {
        let keys = keys
            .into_iter()
            .map(|key| {
                key.map(|key| {
                    self.images
                        .entry(key.to_string())
                        .or_insert_with(|| vec![1u8; 64]);
                    key.to_string()
                })
            })
            .collect();
        self.chapters.push((chapter(hid, number), keys));
        self
    }

    /// Makes downloads of `key` fail.
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Makes downloads of `key` never complete.
    pub fn stalling(mut self, key: &str) -> Self {
        self.stalling.insert(key.to_string());
        self
    }

    /// Chapter handles in the order they were added.
    pub fn chapters(&self) -> Vec<ChapterRef> {
        self.chapters.iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn page_list_calls(&self) -> usize {
        self.page_list_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentClient for FakeClient {
    async fn search(&self, query: &str) -> Result<Vec<Manga>> {
        Ok(vec![Manga {
            hid: "fake".to_string(),
            title: query.to_string(),
            slug: None,
        }])
    }

    async fn list_chapters(&self, _manga_hid: &str, _lang: &str) -> Result<Vec<ChapterRef>> {
        Ok(self.chapters())
    }

    async fn list_pages(&self, chapter_hid: &str) -> Result<Vec<PageRef>> {
        self.page_list_calls.fetch_add(1, Ordering::SeqCst);
        let (_, keys) = self
            .chapters
            .iter()
            .find(|(c, _)| c.hid == chapter_hid)
            .ok_or_else(|| Error::remote(RemoteOperation::PageList, "unknown chapter"))?;

        Ok(keys
            .iter()
            .map(|key| PageRef {
                chapter_hid: chapter_hid.to_string(),
                key: key.clone(),
            })
            .collect())
    }

    async fn fetch_image(&self, key: &str) -> Result<Bytes> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.stalling.contains(key) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(key) {
            return Err(Error::remote(RemoteOperation::Image, "HTTP 503"));
        }
        self.images
            .get(key)
            .map(|data| Bytes::from(data.clone()))
            .ok_or_else(|| Error::remote(RemoteOperation::Image, "HTTP 404"))
    }
}

/// One call made against a [`RecordingSurface`].
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Edit(String),
    Delete,
    Notice(String),
}

/// Status surface that records every call.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
}

#[allow(dead_code)]
impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }

    pub fn edits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Edit(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Notice(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl StatusSurface for RecordingSurface {
    async fn edit_status(&self, _target: &StatusTarget, text: &str) -> Result<()> {
        self.calls.lock().push(SurfaceCall::Edit(text.to_string()));
        Ok(())
    }

    async fn delete_status(&self, _target: &StatusTarget) -> Result<()> {
        self.calls.lock().push(SurfaceCall::Delete);
        Ok(())
    }

    async fn post_notice(&self, _session_id: &str, text: &str) -> Result<()> {
        self.calls.lock().push(SurfaceCall::Notice(text.to_string()));
        Ok(())
    }
}

/// A container as received by a [`CollectingSink`].
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct DeliveredPart {
    pub file_name: String,
    pub size: u64,
    pub pages: std::ops::Range<usize>,
    /// Entry names in archive order
    pub entries: Vec<String>,
    /// Entry contents in archive order
    pub contents: Vec<Vec<u8>>,
}

/// Archive sink that opens every delivered container and records it.
#[allow(dead_code)]
#[derive(Default)]
pub struct CollectingSink {
    parts: Mutex<Vec<DeliveredPart>>,
    fail_deliveries: bool,
}

#[allow(dead_code)]
impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A sink whose every delivery fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            parts: Mutex::new(Vec::new()),
            fail_deliveries: true,
        })
    }

    pub fn parts(&self) -> Vec<DeliveredPart> {
        self.parts.lock().clone()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.parts().into_iter().map(|p| p.file_name).collect()
    }

    /// Every entry name across all parts, in delivery order.
    pub fn all_entries(&self) -> Vec<String> {
        self.parts().into_iter().flat_map(|p| p.entries).collect()
    }
}

#[async_trait]
impl ArchiveSink for CollectingSink {
    async fn deliver(&self, part: &SealedPart) -> Result<()> {
        if self.fail_deliveries {
            return Err(Error::Io(std::io::Error::other("upload rejected")));
        }

        let file = std::fs::File::open(&part.path)?;
        let size = file.metadata()?.len();
        let mut archive = zip::ZipArchive::new(file)?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut contents = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.push(entry.name().to_string());
            contents.push(data);
        }

        self.parts.lock().push(DeliveredPart {
            file_name: part.file_name.clone(),
            size,
            pages: part.pages.clone(),
            entries,
            contents,
        });
        Ok(())
    }
}

/// Pipeline config rooted at `work_dir`.
#[allow(dead_code)]
pub fn pipeline_config(work_dir: &Path, ceiling: u64, policy: PageFailurePolicy) -> PipelineConfig {
    PipelineConfigBuilder::default()
        .work_dir(work_dir)
        .size_ceiling(ceiling)
        .page_failure_policy(policy)
        .build()
        .unwrap()
}

/// Wires a pipeline from the test doubles.
#[allow(dead_code)]
pub fn pipeline(
    client: &Arc<FakeClient>,
    sink: &Arc<CollectingSink>,
    surface: &Arc<RecordingSurface>,
    config: PipelineConfig,
) -> Pipeline {
    Pipeline::new(client.clone(), sink.clone(), surface.clone(), config)
}

/// Staging directory a session gets under `work_dir`.
#[allow(dead_code)]
pub fn session_dir(work_dir: &Path, session: &str) -> PathBuf {
    work_dir.join(format!("session_{}", session))
}

/// Total size of the files below `dir`; a missing directory counts as empty.
#[allow(dead_code)]
pub fn dir_size(dir: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| match entry.metadata() {
            Ok(meta) if meta.is_dir() => dir_size(&entry.path()),
            Ok(meta) => meta.len(),
            Err(_) => 0,
        })
        .sum()
}
