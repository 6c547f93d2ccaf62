//! Configuration for the content client and the download pipeline.
//!
//! Both structs implement [`Default`] with the reference values and come with a
//! generated builder (via `derive_builder`) for overriding individual fields.
//! Builders validate their input, so a built config is always usable.
//!
//! # Examples
//!
//! ```rust
//! use mangapack::config::{PageFailurePolicy, PipelineConfigBuilder};
//!
//! let config = PipelineConfigBuilder::default()
//!     .size_ceiling(20 * 1024 * 1024)
//!     .work_dir("/tmp/mangapack")
//!     .page_failure_policy(PageFailurePolicy::Skip)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.size_ceiling, 20 * 1024 * 1024);
//! ```

use derive_builder::Builder;
use std::path::PathBuf;
use std::time::Duration;

/// Reference size ceiling for one container: 48 MiB.
pub const DEFAULT_SIZE_CEILING: u64 = 48 * 1024 * 1024;

/// What the fetcher does when a page's image bytes cannot be downloaded.
///
/// Pages with a missing image key are always skipped; this policy only
/// covers failed downloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageFailurePolicy {
    /// Abort the whole job on the first failed download
    #[default]
    Abort,
    /// Log the failure and continue with the next page
    Skip,
}

/// Settings for [`ComickClient`](crate::client::ComickClient).
///
/// # Fields
///
/// * `api_base` - Base URL of the JSON API
/// * `cdn_base` - Base URL images are served from; page keys are appended to it
/// * `language` - Chapter language requested from the chapter list endpoint
/// * `search_limit` - Maximum number of search results
/// * `chapter_limit` - Maximum number of chapters listed per title
/// * `headers` - Static headers sent with every request
/// * `*_timeout` - Per-operation request timeouts
#[derive(Debug, Clone, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct ClientConfig {
    #[builder(setter(into))]
    pub api_base: String,
    #[builder(setter(into))]
    pub cdn_base: String,
    #[builder(setter(into))]
    pub language: String,
    pub search_limit: u32,
    pub chapter_limit: u32,
    pub headers: Vec<(String, String)>,
    pub search_timeout: Duration,
    pub chapter_list_timeout: Duration,
    pub page_list_timeout: Duration,
    pub image_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let headers = [
            (
                "User-Agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36",
            ),
            ("Accept", "application/json, text/plain, */*"),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Origin", "https://comick.io"),
            ("Referer", "https://comick.io/"),
        ];

        Self {
            api_base: "https://api.comick.io".to_string(),
            cdn_base: "https://meo.comick.pictures".to_string(),
            language: "en".to_string(),
            search_limit: 10,
            chapter_limit: 5000,
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            search_timeout: Duration::from_secs(10),
            chapter_list_timeout: Duration::from_secs(15),
            page_list_timeout: Duration::from_secs(10),
            image_timeout: Duration::from_secs(15),
        }
    }
}

impl ClientConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [("api_base", &self.api_base), ("cdn_base", &self.cdn_base)] {
            if let Some(value) = value {
                if url::Url::parse(value).is_err() {
                    return Err(format!("{} is not a valid URL: {:?}", field, value));
                }
            }
        }
        Ok(())
    }
}

/// Settings for a download [`Pipeline`](crate::job::Pipeline).
///
/// # Fields
///
/// * `size_ceiling` - Maximum serialized size of one container, in bytes
/// * `work_dir` - Root under which each session gets its scratch and staging directories
/// * `page_failure_policy` - Skip or abort on a failed page download
/// * `archive_extension` - File extension of produced containers
#[derive(Debug, Clone, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct PipelineConfig {
    pub size_ceiling: u64,
    #[builder(setter(into))]
    pub work_dir: PathBuf,
    pub page_failure_policy: PageFailurePolicy,
    #[builder(setter(into))]
    pub archive_extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            size_ceiling: DEFAULT_SIZE_CEILING,
            work_dir: PathBuf::from("./mangapack-work"),
            page_failure_policy: PageFailurePolicy::default(),
            archive_extension: "cbz".to_string(),
        }
    }
}

impl PipelineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.size_ceiling == Some(0) {
            return Err("size_ceiling must be greater than zero".to_string());
        }
        if let Some(ext) = &self.archive_extension {
            if ext.is_empty() || ext.contains(['.', '/', '\\']) {
                return Err(format!("invalid archive extension: {:?}", ext));
            }
        }
        Ok(())
    }
}
