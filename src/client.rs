//! Content client trait and the Comick API implementation.
//!
//! This module defines the [`ContentClient`] trait consumed by the download
//! pipeline, and [`ComickClient`], which implements it over HTTP. The pipeline
//! only ever talks to the trait, so tests and alternative backends (a caching
//! client, for instance) can be swapped in without touching it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mangapack::client::{ComickClient, ContentClient};
//! use mangapack::config::ClientConfig;
//!
//! # async fn example() -> mangapack::Result<()> {
//! let client = ComickClient::new(ClientConfig::default())?;
//!
//! let results = client.search("blue period").await?;
//! let manga = &results[0];
//!
//! let chapters = client.list_chapters(&manga.hid, "en").await?;
//! let pages = client.list_pages(&chapters[0].hid).await?;
//! println!("{} has {} pages", chapters[0].display_label(), pages.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::cmp::Ordering;

use crate::{
    config::ClientConfig,
    error::{RemoteOperation, Result},
    net::{HttpClient, json},
    types::{ChapterRef, Manga, PageRef},
};

/// Remote read operations the download pipeline depends on.
///
/// Every method is attempted exactly once per call. Failures are reported as
/// [`Error::Remote`](crate::Error::Remote) carrying the attempted operation.
///
/// # Implementation Guidelines
///
/// - `list_chapters` must return chapters sorted ascending by number, with
///   unknown numbers sorting as `0` (see [`sort_chapters`])
/// - `list_pages` must return pages in reading order, including pages whose
///   key is missing; the fetcher decides what to skip
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Searches titles matching `query`.
    async fn search(&self, query: &str) -> Result<Vec<Manga>>;

    /// Lists the chapters of a title in language `lang`, sorted by number.
    ///
    /// An empty `lang` selects the client's default language.
    async fn list_chapters(&self, manga_hid: &str, lang: &str) -> Result<Vec<ChapterRef>>;

    /// Lists the pages of a chapter in reading order.
    async fn list_pages(&self, chapter_hid: &str) -> Result<Vec<PageRef>>;

    /// Downloads the raw bytes of the image behind `key`.
    async fn fetch_image(&self, key: &str) -> Result<Bytes>;
}

/// Sorts chapters ascending by number; unknown numbers sort as `0`.
///
/// The sort is stable, so chapters sharing a number keep the API order.
///
/// # Examples
///
/// ```rust
/// use mangapack::client::sort_chapters;
/// use mangapack::types::ChapterRef;
///
/// let mut chapters = vec![
///     ChapterRef { hid: "b".into(), number: Some(2.0), title: None },
///     ChapterRef { hid: "x".into(), number: None, title: None },
///     ChapterRef { hid: "a".into(), number: Some(1.5), title: None },
/// ];
/// sort_chapters(&mut chapters);
///
/// let order: Vec<_> = chapters.iter().map(|c| c.hid.as_str()).collect();
/// assert_eq!(order, ["x", "a", "b"]);
/// ```
pub fn sort_chapters(chapters: &mut [ChapterRef]) {
    chapters.sort_by(|a, b| {
        a.sort_key()
            .partial_cmp(&b.sort_key())
            .unwrap_or(Ordering::Equal)
    });
}

/// [`ContentClient`] backed by the Comick JSON API and image CDN.
///
/// # Endpoints
///
/// - `GET {api}/v1.0/search?q=..&limit=..&t=true` - title search
/// - `GET {api}/comic/{hid}/chapters?lang=..&limit=..` - chapter list
/// - `GET {api}/chapter/{hid}` - page list under `chapter.md_images`
/// - `GET {cdn}/{b2key}` - page image bytes
pub struct ComickClient {
    client: HttpClient,
    config: ClientConfig,
}

impl ComickClient {
    /// Creates a client from `config`.
    ///
    /// # Errors
    ///
    /// * [`Error::Config`](crate::Error::Config) - If the configured headers are invalid
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(&config.headers)?,
            config,
        })
    }

    /// Returns the configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds the CDN URL of an image key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mangapack::client::ComickClient;
    /// use mangapack::config::ClientConfig;
    ///
    /// let client = ComickClient::new(ClientConfig::default()).unwrap();
    /// assert_eq!(
    ///     client.image_url("abc.jpg"),
    ///     "https://meo.comick.pictures/abc.jpg"
    /// );
    /// ```
    pub fn image_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.cdn_base.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn map_manga(value: &Value) -> Option<Manga> {
        let hid = json::string_field(value, "hid")?;
        Some(Manga {
            hid,
            title: json::string_field(value, "title").unwrap_or_else(|| "N/A".to_string()),
            slug: json::string_field(value, "slug"),
        })
    }

    fn map_chapter(value: &Value) -> Option<ChapterRef> {
        Some(ChapterRef {
            hid: json::string_field(value, "hid")?,
            number: json::number_field(value, "chap"),
            title: json::string_field(value, "title"),
        })
    }
}

#[async_trait]
impl ContentClient for ComickClient {
    async fn search(&self, query: &str) -> Result<Vec<Manga>> {
        let url = self.api_url(&format!(
            "/v1.0/search?q={}&limit={}&t=true",
            urlencoding::encode(query),
            self.config.search_limit
        ));

        let response: Value = self
            .client
            .get_json(&url, RemoteOperation::Search, self.config.search_timeout)
            .await?;

        Ok(response
            .as_array()
            .map(|entries| entries.iter().filter_map(Self::map_manga).collect())
            .unwrap_or_default())
    }

    async fn list_chapters(&self, manga_hid: &str, lang: &str) -> Result<Vec<ChapterRef>> {
        let lang = if lang.is_empty() {
            self.config.language.as_str()
        } else {
            lang
        };
        let url = self.api_url(&format!(
            "/comic/{}/chapters?lang={}&limit={}",
            urlencoding::encode(manga_hid),
            urlencoding::encode(lang),
            self.config.chapter_limit
        ));

        let response: Value = self
            .client
            .get_json(
                &url,
                RemoteOperation::ChapterList,
                self.config.chapter_list_timeout,
            )
            .await?;

        let mut chapters: Vec<ChapterRef> = json::extract_array(&response, "chapters")
            .iter()
            .filter_map(Self::map_chapter)
            .collect();
        sort_chapters(&mut chapters);

        Ok(chapters)
    }

    async fn list_pages(&self, chapter_hid: &str) -> Result<Vec<PageRef>> {
        let url = self.api_url(&format!("/chapter/{}", urlencoding::encode(chapter_hid)));

        let response: Value = self
            .client
            .get_json(&url, RemoteOperation::PageList, self.config.page_list_timeout)
            .await?;

        Ok(json::extract_array(&response, "chapter.md_images")
            .iter()
            .map(|image| PageRef {
                chapter_hid: chapter_hid.to_string(),
                key: json::string_field(image, "b2key"),
            })
            .collect())
    }

    async fn fetch_image(&self, key: &str) -> Result<Bytes> {
        let url = self.image_url(key);
        self.client
            .get(&url, RemoteOperation::Image, self.config.image_timeout)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_chapter_handles_loose_numbers() {
        let chapter = ComickClient::map_chapter(&json!({
            "hid": "h1",
            "chap": "10.5",
            "title": "Side Story"
        }))
        .unwrap();
        assert_eq!(chapter.number, Some(10.5));
        assert_eq!(chapter.title.as_deref(), Some("Side Story"));

        let chapter = ComickClient::map_chapter(&json!({"hid": "h2", "chap": null})).unwrap();
        assert_eq!(chapter.number, None);

        assert!(ComickClient::map_chapter(&json!({"chap": "1"})).is_none());
    }

    #[test]
    fn test_map_manga_defaults_title() {
        let manga = ComickClient::map_manga(&json!({"hid": "m1", "slug": "a-title"})).unwrap();
        assert_eq!(manga.title, "N/A");
        assert_eq!(manga.slug.as_deref(), Some("a-title"));
    }

    #[test]
    fn test_image_url_joins_cleanly() {
        let config = ClientConfig {
            cdn_base: "http://cdn.local/".to_string(),
            ..ClientConfig::default()
        };
        let client = ComickClient::new(config).unwrap();
        assert_eq!(client.image_url("/k.png"), "http://cdn.local/k.png");
    }
}
