//! Durable disk cache for remote payloads.
//!
//! [`DiskCache`] persists JSON and squashed-HTML payloads under a single cache
//! root. Entries are addressed by key; a key becomes a file name through
//! [`cache_slug`], which never maps two keys to one file. The cache is the
//! only state shared across requests. Writes overwrite whole files and take no
//! locks, so two writers of the same key race and the last one wins.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pagewright_core::cache::DiskCache;
//!
//! async fn example() {
//!     let cache = DiskCache::new(".pagewright-cache");
//!     cache.write_json("query-blog", &serde_json::json!({"items": []})).await.unwrap();
//!     let cached = cache.read_json("query-blog").await.unwrap();
//!     assert!(cached.is_some());
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::error::PagewrightError;

/// Extensions owned by the cache; [`DiskCache::clear`] only removes these.
const CACHE_EXTENSIONS: [&str; 2] = ["json", "html"];

/// A key-addressed file cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    /// The directory where cache files are stored.
    dir: PathBuf,
}

impl DiskCache {
    /// Creates a cache that stores entries in the given directory.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cache root.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the filesystem path for a key and extension.
    pub fn path(&self, key: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{ext}", cache_slug(key)))
    }

    /// Returns `true` if an entry exists for the key and extension.
    pub async fn exists(&self, key: &str, ext: &str) -> bool {
        tokio::fs::try_exists(self.path(key, ext))
            .await
            .unwrap_or(false)
    }

    /// Reads a JSON entry. Returns `None` when no entry exists.
    pub async fn read_json(&self, key: &str) -> Result<Option<serde_json::Value>, PagewrightError> {
        match self.read_text(key, "json").await? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Persists a JSON entry, overwriting any previous one.
    pub async fn write_json(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), PagewrightError> {
        let data = serde_json::to_string(value)?;
        self.write_text(key, "json", &data).await
    }

    /// Reads a text entry with the given extension.
    pub async fn read_text(&self, key: &str, ext: &str) -> Result<Option<String>, PagewrightError> {
        match tokio::fs::read_to_string(self.path(key, ext)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PagewrightError::Io(e)),
        }
    }

    /// Persists a text entry with the given extension.
    pub async fn write_text(&self, key: &str, ext: &str, text: &str) -> Result<(), PagewrightError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path(key, ext);
        tokio::fs::write(&path, text).await?;
        tracing::debug!(path = %path.display(), "cache entry written");
        Ok(())
    }

    /// Removes every cache entry. Returns the number of files removed.
    pub async fn clear(&self) -> Result<usize, PagewrightError> {
        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            return Ok(0);
        }

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let owned = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| CACHE_EXTENSIONS.contains(&ext));
            if owned {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Turns an arbitrary cache key into a filesystem-safe file stem.
///
/// ASCII letters, digits and `-` are kept. Every other byte is written as `_`
/// followed by two hex digits, so distinct keys always get distinct stems.
/// The empty key becomes `_`.
///
/// # Examples
///
/// ```
/// use pagewright_core::cache::cache_slug;
///
/// assert_eq!(cache_slug("query-blog"), "query-blog");
/// assert_eq!(cache_slug("page-a/b"), "page-a_2fb");
/// assert_ne!(cache_slug("page-a/b"), cache_slug("page-a-b"));
/// ```
pub fn cache_slug(key: &str) -> String {
    if key.is_empty() {
        return "_".to_string();
    }
    let mut slug = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            slug.push(char::from(byte));
        } else {
            slug.push_str(&format!("_{byte:02x}"));
        }
    }
    slug
}

/// Collapses whitespace between tags and runs of whitespace inside text.
///
/// This is the "squashed" form in which page HTML is cached.
pub fn squash_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut pending_space = false;
    for ch in html.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            let after_tag = out.ends_with('>');
            if !out.is_empty() && !(after_tag && ch == '<') {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(ch);
    }
    out
}
