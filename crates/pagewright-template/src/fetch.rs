//! Read-through access to the disk cache.

use std::future::Future;

use serde_json::Value;

use pagewright_core::{DiskCache, PagewrightResult};

/// Returns the cached JSON for `slug`, or fetches and persists it.
///
/// With `bypass` set the cache is never read, but a fresh result is still
/// written. An unreadable entry is treated as a miss, and a failed write is
/// logged without failing the render.
pub async fn read_through<F>(
    cache: &DiskCache,
    slug: &str,
    bypass: bool,
    fetch: F,
) -> PagewrightResult<Value>
where
    F: Future<Output = PagewrightResult<Value>>,
{
    if !bypass {
        match cache.read_json(slug).await {
            Ok(Some(value)) => {
                tracing::debug!(slug, "cache hit");
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(slug, error = %e, "unreadable cache entry, refetching"),
        }
    }

    let value = fetch.await?;
    persist(cache, slug, &value).await;
    Ok(value)
}

/// Writes a JSON entry, logging instead of failing.
pub async fn persist(cache: &DiskCache, slug: &str, value: &Value) {
    if let Err(e) = cache.write_json(slug, value).await {
        tracing::warn!(slug, error = %e, "cache write failed");
    }
}
