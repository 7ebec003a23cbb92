//! The `clearcache` management command.

use async_trait::async_trait;
use pagewright_core::{DiskCache, PagewrightResult, Settings};

use crate::command::ManagementCommand;

/// Deletes every entry in the disk cache.
pub struct ClearcacheCommand;

#[async_trait]
impl ManagementCommand for ClearcacheCommand {
    fn name(&self) -> &'static str {
        "clearcache"
    }

    fn help(&self) -> &'static str {
        "Deletes every cached page, query and block field"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> PagewrightResult<()> {
        let cache = DiskCache::new(&settings.cache_dir);
        let removed = cache.clear().await?;
        tracing::info!(removed, dir = %cache.dir().display(), "cache cleared");
        println!("Removed {removed} cache entries from {}", cache.dir().display());
        Ok(())
    }
}
