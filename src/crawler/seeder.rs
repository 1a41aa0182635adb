//! Seed loading
//!
//! Seeds come from the first source that has any:
//! 1. Explicit names in the `[seeds]` config section
//! 2. The local seed cache file
//! 3. The platform's default listing (fetched once, then cached)

use crate::config::Config;
use crate::node::NodeId;
use crate::{MapperError, PlatformResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source of the platform's default node listing
#[async_trait]
pub trait DefaultListing: Send + Sync {
    async fn fetch_default_listing(&self) -> PlatformResult<Vec<String>>;
}

/// Delay applied after a listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub delay: Duration,
}

impl Pacing {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// No delay at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// One page of the platform's listing JSON
#[derive(Debug, Deserialize)]
pub(crate) struct ListingPage {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: ListingEntry,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    display_name: String,
}

impl ListingPage {
    pub(crate) fn names(self) -> Vec<String> {
        self.data
            .children
            .into_iter()
            .map(|child| child.data.display_name)
            .collect()
    }
}

/// Accepted layouts of the seed cache file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedCache {
    Names(Vec<String>),
    Listing(ListingPage),
}

impl SeedCache {
    fn into_names(self) -> Vec<String> {
        match self {
            Self::Names(names) => names,
            Self::Listing(page) => page.names(),
        }
    }
}

/// Where a seed list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    Config,
    Cache,
    Network,
}

/// Loads the initial seed list for a fresh crawl
#[derive(Debug, Clone)]
pub struct Seeder {
    explicit: Vec<String>,
    cache_path: PathBuf,
    pacing: Pacing,
}

impl Seeder {
    pub fn new(explicit: Vec<String>, cache_path: impl Into<PathBuf>, pacing: Pacing) -> Self {
        Self {
            explicit,
            cache_path: cache_path.into(),
            pacing,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.seeds.names.clone(),
            config.output.seed_cache_path(),
            Pacing::new(Duration::from_millis(config.crawler.seed_delay_ms)),
        )
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Returns the seeds available without touching the network
    ///
    /// Returns None when the default listing would have to be fetched.
    pub fn local_seeds(&self) -> Option<(SeedSource, Vec<NodeId>)> {
        if !self.explicit.is_empty() {
            return Some((SeedSource::Config, normalize_seeds(&self.explicit)));
        }

        self.read_cache()
            .map(|names| (SeedSource::Cache, normalize_seeds(&names)))
    }

    /// Loads the seed list, fetching the default listing if needed
    pub async fn load_seeds<L>(&self, listing: &L) -> Result<Vec<NodeId>, MapperError>
    where
        L: DefaultListing + ?Sized,
    {
        if let Some((source, seeds)) = self.local_seeds() {
            info!("Loaded {} seeds from {:?}", seeds.len(), source);
            return Ok(seeds);
        }

        info!("Fetching default listing for seeds");
        let names = listing.fetch_default_listing().await?;
        self.pacing.wait().await;
        self.write_cache(&names);

        let seeds = normalize_seeds(&names);
        info!("Loaded {} seeds from {:?}", seeds.len(), SeedSource::Network);
        Ok(seeds)
    }

    fn read_cache(&self) -> Option<Vec<String>> {
        if !self.cache_path.exists() {
            return None;
        }

        let content = match fs::read_to_string(&self.cache_path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Ignoring unreadable seed cache {}: {}", self.cache_path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<SeedCache>(&content) {
            Ok(cache) => Some(cache.into_names()),
            Err(e) => {
                warn!("Ignoring malformed seed cache {}: {}", self.cache_path.display(), e);
                None
            }
        }
    }

    fn write_cache(&self, names: &[String]) {
        let result = serde_json::to_string_pretty(names)
            .map_err(std::io::Error::from)
            .and_then(|json| fs::write(&self.cache_path, json));

        match result {
            Ok(()) => debug!("Wrote seed cache {}", self.cache_path.display()),
            Err(e) => warn!("Could not write seed cache {}: {}", self.cache_path.display(), e),
        }
    }
}

/// Normalizes raw seed names, skipping invalid ones
fn normalize_seeds(raw: &[String]) -> Vec<NodeId> {
    raw.iter()
        .filter_map(|name| match NodeId::normalize(name) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Skipping invalid seed '{}': {}", name, e);
                None
            }
        })
        .collect()
}
