use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub seeds: SeedConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Successful visits between periodic checkpoints (0 disables them)
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,

    /// Minimum time between two requests to the platform (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_delay_ms")]
    pub request_delay_ms: u64,

    /// Pause after the one-time default listing request (milliseconds)
    #[serde(rename = "seed-delay-ms", default = "default_delay_ms")]
    pub seed_delay_ms: u64,

    /// Drop nodes the platform reports as missing instead of stopping
    #[serde(rename = "skip-missing-nodes", default)]
    pub skip_missing_nodes: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Platform endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the platform's JSON endpoints
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Output configuration
///
/// File names are resolved relative to `directory`.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Append-only record stream
    #[serde(rename = "records-file", default = "default_records_file")]
    pub records_file: String,

    /// Frontier/visited snapshot
    #[serde(rename = "checkpoint-file", default = "default_checkpoint_file")]
    pub checkpoint_file: String,

    /// Fault log
    #[serde(rename = "error-log", default = "default_error_log")]
    pub error_log: String,

    /// Local cache of the default seed listing
    #[serde(rename = "seed-cache", default = "default_seed_cache")]
    pub seed_cache: String,
}

/// Explicit seed configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedConfig {
    /// Seed subreddits; when empty the default listing is used
    #[serde(default)]
    pub names: Vec<String>,
}

impl OutputConfig {
    pub fn records_path(&self) -> PathBuf {
        self.directory.join(&self.records_file)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.directory.join(&self.checkpoint_file)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.directory.join(&self.error_log)
    }

    pub fn seed_cache_path(&self) -> PathBuf {
        self.directory.join(&self.seed_cache)
    }
}

impl UserAgentConfig {
    /// Formats the user agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            request_delay_ms: default_delay_ms(),
            seed_delay_ms: default_delay_ms(),
            skip_missing_nodes: false,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            records_file: default_records_file(),
            checkpoint_file: default_checkpoint_file(),
            error_log: default_error_log(),
            seed_cache: default_seed_cache(),
        }
    }
}

fn default_checkpoint_interval() -> u32 {
    50
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_base_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_records_file() -> String {
    "output.csv".to_string()
}

fn default_checkpoint_file() -> String {
    "checkpoint.json".to_string()
}

fn default_error_log() -> String {
    "errors.log".to_string()
}

fn default_seed_cache() -> String {
    "default.json".to_string()
}
