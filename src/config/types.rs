use serde::Deserialize;

/// Placeholder in `base-url` that is replaced with the page number
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Main configuration structure for Newsrake
///
/// Every section and field has a built-in default, so the harvester runs
/// without a configuration file at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Listing source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Listing URL template; must contain the `{page}` placeholder
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// CSS selector whose presence marks a fully loaded listing page
    #[serde(rename = "ready-marker", default = "default_ready_marker")]
    pub ready_marker: String,

    /// First page number to harvest (inclusive)
    #[serde(rename = "first-page", default = "default_first_page")]
    pub first_page: u32,

    /// Last page number to harvest (inclusive)
    #[serde(rename = "last-page", default = "default_last_page")]
    pub last_page: u32,
}

impl SourceConfig {
    /// Number of pages in the configured range
    pub fn page_count(&self) -> u32 {
        self.last_page.saturating_sub(self.first_page) + 1
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ready_marker: default_ready_marker(),
            first_page: default_first_page(),
            last_page: default_last_page(),
        }
    }
}

/// Page fetch behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Maximum time to wait for the ready marker on one attempt (milliseconds)
    #[serde(rename = "load-timeout-ms", default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    /// Interval between readiness polls of the same page (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Fetch attempts per page before the page is reported failed
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Pause between a successful fetch and extraction (milliseconds)
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: default_load_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            attempts: default_attempts(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolConfig {
    /// Number of concurrent page workers; 0 selects available parallelism minus one
    #[serde(default)]
    pub workers: u32,

    /// Overall run deadline (milliseconds); 0 disables the deadline
    #[serde(rename = "run-timeout-ms", default)]
    pub run_timeout_ms: u64,
}

impl PoolConfig {
    /// Resolves the configured worker count to a concrete pool size
    ///
    /// A value of 0 means "pick for me": one worker per available core,
    /// minus one to leave headroom, never less than one.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers as usize;
        }
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }
}

/// Output file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory the output file is created in
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Output filename prefix; the run timestamp and extension are appended
    #[serde(default = "default_output_prefix")]
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            prefix: default_output_prefix(),
        }
    }
}

fn default_base_url() -> String {
    "https://news.ycombinator.com/news?p={page}".to_string()
}

fn default_ready_marker() -> String {
    "#hnmain".to_string()
}

fn default_first_page() -> u32 {
    1
}

fn default_last_page() -> u32 {
    20
}

fn default_load_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_attempts() -> u32 {
    3
}

fn default_settle_delay_ms() -> u64 {
    2_000
}

fn default_output_directory() -> String {
    ".".to_string()
}

fn default_output_prefix() -> String {
    "output".to_string()
}
