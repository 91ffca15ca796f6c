use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Backend addressing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Root of the JSON API, without trailing slash
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Root of the human-facing site, used to build product links
    #[serde(default = "default_site_root")]
    pub site_root: String,

    /// Sort value sent with category and facet searches
    #[serde(default = "default_sort")]
    pub default_sort: String,
}

/// Settings for the HTTP fetch collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per logical request
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Fixed pause between attempts, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Termination and politeness policy of the pagination driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Stop once this many records were collected
    #[serde(default = "default_target_count")]
    pub target_count: usize,

    /// Absolute ceiling on the page number
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Delay between successful page fetches, in milliseconds
    #[serde(default = "default_polite_delay_ms")]
    pub polite_delay_ms: u64,
}

/// Key-rotating scraping proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy API endpoint the target URL is handed to
    #[serde(default = "default_proxy_endpoint")]
    pub endpoint: String,

    /// Credential tokens to rotate through
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Shuffle key order on every request
    #[serde(default = "default_true")]
    pub shuffle: bool,

    /// Try a direct request once every key failed
    #[serde(default = "default_true")]
    pub fallback_direct: bool,

    /// Ask the proxy to render JavaScript
    #[serde(default)]
    pub render_js: bool,
}

/// Field delimiter of the exported file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Csv,
    Tsv,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Csv => b',',
            Delimiter::Tsv => b'\t',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Delimiter::Csv => "csv",
            Delimiter::Tsv => "tsv",
        }
    }
}

/// Output file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: Delimiter,

    /// Prefix the file with a UTF-8 byte-order mark
    #[serde(default = "default_true")]
    pub bom: bool,
}

/// Complete configuration of one harvest run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Proxy decorator; direct fetching when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,

    #[serde(default)]
    pub output: OutputConfig,
}

impl HarvestConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the driver cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.http.retries == 0 {
            return Err(HarvestError::Config(
                "http.retries must be at least 1".to_string(),
            ));
        }
        if self.pagination.max_pages == 0 {
            return Err(HarvestError::Config(
                "pagination.max_pages must be at least 1".to_string(),
            ));
        }
        if let Some(proxy) = &self.proxy {
            if proxy.api_keys.is_empty() && !proxy.fallback_direct {
                return Err(HarvestError::Config(
                    "proxy has no api_keys and direct fallback is disabled".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl PaginationConfig {
    pub fn polite_delay(&self) -> Duration {
        Duration::from_millis(self.polite_delay_ms)
    }
}

impl ProxyConfig {
    /// Create a proxy configuration with default settings for the given keys
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            endpoint: default_proxy_endpoint(),
            api_keys,
            shuffle: true,
            fallback_direct: true,
            render_js: false,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            site_root: default_site_root(),
            default_sort: default_sort(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            max_pages: default_max_pages(),
            polite_delay_ms: default_polite_delay_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            bom: true,
        }
    }
}

fn default_api_base() -> String {
    "https://api.digikala.com/v1".to_string()
}

fn default_site_root() -> String {
    "https://www.digikala.com".to_string()
}

fn default_sort() -> String {
    "7".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    700
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_target_count() -> usize {
    2500
}

fn default_max_pages() -> u32 {
    100
}

fn default_polite_delay_ms() -> u64 {
    250
}

fn default_proxy_endpoint() -> String {
    "https://app.scrapingbee.com/api/v1/".to_string()
}

fn default_delimiter() -> Delimiter {
    Delimiter::Csv
}

fn default_true() -> bool {
    true
}
