use clap::{Parser, ValueEnum};
use listing_harvest::config::{Delimiter, HarvestConfig, ProxyConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(about = "Collect product listings from a retail listing page into a CSV file")]
#[command(version)]
pub struct Args {
    /// Listing page URL (category, search, tag, brand or facet page)
    pub url: String,

    /// Number of products to collect
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Output file (defaults to products_<slug>_<count>.csv)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Absolute page ceiling
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Delay between pages in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Attempts per request
    #[arg(long)]
    pub retries: Option<u32>,

    /// Proxy API key; repeat to rotate through several
    #[arg(long = "proxy-key")]
    pub proxy_keys: Vec<String>,

    /// Fail instead of fetching directly once every proxy key was refused
    #[arg(long)]
    pub no_direct_fallback: bool,

    /// Print the resolved endpoint and exit without fetching
    #[arg(long)]
    pub classify_only: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Tsv,
}

impl From<FormatArg> for Delimiter {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => Delimiter::Csv,
            FormatArg::Tsv => Delimiter::Tsv,
        }
    }
}

impl Args {
    /// Layer command-line overrides and environment proxy keys over `config`
    pub fn apply(&self, mut config: HarvestConfig, env_keys: Option<String>) -> HarvestConfig {
        if let Some(count) = self.count {
            config.pagination.target_count = count;
        }
        if let Some(max_pages) = self.max_pages {
            config.pagination.max_pages = max_pages;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.pagination.polite_delay_ms = delay_ms;
        }
        if let Some(retries) = self.retries {
            config.http.retries = retries;
        }
        if let Some(format) = self.format {
            config.output.delimiter = format.into();
        }

        let mut keys = self.proxy_keys.clone();
        let configured = config.proxy.as_ref().is_some_and(|p| !p.api_keys.is_empty());
        if keys.is_empty() && !configured {
            keys = parse_key_list(env_keys.as_deref().unwrap_or_default());
        }
        if !keys.is_empty() {
            let proxy = config
                .proxy
                .get_or_insert_with(|| ProxyConfig::new(Vec::new()));
            proxy.api_keys = keys;
        }
        if self.no_direct_fallback {
            if let Some(proxy) = config.proxy.as_mut() {
                proxy.fallback_direct = false;
            }
        }

        config
    }
}

/// Split a comma-separated key list, dropping blanks
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
