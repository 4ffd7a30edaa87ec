use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the harvester
///
/// Every section is optional; missing sections and keys fall back to the
/// defaults documented on each field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub http: HttpConfig,
    pub walker: WalkerConfig,
    pub enrichment: EnrichmentConfig,
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SchoolHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = [
            self.contact_url.as_ref().map(|url| format!("+{}", url)),
            self.contact_email.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

/// HTTP transport and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: f64,

    /// Attempts per detail URL before giving up
    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,

    /// Fixed wait between attempts (seconds)
    #[serde(rename = "retry-delay-secs")]
    pub retry_delay_secs: f64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15.0,
            retry_attempts: 3,
            retry_delay_secs: 2.0,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_secs)
    }
}

/// Listing-page walker configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Politeness delay between pages of one chain (seconds)
    #[serde(rename = "page-delay-secs")]
    pub page_delay_secs: f64,

    /// Delay between groups (seconds)
    #[serde(rename = "group-delay-secs")]
    pub group_delay_secs: f64,

    /// Save the accumulated records every N groups
    #[serde(rename = "save-interval")]
    pub save_interval: usize,

    /// Stop a chain after this many pages
    #[serde(rename = "max-pages-per-group")]
    pub max_pages_per_group: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            page_delay_secs: 1.0,
            group_delay_secs: 2.0,
            save_interval: 10,
            max_pages_per_group: None,
        }
    }
}

impl WalkerConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_secs_f64(self.page_delay_secs)
    }

    pub fn group_delay(&self) -> Duration {
        Duration::from_secs_f64(self.group_delay_secs)
    }
}

/// Detail enrichment configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// First record index to process
    #[serde(rename = "start-index")]
    pub start_index: usize,

    /// Number of records to process; the rest of the list when absent
    pub count: Option<usize>,

    /// Delay after each detail request (seconds)
    #[serde(rename = "delay-secs")]
    pub delay_secs: f64,

    /// Write a checkpoint every N records
    #[serde(rename = "save-interval")]
    pub save_interval: usize,

    /// A record holding any of these fields counts as enriched
    #[serde(rename = "required-fields")]
    pub required_fields: Vec<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            start_index: 0,
            count: None,
            delay_secs: 2.0,
            save_interval: 50,
            required_fields: crate::record::DEFAULT_REQUIRED_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EnrichmentConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs)
    }
}

/// CSS selectors used by the directory extractor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One element per listed school
    pub entry: String,

    /// Link inside an entry carrying the name and detail URL
    #[serde(rename = "entry-link")]
    pub entry_link: String,

    /// Description inside an entry
    pub description: String,

    /// Pagination "next" anchor
    #[serde(rename = "next-page")]
    pub next_page: String,

    /// Table of label/value rows on a detail page
    #[serde(rename = "detail-table")]
    pub detail_table: String,

    /// Group links on the group index page
    #[serde(rename = "group-link")]
    pub group_link: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            entry: "div.catbox".to_string(),
            entry_link: "h2 a".to_string(),
            description: "p".to_string(),
            next_page: "a.nextpostslink".to_string(),
            detail_table: "div#schooldetails table".to_string(),
            group_link: "ul.wp-tag-cloud a".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Group list (input to the walker, output of discovery)
    #[serde(rename = "groups-path")]
    pub groups_path: String,

    /// Base records written by the walker
    #[serde(rename = "records-path")]
    pub records_path: String,

    /// Rolling enrichment checkpoint
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Fully enriched record list written at the end of a run
    #[serde(rename = "complete-path")]
    pub complete_path: String,

    /// Output of single-page detail extraction
    #[serde(rename = "detail-path")]
    pub detail_path: String,

    /// Optional markdown summary
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,

    /// Optional SQLite run ledger
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,

    /// Groups shown in the report before the rest are summarized
    #[serde(rename = "report-top-n")]
    pub report_top_n: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            groups_path: "districts.json".to_string(),
            records_path: "SchoolsData.json".to_string(),
            checkpoint_path: "progress_checkpoint.json".to_string(),
            complete_path: "SchoolsData_Complete.json".to_string(),
            detail_path: "school_details_output.json".to_string(),
            summary_path: None,
            database_path: None,
            report_top_n: 20,
        }
    }
}
