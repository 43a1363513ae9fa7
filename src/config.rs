use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://www.ibps.in/";
pub const DEFAULT_OUTPUT: &str = "ibps_jobs.csv";
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_DETAIL_TIMEOUT_SECS: u64 = 12;

const DEFAULT_TITLE: &str = "IBPS Notification";
const DEFAULT_KEYWORDS: &[&str] = &[
    "recruit",
    "recruitment",
    "notification",
    "career",
    "vacancy",
    "advertisement",
    "apply",
];
const DEFAULT_CONTAINER_MARKERS: &[&str] = &["news", "latest"];
const DEFAULT_DATE_META: &str = "date";
// "05 Mar 2025" / "5-March-2025", then "05-03-2025" / "05/03/2025", then a bare year.
const DEFAULT_DATE_PATTERN: &str = r"(?i)\b(?:\d{1,2}[ \-/](?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*[ \-/]\d{4}|\d{2}[ \-/]\d{2}[ \-/]\d{4}|\d{4})\b";
const DEFAULT_LOCATION_LABEL: &str = "Location";
const DEFAULT_LOCATION_PATTERN: &str = r"Location[:\-\s]*([A-Za-z ,\-]+)";

/// Settings for a single scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Page holding the candidate links; relative hrefs resolve against it.
    pub base_url: Url,
    pub output: PathBuf,
    pub page_timeout: Duration,
    pub detail_timeout: Duration,
    /// Skip certificate validation for the base page only. The IBPS site
    /// serves an incomplete chain, so this is on unless `--strict-tls` is given.
    pub accept_invalid_certs: bool,
}

impl ScrapeConfig {
    pub fn new(
        base_url: &str,
        output: impl Into<PathBuf>,
        page_timeout_secs: u64,
        detail_timeout_secs: u64,
        strict_tls: bool,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url).map_err(|source| ConfigError::BaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        if page_timeout_secs == 0 || detail_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if detail_timeout_secs >= page_timeout_secs {
            return Err(ConfigError::Timeouts {
                base: page_timeout_secs,
                detail: detail_timeout_secs,
            });
        }

        Ok(Self {
            base_url,
            output: output.into(),
            page_timeout: Duration::from_secs(page_timeout_secs),
            detail_timeout: Duration::from_secs(detail_timeout_secs),
            accept_invalid_certs: !strict_tls,
        })
    }
}

/// Matching rules used to find postings and pull details out of them.
#[derive(Debug, Clone)]
pub struct Heuristics {
    /// Lowercase substrings looked for in anchor text and href.
    pub keywords: Vec<String>,
    /// Lowercase substrings looked for in container class lists (fallback path).
    pub container_markers: Vec<String>,
    pub default_title: String,
    /// `name` of the `<meta>` tag whose content is taken as the posting date.
    pub date_meta_name: String,
    pub date_pattern: Regex,
    /// Literal, case-sensitive text that marks the node holding the location.
    pub location_label: String,
    /// Must contain a capture group; group 1 is the location.
    pub location_pattern: Regex,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            container_markers: DEFAULT_CONTAINER_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            default_title: DEFAULT_TITLE.to_string(),
            date_meta_name: DEFAULT_DATE_META.to_string(),
            date_pattern: Regex::new(DEFAULT_DATE_PATTERN).expect("built-in date pattern is valid"),
            location_label: DEFAULT_LOCATION_LABEL.to_string(),
            location_pattern: Regex::new(DEFAULT_LOCATION_PATTERN)
                .expect("built-in location pattern is valid"),
        }
    }
}

/// Partial heuristics as read from a JSON file. Missing fields keep the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeuristicsOverrides {
    pub keywords: Option<Vec<String>>,
    pub container_markers: Option<Vec<String>>,
    pub default_title: Option<String>,
    pub date_meta_name: Option<String>,
    pub date_pattern: Option<String>,
    pub location_label: Option<String>,
    pub location_pattern: Option<String>,
}

impl Heuristics {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let overrides: HeuristicsOverrides = serde_json::from_str(raw)?;
        Self::default().with_overrides(overrides)
    }

    pub fn with_overrides(mut self, overrides: HeuristicsOverrides) -> Result<Self, ConfigError> {
        if let Some(keywords) = overrides.keywords {
            self.keywords = normalize_terms(keywords, "keywords")?;
        }
        if let Some(markers) = overrides.container_markers {
            self.container_markers = normalize_terms(markers, "container_markers")?;
        }
        if let Some(title) = overrides.default_title {
            if title.trim().is_empty() {
                return Err(ConfigError::Empty("default_title"));
            }
            self.default_title = title;
        }
        if let Some(name) = overrides.date_meta_name {
            self.date_meta_name = name;
        }
        if let Some(pattern) = overrides.date_pattern {
            self.date_pattern = Regex::new(&pattern).map_err(|source| ConfigError::Pattern {
                field: "date",
                source,
            })?;
        }
        if let Some(label) = overrides.location_label {
            // The default pattern is anchored on the default label.
            if overrides.location_pattern.is_none() {
                return Err(ConfigError::LabelWithoutPattern);
            }
            if label.is_empty() {
                return Err(ConfigError::Empty("location_label"));
            }
            self.location_label = label;
        }
        if let Some(pattern) = overrides.location_pattern {
            let re = Regex::new(&pattern).map_err(|source| ConfigError::Pattern {
                field: "location",
                source,
            })?;
            if re.captures_len() < 2 {
                return Err(ConfigError::MissingGroup("location"));
            }
            self.location_pattern = re;
        }
        Ok(self)
    }
}

fn normalize_terms(terms: Vec<String>, field: &'static str) -> Result<Vec<String>, ConfigError> {
    let terms: Vec<String> = terms
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return Err(ConfigError::Empty(field));
    }
    Ok(terms)
}
