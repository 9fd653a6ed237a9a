use crate::core::coords::ReorderPolicy;
use crate::core::scoring::SelectionPolicy;
use crate::domain::model::BoundingBox;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_distinct_paths, validate_file_extension, validate_non_empty_string, validate_path,
    validate_positive_number, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const KML: &[&str] = &["kml"];
const GEOJSON: &[&str] = &["geojson", "json"];
const CSV: &[&str] = &["csv"];

/// Settings for every tool. Each section is optional and falls back to the
/// values the dealer cleanup has been run with so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub http: HttpConfig,
    pub monitoring: MonitoringConfig,
    pub audit: AuditConfig,
    pub repair: RepairConfig,
    pub flip: FlipConfig,
    pub find_websites: FindWebsitesConfig,
    pub merge_websites: MergeWebsitesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Sent with every request. Nominatim requires a contact address here.
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "kml-fixer/1.0 (your_email@example.com)".to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub input: String,
    /// Also write the missing names to this file, one per line.
    pub report: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            input: "all_dealers_fixed.kml".to_string(),
            report: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub input: String,
    pub output: String,
    pub geocoder_endpoint: String,
    /// Minimum gap between successive geocoder requests.
    pub delay_ms: u64,
    pub lat_threshold: f64,
    pub lon_threshold: f64,
    /// `<Data name="…">` entries joined into an address, in this order.
    pub address_fields: Vec<String>,
}

impl Default for RepairConfig {
    fn default() -> Self {
        let policy = ReorderPolicy::default();
        Self {
            input: "all_dealers.kml".to_string(),
            output: "all_dealers_fixed.kml".to_string(),
            geocoder_endpoint: crate::adapters::nominatim::DEFAULT_ENDPOINT.to_string(),
            delay_ms: 1000,
            lat_threshold: policy.lat_threshold,
            lon_threshold: policy.lon_threshold,
            address_fields: ["Address", "Address 2", "City", "State", "Country", "Zip", "Zip Code"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RepairConfig {
    pub fn policy(&self) -> ReorderPolicy {
        ReorderPolicy {
            lat_threshold: self.lat_threshold,
            lon_threshold: self.lon_threshold,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipConfig {
    pub input: String,
    pub output: String,
    pub pretty: bool,
    pub boxes: Vec<BoundingBox>,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            input: "all_dealers_fixed3.kml".to_string(),
            output: "all_dealers_fixed_selective3.kml".to_string(),
            pretty: true,
            boxes: vec![BoundingBox::new(-15.0, 15.0, 30.0, 60.0)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FindWebsitesConfig {
    pub input: String,
    pub output: String,
    pub search_endpoint: String,
    pub max_results: usize,
    pub strong_match: f64,
    pub delay_base_ms: u64,
    pub delay_jitter_ms: u64,
    pub query_suffixes: Vec<String>,
    pub blocked_domains: Vec<String>,
}

impl Default for FindWebsitesConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            input: "geojson/all_dealers_without_websites.geojson".to_string(),
            output: "website_scrape/results.csv".to_string(),
            search_endpoint: crate::adapters::duckduckgo::DEFAULT_ENDPOINT.to_string(),
            max_results: 8,
            strong_match: 0.4,
            delay_base_ms: 4000,
            delay_jitter_ms: 2000,
            query_suffixes: owned(&[
                " bike shop website",
                " bike shop site",
                " website bike shop",
                " bike shops website",
                " bike shops site",
                " website bikes shop",
                " online",
                " contact website",
                " website email",
            ]),
            blocked_domains: owned(&["yelp.", "facebook.", "tripadvisor.", "maps.google.", "yellowpages."]),
        }
    }
}

impl FindWebsitesConfig {
    pub fn selection(&self) -> SelectionPolicy {
        SelectionPolicy {
            strong_match: self.strong_match,
            blocked_domains: self.blocked_domains.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeWebsitesConfig {
    pub input: String,
    pub lookup: String,
    pub output: String,
    /// Rows must score strictly above this to be merged.
    pub confidence_threshold: f64,
}

impl Default for MergeWebsitesConfig {
    fn default() -> Self {
        Self {
            input: "geojson/all_dealers_unique.geojson".to_string(),
            lookup: "website_scrape/results.csv".to_string(),
            output: "geojson/all_dealers_unique_with_websites.geojson".to_string(),
            confidence_threshold: 0.3,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CONTACT_EMAIL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }
}

fn validate_box(field: &str, bbox: &BoundingBox) -> Result<()> {
    validate_range(&format!("{}.min_lat", field), bbox.min_lat, -90.0, 90.0)?;
    validate_range(&format!("{}.max_lat", field), bbox.max_lat, -90.0, 90.0)?;
    validate_range(&format!("{}.min_lon", field), bbox.min_lon, -180.0, 180.0)?;
    validate_range(&format!("{}.max_lon", field), bbox.max_lon, -180.0, 180.0)?;

    if bbox.min_lat > bbox.max_lat || bbox.min_lon > bbox.max_lon {
        return Err(EtlError::InvalidConfigValueError {
            field: field.to_string(),
            value: format!("{:?}", bbox),
            reason: "minimum must not exceed maximum".to_string(),
        });
    }
    Ok(())
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("http.user_agent", &self.http.user_agent)?;
        validate_positive_number("http.timeout_seconds", self.http.timeout_seconds as usize, 1)?;

        validate_path("audit.input", &self.audit.input)?;
        validate_file_extension("audit.input", &self.audit.input, KML)?;
        if let Some(report) = &self.audit.report {
            validate_path("audit.report", report)?;
        }

        let repair = &self.repair;
        validate_path("repair.input", &repair.input)?;
        validate_path("repair.output", &repair.output)?;
        validate_file_extension("repair.input", &repair.input, KML)?;
        validate_file_extension("repair.output", &repair.output, KML)?;
        validate_distinct_paths("repair.output", &repair.input, &repair.output)?;
        validate_url("repair.geocoder_endpoint", &repair.geocoder_endpoint)?;
        validate_range("repair.lat_threshold", repair.lat_threshold, 0.0, 90.0)?;
        validate_range("repair.lon_threshold", repair.lon_threshold, 0.0, 180.0)?;
        validate_positive_number("repair.address_fields", repair.address_fields.len(), 1)?;

        let flip = &self.flip;
        validate_path("flip.input", &flip.input)?;
        validate_path("flip.output", &flip.output)?;
        validate_file_extension("flip.input", &flip.input, KML)?;
        validate_file_extension("flip.output", &flip.output, KML)?;
        validate_distinct_paths("flip.output", &flip.input, &flip.output)?;
        for (i, bbox) in flip.boxes.iter().enumerate() {
            validate_box(&format!("flip.boxes[{}]", i), bbox)?;
        }

        let find = &self.find_websites;
        validate_path("find_websites.input", &find.input)?;
        validate_path("find_websites.output", &find.output)?;
        validate_file_extension("find_websites.input", &find.input, GEOJSON)?;
        validate_file_extension("find_websites.output", &find.output, CSV)?;
        validate_url("find_websites.search_endpoint", &find.search_endpoint)?;
        validate_positive_number("find_websites.max_results", find.max_results, 1)?;
        validate_range("find_websites.strong_match", find.strong_match, 0.0, 1.0)?;
        validate_positive_number("find_websites.query_suffixes", find.query_suffixes.len(), 1)?;

        let merge = &self.merge_websites;
        validate_path("merge_websites.input", &merge.input)?;
        validate_path("merge_websites.lookup", &merge.lookup)?;
        validate_path("merge_websites.output", &merge.output)?;
        validate_file_extension("merge_websites.input", &merge.input, GEOJSON)?;
        validate_file_extension("merge_websites.lookup", &merge.lookup, CSV)?;
        validate_file_extension("merge_websites.output", &merge.output, GEOJSON)?;
        validate_distinct_paths("merge_websites.output", &merge.input, &merge.output)?;
        validate_range(
            "merge_websites.confidence_threshold",
            merge.confidence_threshold,
            0.0,
            1.0,
        )?;

        Ok(())
    }
}
