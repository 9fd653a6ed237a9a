use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name used when a placemark has no `<name>`.
pub const UNNAMED_PLACEMARK: &str = "(Unnamed placemark)";

/// Read-only view of one KML placemark, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placemark {
    pub index: usize,
    pub name: Option<String>,
    pub has_point: bool,
    pub coordinates: Option<String>,
    pub address: Option<String>,
    pub data: Vec<(String, String)>,
}

impl Placemark {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED_PLACEMARK)
    }

    /// Trimmed coordinate text, if there is any.
    pub fn coordinate_text(&self) -> Option<&str> {
        self.coordinates
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatePair {
    pub lon: f64,
    pub lat: f64,
}

impl CoordinatePair {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// `lon,lat,0`; altitude is always written as zero.
    pub fn to_kml(&self) -> String {
        format!("{},{},0", self.lon, self.lat)
    }

    pub fn swapped(&self) -> Self {
        Self {
            lon: self.lat,
            lat: self.lon,
        }
    }
}

/// Inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    pub fn contains(&self, point: CoordinatePair) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

/// One organic result from a web search, in provider order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Candidate {
    pub domain: String,
    pub url: String,
    pub title: String,
    pub confidence: f64,
}

impl Candidate {
    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }
}

/// A row of the website table written by the finder and read by the merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebsiteRow {
    pub name: String,
    pub domain: String,
    pub url: String,
    pub title: String,
    pub confidence: f64,
}

impl WebsiteRow {
    pub fn from_candidate(name: &str, candidate: Candidate) -> Self {
        Self {
            name: name.to_string(),
            domain: candidate.domain,
            url: candidate.url,
            title: candidate.title,
            confidence: candidate.confidence,
        }
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pipeline: String,
    pub output_path: Option<String>,
    pub counters: Vec<(String, usize)>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new(pipeline: &str) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            output_path: None,
            counters: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn with_output(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_counter(mut self, name: &str, value: usize) -> Self {
        self.counters.push((name.to_string(), value));
        self
    }

    pub fn counter(&self, name: &str) -> Option<usize> {
        self.counters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }
}
