//! The CSV table handed from the website finder to the merger.

use crate::domain::model::WebsiteRow;
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

pub const HEADER: [&str; 5] = ["name", "domain", "url", "title", "confidence"];

pub fn write_rows(rows: &[WebsiteRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    // 沒有資料列也要寫出標頭
    writer.write_record(HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("failed to flush CSV output: {}", e),
    })
}

#[derive(Debug, Deserialize)]
struct LookupRow {
    name: String,
    url: String,
    #[serde(default, deserialize_with = "present_field")]
    confidence: Option<String>,
}

// 欄位存在時即使為空字串也保留，只有缺少欄位才是 None
fn present_field<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    String::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct WebsiteLookup {
    pub urls: HashMap<String, String>,
    pub skipped_rows: usize,
}

/// Build name → URL from the table, keeping rows whose confidence is strictly
/// above `threshold`. Later rows win on duplicate names. Rows that cannot be
/// read, or whose confidence is not a number, are skipped.
pub fn load_lookup(data: &[u8], threshold: f64) -> Result<WebsiteLookup> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);

    let headers = reader.headers()?.clone();
    for required in ["name", "url"] {
        if !headers.iter().any(|h| h.trim() == required) {
            return Err(EtlError::FormatError {
                format: "CSV".to_string(),
                message: format!("missing '{}' column", required),
            });
        }
    }

    let mut lookup = WebsiteLookup::default();
    for (line, row) in reader.deserialize::<LookupRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("⚠️ Skipping unreadable row {}: {}", line + 2, e);
                lookup.skipped_rows += 1;
                continue;
            }
        };

        // 缺少 confidence 視為 0
        let confidence = match row.confidence.as_deref() {
            None => 0.0,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(value) => value,
                Err(_) => {
                    tracing::debug!("Skipping '{}': confidence '{}' is not a number", row.name, raw);
                    lookup.skipped_rows += 1;
                    continue;
                }
            },
        };

        if confidence > threshold {
            lookup
                .urls
                .insert(row.name.trim().to_string(), row.url.trim().to_string());
        }
    }

    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_rows_always_has_header() {
        let empty = write_rows(&[]).unwrap();
        assert_eq!(String::from_utf8(empty).unwrap(), "name,domain,url,title,confidence\n");

        let rows = vec![WebsiteRow {
            name: "Bike World".to_string(),
            domain: "bikeworld.com".to_string(),
            url: "https://www.bikeworld.com/".to_string(),
            title: "Bike World, Seattle".to_string(),
            confidence: 1.0,
        }];
        let text = String::from_utf8(write_rows(&rows).unwrap()).unwrap();
        assert_eq!(
            text,
            "name,domain,url,title,confidence\nBike World,bikeworld.com,https://www.bikeworld.com/,\"Bike World, Seattle\",1.0\n"
        );
    }

    #[test]
    fn test_load_lookup_filters_by_threshold() {
        let csv = "name,domain,url,title,confidence
Bike World,bikeworld.com, https://bikeworld.com/ ,Bike World,1.0
Acme Cycles,,,,0.0
Edge Case,edge.com,https://edge.com/,Edge,0.3
Just Above,above.com,https://above.com/,Above,0.31
";
        let lookup = load_lookup(csv.as_bytes(), 0.3).unwrap();

        assert_eq!(lookup.urls.len(), 2);
        assert_eq!(lookup.urls["Bike World"], "https://bikeworld.com/");
        assert_eq!(lookup.urls["Just Above"], "https://above.com/");
        assert!(!lookup.urls.contains_key("Edge Case"));
        assert!(!lookup.urls.contains_key("Acme Cycles"));
    }

    #[test]
    fn test_load_lookup_later_rows_win_and_bad_confidence_is_skipped() {
        let csv = "name,domain,url,title,confidence
Bike World,a.com,https://a.com/,A,0.5
Bike World,b.com,https://b.com/,B,0.9
Broken,c.com,https://c.com/,C,high
";
        let lookup = load_lookup(csv.as_bytes(), 0.3).unwrap();

        assert_eq!(lookup.urls["Bike World"], "https://b.com/");
        assert_eq!(lookup.skipped_rows, 1);
        assert!(!lookup.urls.contains_key("Broken"));
    }

    #[test]
    fn test_load_lookup_requires_name_and_url_columns() {
        let csv = "business,website\nBike World,https://a.com/\n";
        assert!(load_lookup(csv.as_bytes(), 0.3).is_err());
    }

    #[test]
    fn test_load_lookup_skips_blank_confidence() {
        let csv = "name,domain,url,title,confidence
Bike World,bikeworld.com,https://www.bikeworld.com/,Bike World,
Acme Cycles,acme.example,https://acme.example/,Acme,0.8
";
        let lookup = load_lookup(csv.as_bytes(), 0.3).unwrap();

        assert_eq!(lookup.skipped_rows, 1);
        assert!(!lookup.urls.contains_key("Bike World"));
        assert_eq!(lookup.urls["Acme Cycles"], "https://acme.example/");
    }

    #[test]
    fn test_load_lookup_without_confidence_column_merges_nothing() {
        let csv = "name,url\nBike World,https://www.bikeworld.com/\n";
        let lookup = load_lookup(csv.as_bytes(), 0.0).unwrap();

        assert_eq!(lookup.skipped_rows, 0);
        assert!(lookup.urls.is_empty());
    }
}
