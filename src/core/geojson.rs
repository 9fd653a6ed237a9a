use crate::utils::error::{EtlError, Result};
use serde_json::Value;
use std::collections::HashMap;

pub const WEBSITE_PROPERTY: &str = "Website";

/// A GeoJSON FeatureCollection kept as an order-preserving JSON value, so
/// properties nobody touches are written back exactly as they came in.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    value: Value,
}

impl FeatureCollection {
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(EtlError::FormatError {
                format: "GeoJSON".to_string(),
                message: "top-level value is not an object".to_string(),
            });
        }
        Ok(Self { value })
    }

    pub fn feature_count(&self) -> usize {
        self.features().count()
    }

    fn features(&self) -> impl Iterator<Item = &Value> {
        self.value
            .get("features")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
    }

    /// Trimmed, non-empty `properties.name` of every feature, in order.
    pub fn business_names(&self) -> Vec<String> {
        self.features()
            .filter_map(|feature| feature.get("properties")?.get("name")?.as_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Set the `Website` property of every feature whose name is in `lookup`.
    /// Returns the number of features updated.
    pub fn apply_websites(&mut self, lookup: &HashMap<String, String>) -> usize {
        let Some(features) = self.value.get_mut("features").and_then(Value::as_array_mut) else {
            return 0;
        };

        let mut updated = 0;
        for feature in features.iter_mut() {
            let Some(properties) = feature.get_mut("properties").and_then(Value::as_object_mut) else {
                continue;
            };

            let name = properties
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();

            if let Some(url) = lookup.get(name) {
                properties.insert(WEBSITE_PROPERTY.to_string(), Value::String(url.clone()));
                updated += 1;
            }
        }
        updated
    }

    pub fn to_pretty_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.value)?)
    }
}
