//! OpenStreetMap Nominatim geocoder.
//!
//! The usage policy requires an identifying `User-Agent` with a contact
//! address and at most one request per second; the pacing is done by the
//! caller.

use crate::domain::model::CoordinatePair;
use crate::domain::ports::Geocoder;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: Value,
    lon: Value,
    #[serde(default)]
    display_name: Option<String>,
}

pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

// 有些部署回傳字串，有些回傳數字
fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<CoordinatePair>> {
        if address.trim().is_empty() {
            return Ok(None);
        }

        tracing::debug!("Geocoding '{}' via {}", address, self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        tracing::debug!("Geocoder response status: {}", response.status());
        let places: Vec<NominatimPlace> = response.error_for_status()?.json().await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        match (coordinate(&place.lon), coordinate(&place.lat)) {
            (Some(lon), Some(lat)) => {
                if let Some(display_name) = &place.display_name {
                    tracing::debug!("Matched '{}' to {}", address, display_name);
                }
                Ok(Some(CoordinatePair::new(lon, lat)))
            }
            _ => Err(EtlError::GeocodeError {
                address: address.to_string(),
                message: format!("unreadable coordinates lat={} lon={}", place.lat, place.lon),
            }),
        }
    }
}
