use super::read_kml;
use crate::config::toml_config::RepairConfig;
use crate::core::kml::{KmlDocument, XmlStyle};
use crate::core::{Geocoder, Pipeline, Placemark, RunReport, Storage};
use crate::utils::error::Result;
use tokio::time::Instant;

/// Address to geocode: the `<address>` element, else the configured data
/// fields joined with ", ".
pub fn build_address(placemark: &Placemark, fields: &[String]) -> Option<String> {
    if let Some(address) = &placemark.address {
        return Some(address.clone());
    }

    let parts: Vec<&str> = fields
        .iter()
        .filter_map(|field| placemark.data_value(field))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

#[derive(Debug)]
pub struct RepairResult {
    pub document: KmlDocument,
    pub fixed: usize,
    pub geocoded: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct RepairPipeline<S: Storage, G: Geocoder> {
    storage: S,
    geocoder: G,
    config: RepairConfig,
}

impl<S: Storage, G: Geocoder> RepairPipeline<S, G> {
    pub fn new(storage: S, geocoder: G, config: RepairConfig) -> Self {
        Self {
            storage,
            geocoder,
            config,
        }
    }

    /// Wait until `delay` has passed since the previous geocoder call.
    async fn pace(&self, last_call: Option<Instant>) {
        let Some(last_call) = last_call else {
            return;
        };
        let delay = self.config.delay();
        let elapsed = last_call.elapsed();
        if elapsed < delay {
            tokio::time::sleep(delay - elapsed).await;
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, G: Geocoder> Pipeline for RepairPipeline<S, G> {
    type Extracted = KmlDocument;
    type Transformed = RepairResult;

    fn name(&self) -> &'static str {
        "repair"
    }

    async fn extract(&self) -> Result<KmlDocument> {
        read_kml(&self.storage, &self.config.input).await
    }

    async fn transform(&self, mut document: KmlDocument) -> Result<RepairResult> {
        let policy = self.config.policy();
        let mut fixed = 0;
        let mut geocoded = 0;
        let mut skipped = 0;
        let mut failed = 0;
        let mut last_call: Option<Instant> = None;

        for placemark in document.placemarks() {
            let name = placemark.display_name().to_string();

            if let Some(text) = placemark.coordinate_text() {
                match policy.reorder(text) {
                    Some(reordered) if reordered != text => {
                        document.set_coordinates(placemark.index, &reordered)?;
                        tracing::info!("🔧 Fixed coordinates for {}: {} -> {}", name, text, reordered);
                        fixed += 1;
                    }
                    Some(_) => {}
                    None => tracing::debug!("Leaving unparsable coordinates for {}: '{}'", name, text),
                }
                continue;
            }

            let Some(address) = build_address(&placemark, &self.config.address_fields) else {
                tracing::warn!("⚠️ No address for {}, skipping", name);
                skipped += 1;
                continue;
            };

            self.pace(last_call).await;
            let outcome = self.geocoder.geocode(&address).await;
            last_call = Some(Instant::now());

            match outcome {
                Ok(Some(pair)) => {
                    let text = pair.to_kml();
                    document.set_coordinates(placemark.index, &text)?;
                    tracing::info!("📍 Geocoded {}: {}", name, text);
                    geocoded += 1;
                }
                Ok(None) => {
                    tracing::warn!("⚠️ Could not geocode {} ({})", name, address);
                    failed += 1;
                }
                Err(e) => {
                    tracing::warn!("⚠️ Geocoding failed for {} ({}): {}", name, address, e);
                    failed += 1;
                }
            }
        }

        Ok(RepairResult {
            document,
            fixed,
            geocoded,
            skipped,
            failed,
        })
    }

    async fn load(&self, result: RepairResult) -> Result<RunReport> {
        let xml = result.document.to_xml(XmlStyle::Compact)?;
        self.storage
            .write_file(&self.config.output, xml.as_bytes())
            .await?;

        Ok(RunReport::new(self.name())
            .with_output(self.config.output.clone())
            .with_counter("fixed", result.fixed)
            .with_counter("geocoded", result.geocoded)
            .with_counter("skipped", result.skipped)
            .with_counter("failed", result.failed))
    }
}
