use super::read_kml;
use crate::config::toml_config::FlipConfig;
use crate::core::coords::{flip_in_boxes, parse_pair};
use crate::core::kml::{KmlDocument, XmlStyle};
use crate::core::{Pipeline, RunReport, Storage};
use crate::utils::error::Result;

#[derive(Debug)]
pub struct FlipResult {
    pub document: KmlDocument,
    pub flipped: usize,
    pub unchanged: usize,
    pub unparsable: usize,
}

pub struct FlipPipeline<S: Storage> {
    storage: S,
    config: FlipConfig,
}

impl<S: Storage> FlipPipeline<S> {
    pub fn new(storage: S, config: FlipConfig) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for FlipPipeline<S> {
    type Extracted = KmlDocument;
    type Transformed = FlipResult;

    fn name(&self) -> &'static str {
        "flip"
    }

    async fn extract(&self) -> Result<KmlDocument> {
        read_kml(&self.storage, &self.config.input).await
    }

    async fn transform(&self, mut document: KmlDocument) -> Result<FlipResult> {
        let mut flipped = 0;
        let mut unchanged = 0;
        let mut unparsable = 0;

        for placemark in document.placemarks() {
            let Some(text) = placemark.coordinate_text() else {
                continue;
            };
            let Some(pair) = parse_pair(text) else {
                tracing::debug!(
                    "Skipping unparsable coordinates for {}: '{}'",
                    placemark.display_name(),
                    text
                );
                unparsable += 1;
                continue;
            };

            let outcome = flip_in_boxes(pair, &self.config.boxes);
            if outcome.flipped {
                tracing::info!("🔄 Flipped {}: {} -> {}", placemark.display_name(), text, outcome.text);
                flipped += 1;
            } else {
                unchanged += 1;
            }
            document.set_coordinates(placemark.index, &outcome.text)?;
        }

        Ok(FlipResult {
            document,
            flipped,
            unchanged,
            unparsable,
        })
    }

    async fn load(&self, result: FlipResult) -> Result<RunReport> {
        let style = if self.config.pretty {
            XmlStyle::Pretty
        } else {
            XmlStyle::Compact
        };
        let xml = result.document.to_xml(style)?;
        self.storage
            .write_file(&self.config.output, xml.as_bytes())
            .await?;

        Ok(RunReport::new(self.name())
            .with_output(self.config.output.clone())
            .with_counter("flipped", result.flipped)
            .with_counter("unchanged", result.unchanged)
            .with_counter("unparsable", result.unparsable))
    }
}
