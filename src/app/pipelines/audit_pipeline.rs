use super::read_kml;
use crate::config::toml_config::AuditConfig;
use crate::core::kml::KmlDocument;
use crate::core::{Pipeline, Placemark, RunReport, Storage};
use crate::utils::error::Result;

/// Names of placemarks that lack a `<Point>` or any coordinate text.
pub fn missing_points(placemarks: &[Placemark]) -> Vec<String> {
    placemarks
        .iter()
        .filter(|p| !p.has_point || p.coordinate_text().is_none())
        .map(|p| p.display_name().to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditResult {
    pub placemarks: usize,
    pub missing: Vec<String>,
}

pub struct AuditPipeline<S: Storage> {
    storage: S,
    config: AuditConfig,
}

impl<S: Storage> AuditPipeline<S> {
    pub fn new(storage: S, config: AuditConfig) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for AuditPipeline<S> {
    type Extracted = KmlDocument;
    type Transformed = AuditResult;

    fn name(&self) -> &'static str {
        "audit"
    }

    async fn extract(&self) -> Result<KmlDocument> {
        read_kml(&self.storage, &self.config.input).await
    }

    async fn transform(&self, document: KmlDocument) -> Result<AuditResult> {
        let placemarks = document.placemarks();
        Ok(AuditResult {
            placemarks: placemarks.len(),
            missing: missing_points(&placemarks),
        })
    }

    async fn load(&self, result: AuditResult) -> Result<RunReport> {
        if result.missing.is_empty() {
            println!("✅ All {} placemarks have coordinates.", result.placemarks);
        } else {
            println!("Placemarks missing coordinates:");
            for name in &result.missing {
                println!("- {}", name);
            }
        }

        let mut report = RunReport::new(self.name())
            .with_counter("placemarks", result.placemarks)
            .with_counter("missing", result.missing.len());

        if let Some(path) = &self.config.report {
            let mut body = result.missing.join("\n");
            if !body.is_empty() {
                body.push('\n');
            }
            self.storage.write_file(path, body.as_bytes()).await?;
            report = report.with_output(path.clone());
        }

        Ok(report)
    }
}
