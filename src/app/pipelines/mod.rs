pub mod audit_pipeline;
pub mod find_websites_pipeline;
pub mod flip_pipeline;
pub mod merge_websites_pipeline;
pub mod repair_pipeline;

pub use audit_pipeline::AuditPipeline;
pub use find_websites_pipeline::FindWebsitesPipeline;
pub use flip_pipeline::FlipPipeline;
pub use merge_websites_pipeline::MergeWebsitesPipeline;
pub use repair_pipeline::RepairPipeline;

use crate::core::kml::KmlDocument;
use crate::core::Storage;
use crate::utils::error::Result;
use crate::utils::text;

pub(crate) async fn read_kml<S: Storage>(storage: &S, path: &str) -> Result<KmlDocument> {
    tracing::info!("🔍 Loading {} ...", path);
    let bytes = storage.read_file(path).await?;
    let (content, _) = text::decode(&bytes)?;
    KmlDocument::parse(&content)
}
