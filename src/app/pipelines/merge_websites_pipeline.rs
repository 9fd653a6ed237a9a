use crate::config::toml_config::MergeWebsitesConfig;
use crate::core::geojson::FeatureCollection;
use crate::core::table::{load_lookup, WebsiteLookup};
use crate::core::{Pipeline, RunReport, Storage};
use crate::utils::error::Result;
use crate::utils::text::{self, TextEncoding};

#[derive(Debug)]
pub struct MergeInput {
    pub collection: FeatureCollection,
    pub encoding: TextEncoding,
    pub lookup: WebsiteLookup,
}

#[derive(Debug)]
pub struct MergeResult {
    pub collection: FeatureCollection,
    pub encoding: TextEncoding,
    pub lookup_entries: usize,
    pub skipped_rows: usize,
    pub updated: usize,
}

pub struct MergeWebsitesPipeline<S: Storage> {
    storage: S,
    config: MergeWebsitesConfig,
}

impl<S: Storage> MergeWebsitesPipeline<S> {
    pub fn new(storage: S, config: MergeWebsitesConfig) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for MergeWebsitesPipeline<S> {
    type Extracted = MergeInput;
    type Transformed = MergeResult;

    fn name(&self) -> &'static str {
        "merge-websites"
    }

    async fn extract(&self) -> Result<MergeInput> {
        tracing::info!("🔍 Loading {} ...", self.config.input);
        let bytes = self.storage.read_file(&self.config.input).await?;
        let (content, encoding) = text::decode(&bytes)?;
        tracing::debug!("{} is {:?}", self.config.input, encoding);
        let collection = FeatureCollection::parse(&content)?;

        tracing::info!("🔍 Loading {} ...", self.config.lookup);
        let table = self.storage.read_file(&self.config.lookup).await?;
        let lookup = load_lookup(&table, self.config.confidence_threshold)?;
        tracing::info!(
            "{} websites above confidence {}",
            lookup.urls.len(),
            self.config.confidence_threshold
        );

        Ok(MergeInput {
            collection,
            encoding,
            lookup,
        })
    }

    async fn transform(&self, input: MergeInput) -> Result<MergeResult> {
        let MergeInput {
            mut collection,
            encoding,
            lookup,
        } = input;

        let updated = collection.apply_websites(&lookup.urls);

        Ok(MergeResult {
            collection,
            encoding,
            lookup_entries: lookup.urls.len(),
            skipped_rows: lookup.skipped_rows,
            updated,
        })
    }

    async fn load(&self, result: MergeResult) -> Result<RunReport> {
        let json = result.collection.to_pretty_string()?;
        let data = text::encode(&json, result.encoding);
        self.storage.write_file(&self.config.output, &data).await?;

        Ok(RunReport::new(self.name())
            .with_output(self.config.output.clone())
            .with_counter("lookup_entries", result.lookup_entries)
            .with_counter("updated", result.updated)
            .with_counter("skipped_rows", result.skipped_rows))
    }
}
