use crate::config::toml_config::FindWebsitesConfig;
use crate::core::geojson::FeatureCollection;
use crate::core::table::write_rows;
use crate::core::{Pipeline, RunReport, Storage, WebSearch, WebsiteRow};
use crate::utils::error::Result;
use crate::utils::text;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// `name` plus one randomly chosen suffix.
pub fn compose_query(name: &str, suffixes: &[String]) -> String {
    match suffixes.choose(&mut rand::thread_rng()) {
        Some(suffix) => format!("{}{}", name, suffix),
        None => name.to_string(),
    }
}

/// `base_ms` plus up to `jitter_ms` of uniform noise.
pub fn jittered_delay(base_ms: u64, jitter_ms: u64) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
    Duration::from_millis(base_ms + jitter)
}

pub struct FindWebsitesPipeline<S: Storage, W: WebSearch> {
    storage: S,
    search: W,
    config: FindWebsitesConfig,
}

impl<S: Storage, W: WebSearch> FindWebsitesPipeline<S, W> {
    pub fn new(storage: S, search: W, config: FindWebsitesConfig) -> Self {
        Self {
            storage,
            search,
            config,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, W: WebSearch> Pipeline for FindWebsitesPipeline<S, W> {
    type Extracted = Vec<String>;
    type Transformed = Vec<WebsiteRow>;

    fn name(&self) -> &'static str {
        "find-websites"
    }

    async fn extract(&self) -> Result<Vec<String>> {
        tracing::info!("🔍 Loading {} ...", self.config.input);
        let bytes = self.storage.read_file(&self.config.input).await?;
        let (content, _) = text::decode(&bytes)?;
        let collection = FeatureCollection::parse(&content)?;

        let names = collection.business_names();
        tracing::info!(
            "Found {} named businesses in {} features",
            names.len(),
            collection.feature_count()
        );
        Ok(names)
    }

    async fn transform(&self, names: Vec<String>) -> Result<Vec<WebsiteRow>> {
        let policy = self.config.selection();
        let total = names.len();
        let mut rows = Vec::with_capacity(total);

        for (i, name) in names.iter().enumerate() {
            let query = compose_query(name, &self.config.query_suffixes);
            tracing::info!("[{}/{}] Searching: {}", i + 1, total, query);

            let candidate = match self.search.search(&query, self.config.max_results).await {
                Ok(hits) => policy.select(name, &hits),
                Err(e) => {
                    tracing::warn!("⚠️ Search failed for {}: {}", name, e);
                    Default::default()
                }
            };

            if candidate.is_empty() {
                tracing::info!("  ↳ no website found");
            } else {
                tracing::info!("  ↳ {} ({:.2})", candidate.url, candidate.confidence);
            }
            rows.push(WebsiteRow::from_candidate(name, candidate));

            let delay = jittered_delay(self.config.delay_base_ms, self.config.delay_jitter_ms);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(rows)
    }

    async fn load(&self, rows: Vec<WebsiteRow>) -> Result<RunReport> {
        let data = write_rows(&rows)?;
        self.storage.write_file(&self.config.output, &data).await?;

        let matched = rows.iter().filter(|row| !row.domain.is_empty()).count();
        let strong = rows
            .iter()
            .filter(|row| !row.domain.is_empty() && row.confidence >= self.config.strong_match)
            .count();

        Ok(RunReport::new(self.name())
            .with_output(self.config.output.clone())
            .with_counter("names", rows.len())
            .with_counter("matched", matched)
            .with_counter("strong", strong)
            .with_counter("unmatched", rows.len() - matched))
    }
}
