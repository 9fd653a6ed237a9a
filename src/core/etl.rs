use crate::core::Pipeline;
use crate::domain::model::RunReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunReport> {
        let name = self.pipeline.name();
        tracing::info!("🚀 Starting {} pipeline", name);
        if self.monitor.is_enabled() {
            tracing::info!("🔍 System monitoring enabled");
        }
        self.monitor.log_stats("Start");

        tracing::debug!("[{}] extracting", name);
        let extracted = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        tracing::debug!("[{}] transforming", name);
        let transformed = self.pipeline.transform(extracted).await?;
        self.monitor.log_stats("Transform");

        tracing::debug!("[{}] loading", name);
        let report = self.pipeline.load(transformed).await?.finish();
        self.monitor.log_stats("Load");

        for (counter, value) in &report.counters {
            tracing::info!("  ↳ {} {}", value, counter);
        }
        if let Some(path) = &report.output_path {
            tracing::info!("📁 Output saved to: {}", path);
        }
        self.monitor.log_final_stats();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingPipeline {
        phases: Mutex<Vec<&'static str>>,
        fail_transform: bool,
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        type Extracted = Vec<u32>;
        type Transformed = u32;

        fn name(&self) -> &'static str {
            "recording"
        }

        async fn extract(&self) -> Result<Vec<u32>> {
            self.phases.lock().unwrap().push("extract");
            Ok(vec![1, 2, 3])
        }

        async fn transform(&self, data: Vec<u32>) -> Result<u32> {
            self.phases.lock().unwrap().push("transform");
            if self.fail_transform {
                return Err(crate::utils::error::EtlError::ProcessingError {
                    message: "boom".to_string(),
                });
            }
            Ok(data.iter().sum())
        }

        async fn load(&self, total: u32) -> Result<RunReport> {
            self.phases.lock().unwrap().push("load");
            Ok(RunReport::new(self.name()).with_counter("total", total as usize))
        }
    }

    #[tokio::test]
    async fn test_engine_runs_phases_in_order() {
        let engine = EtlEngine::new(RecordingPipeline {
            phases: Mutex::new(Vec::new()),
            fail_transform: false,
        });

        let report = engine.run().await.unwrap();

        assert_eq!(report.counter("total"), Some(6));
        assert!(report.finished_at.is_some());
        assert_eq!(
            *engine.pipeline().phases.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
    }

    #[tokio::test]
    async fn test_engine_stops_before_load_on_error() {
        let engine = EtlEngine::new(RecordingPipeline {
            phases: Mutex::new(Vec::new()),
            fail_transform: true,
        });

        assert!(engine.run().await.is_err());
        assert_eq!(
            *engine.pipeline().phases.lock().unwrap(),
            vec!["extract", "transform"]
        );
    }
}
