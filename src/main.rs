use clap::Parser;
use dealer_etl::adapters::{DuckDuckGoSearch, NominatimGeocoder};
use dealer_etl::config::{load_config, toml_config::TomlConfig, Command};
use dealer_etl::core::{Pipeline, RunReport};
use dealer_etl::utils::error::{ErrorSeverity, EtlError};
use dealer_etl::utils::{logger, validation::Validate};
use dealer_etl::{
    AuditPipeline, CliConfig, EtlEngine, FindWebsitesPipeline, FlipPipeline, LocalStorage,
    MergeWebsitesPipeline, RepairPipeline,
};

fn exit_code(e: &EtlError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 可重試
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn fail(e: &EtlError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e));
}

async fn run<P: Pipeline>(pipeline: P, monitor: bool) -> dealer_etl::Result<RunReport> {
    EtlEngine::new_with_monitoring(pipeline, monitor).run().await
}

async fn dispatch(command: &Command, config: &TomlConfig) -> dealer_etl::Result<RunReport> {
    let storage = LocalStorage::default();
    let monitor = config.monitoring.enabled;

    match command {
        Command::Audit { .. } => run(AuditPipeline::new(storage, config.audit.clone()), monitor).await,
        Command::Repair { .. } => {
            let geocoder = NominatimGeocoder::new(
                config.repair.geocoder_endpoint.clone(),
                &config.http.user_agent,
                config.timeout(),
            )?;
            let pipeline = RepairPipeline::new(storage, geocoder, config.repair.clone());
            run(pipeline, monitor).await
        }
        Command::Flip { .. } => run(FlipPipeline::new(storage, config.flip.clone()), monitor).await,
        Command::FindWebsites { .. } => {
            let search = DuckDuckGoSearch::new(
                config.find_websites.search_endpoint.clone(),
                &config.http.user_agent,
                config.timeout(),
            )?;
            let pipeline = FindWebsitesPipeline::new(storage, search, config.find_websites.clone());
            run(pipeline, monitor).await
        }
        Command::MergeWebsites { .. } => {
            run(MergeWebsitesPipeline::new(storage, config.merge_websites.clone()), monitor).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 載入設定檔，命令列參數優先
    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    cli.apply_overrides(&mut config);

    if config.monitoring.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting dealer-etl {}", env!("CARGO_PKG_VERSION"));
    if cli.verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    match dispatch(&cli.command, &config).await {
        Ok(report) => {
            tracing::info!("✅ {} completed", report.pipeline);
            println!("✅ {} completed", report.pipeline);
            for (counter, value) in &report.counters {
                println!("   {}: {}", counter, value);
            }
            if let Some(path) = &report.output_path {
                println!("📁 Output saved to: {}", path);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
                cli.command.name(),
                e,
                e.category(),
                e.severity()
            );
            fail(&e);
        }
    }

    Ok(())
}
