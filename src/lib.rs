pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::pipelines::{
    AuditPipeline, FindWebsitesPipeline, FlipPipeline, MergeWebsitesPipeline, RepairPipeline,
};
pub use config::cli::LocalStorage;
pub use core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};
