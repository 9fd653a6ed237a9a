pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use std::path::Path;
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

/// Picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "dealer-etl.toml";

/// Load `path`, or the default file if it exists, or the built-in defaults.
pub fn load_config(path: Option<&str>) -> Result<TomlConfig> {
    match path {
        Some(path) => TomlConfig::from_file(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => TomlConfig::from_file(DEFAULT_CONFIG_FILE),
        None => Ok(TomlConfig::default()),
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "dealer-etl")]
#[command(about = "Batch tools for cleaning and enriching dealer location datasets")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, global = true, help = "Log process CPU and memory usage per phase")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List placemarks that have no point coordinates
    Audit {
        #[arg(long)]
        input: Option<String>,
        /// Also write the names to this file
        #[arg(long)]
        report: Option<String>,
    },
    /// Fix swapped coordinates and geocode placemarks without any
    Repair {
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        output: Option<String>,
        /// Pause between geocoder requests, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Swap lon/lat for points inside the configured boxes
    Flip {
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        output: Option<String>,
        /// Keep the original layout instead of pretty-printing
        #[arg(long)]
        compact: bool,
    },
    /// Search the web for each business and write a CSV of guesses
    FindWebsites {
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        output: Option<String>,
        #[arg(long)]
        max_results: Option<usize>,
    },
    /// Copy website guesses into the GeoJSON `Website` property
    MergeWebsites {
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        lookup: Option<String>,
        #[arg(long)]
        output: Option<String>,
        #[arg(long)]
        threshold: Option<f64>,
    },
}

#[cfg(feature = "cli")]
impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Audit { .. } => "audit",
            Command::Repair { .. } => "repair",
            Command::Flip { .. } => "flip",
            Command::FindWebsites { .. } => "find-websites",
            Command::MergeWebsites { .. } => "merge-websites",
        }
    }
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Command-line values win over the configuration file.
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        if self.monitor {
            config.monitoring.enabled = true;
        }
        if self.log_json {
            config.monitoring.json_logs = true;
        }

        match &self.command {
            Command::Audit { input, report } => {
                set(&mut config.audit.input, input);
                if report.is_some() {
                    config.audit.report = report.clone();
                }
            }
            Command::Repair {
                input,
                output,
                delay_ms,
            } => {
                set(&mut config.repair.input, input);
                set(&mut config.repair.output, output);
                set(&mut config.repair.delay_ms, delay_ms);
            }
            Command::Flip {
                input,
                output,
                compact,
            } => {
                set(&mut config.flip.input, input);
                set(&mut config.flip.output, output);
                if *compact {
                    config.flip.pretty = false;
                }
            }
            Command::FindWebsites {
                input,
                output,
                max_results,
            } => {
                set(&mut config.find_websites.input, input);
                set(&mut config.find_websites.output, output);
                set(&mut config.find_websites.max_results, max_results);
            }
            Command::MergeWebsites {
                input,
                lookup,
                output,
                threshold,
            } => {
                set(&mut config.merge_websites.input, input);
                set(&mut config.merge_websites.lookup, lookup);
                set(&mut config.merge_websites.output, output);
                set(&mut config.merge_websites.confidence_threshold, threshold);
            }
        }
    }
}
