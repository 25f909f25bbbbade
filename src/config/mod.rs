pub mod toml_config;

#[cfg(feature = "cli")]
use crate::app::report::OutputFormat;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "small-parking")]
#[command(about = "Replay arrivals and departures against a parking facility")]
pub struct CliConfig {
    /// Path to TOML facility configuration
    #[arg(short, long, default_value = "parking.toml")]
    pub config: String,

    /// Report format for the final occupancy
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    /// Validate the configuration and show the plan without admitting anything
    #[arg(long)]
    pub dry_run: bool,
}
