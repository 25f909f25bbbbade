use clap::Parser;
use small_parking::app::report;
use small_parking::utils::error::{ErrorSeverity, ParkingError};
use small_parking::utils::logger::{self, LogFormat};
use small_parking::utils::validation::Validate;
use small_parking::{CliConfig, Facility, FacilityConfig};

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let log_format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(log_format, cli.verbose)?;

    tracing::info!("🚀 Starting small-parking");
    tracing::info!("📁 Loading configuration from: {}", cli.config);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match FacilityConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    tracing::info!(
        "✅ Facility '{}': {} lots, {} spaces, {} arrivals, {} departures",
        config.facility.name,
        config.lots.len(),
        config.total_capacity(),
        config.arrivals.len(),
        config.departures.len()
    );

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No vehicles will be admitted");
        for lot in &config.lots {
            println!("{:<12} capacity {:<4} rate {:.2}/h", lot.name, lot.capacity, lot.rate_per_hour());
        }
        return Ok(());
    }

    let facility = Facility::from_config(&config).unwrap_or_else(|e| fail(&e));
    let summary = facility.run(&config).unwrap_or_else(|e| fail(&e));

    for receipt in &summary.departures {
        tracing::info!(
            "💵 {} left {} ({}) after {}h: {:.2}",
            receipt.plate,
            receipt.lot,
            receipt.spot,
            receipt.hours_charged,
            receipt.charge
        );
    }

    let statuses = report::lot_statuses(facility.lots())?;
    let rows = report::occupancy_rows(facility.lots())?;
    let rendered = report::render(cli.format, &statuses, &rows)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            tracing::info!("📁 Report saved to: {}", path);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn fail(e: &ParkingError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
