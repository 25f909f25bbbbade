use crate::core::shared::SharedLot;
use crate::utils::error::{ParkingError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Tsv,
    Json,
}

/// One parked vehicle, flattened for rendering.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OccupancyRow {
    pub lot: String,
    pub spot: String,
    pub row: String,
    pub plate: String,
    pub color: String,
    pub make: String,
    pub model: String,
    pub size: String,
    pub accessible: bool,
    pub entered_at: DateTime<Utc>,
    pub attendant: String,
    pub ticket_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LotStatus {
    pub lot: String,
    pub capacity: usize,
    pub occupied: usize,
    pub free: usize,
    pub full_sign: bool,
    pub rate_per_hour: f64,
}

pub fn lot_statuses(lots: &[SharedLot]) -> Result<Vec<LotStatus>> {
    lots.iter()
        .map(|shared| -> Result<LotStatus> {
            let lot = shared.lock()?;
            Ok(LotStatus {
                lot: lot.name().to_string(),
                capacity: lot.capacity(),
                occupied: lot.occupied(),
                free: lot.free_spaces(),
                full_sign: lot.is_full_sign_displayed(),
                rate_per_hour: lot.rate_per_hour(),
            })
        })
        .collect()
}

/// Rows in lot order, then by entry time and plate.
pub fn occupancy_rows(lots: &[SharedLot]) -> Result<Vec<OccupancyRow>> {
    let mut rows = Vec::new();

    for shared in lots {
        let lot = shared.lock()?;
        let mut lot_rows: Vec<OccupancyRow> = lot
            .iter()
            .map(|(vehicle, ticket)| OccupancyRow {
                lot: lot.name().to_string(),
                spot: ticket.spot().to_string(),
                row: ticket.row().unwrap_or_default().to_string(),
                plate: vehicle.plate().to_string(),
                color: vehicle.color().to_string(),
                make: vehicle.make().to_string(),
                model: vehicle.model().to_string(),
                size: vehicle.size().to_string(),
                accessible: vehicle.is_accessible(),
                entered_at: ticket.entered_at(),
                attendant: ticket.attendant().to_string(),
                ticket_id: ticket.id().to_string(),
            })
            .collect();
        lot_rows.sort_by(|a, b| a.entered_at.cmp(&b.entered_at).then_with(|| a.plate.cmp(&b.plate)));
        rows.extend(lot_rows);
    }

    Ok(rows)
}

pub fn render(format: OutputFormat, statuses: &[LotStatus], rows: &[OccupancyRow]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(statuses, rows)),
        OutputFormat::Csv => render_delimited(rows, b','),
        OutputFormat::Tsv => render_delimited(rows, b'\t'),
        OutputFormat::Json => {
            let report = serde_json::json!({ "lots": statuses, "parked": rows });
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

fn render_delimited(rows: &[OccupancyRow], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ParkingError::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| ParkingError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn render_table(statuses: &[LotStatus], rows: &[OccupancyRow]) -> String {
    let mut out: String = statuses
        .iter()
        .map(|status| {
            format!(
                "{:<12} {:>3}/{:<3} free {:<3} {}\n",
                status.lot,
                status.occupied,
                status.capacity,
                status.free,
                if status.full_sign { "FULL" } else { "" }
            )
        })
        .collect();

    if rows.is_empty() {
        out.push_str("(no vehicles parked)\n");
        return out;
    }

    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{:<12} {:<8} {:<4} {:<10} {:<8} {:<10} {:<10} {}\n",
            row.lot,
            row.spot,
            row.row,
            row.plate,
            row.color,
            row.make,
            row.model,
            row.entered_at.format("%Y-%m-%d %H:%M")
        ));
    }
    out
}
