use crate::config::toml_config::{ArrivalConfig, FacilityConfig};
use crate::core::attendant::Attendant;
use crate::core::lot::{AdmitOptions, ParkingLot};
use crate::core::observer::LoggingObserver;
use crate::core::shared::SharedLot;
use crate::domain::model::{Ticket, Vehicle};
use crate::utils::error::{ErrorCategory, ParkingError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArrivalOutcome {
    Admitted { plate: String, lot: String, spot: String },
    NoSpace { plate: String },
    Rejected { plate: String, reason: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DepartureReceipt {
    pub plate: String,
    pub lot: String,
    pub spot: String,
    pub hours_charged: i64,
    pub charge: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub arrivals: Vec<ArrivalOutcome>,
    pub departures: Vec<DepartureReceipt>,
    pub unknown_departures: Vec<String>,
}

impl SessionSummary {
    pub fn admitted(&self) -> usize {
        self.arrivals
            .iter()
            .filter(|a| matches!(a, ArrivalOutcome::Admitted { .. }))
            .count()
    }

    pub fn total_charged(&self) -> f64 {
        self.departures.iter().map(|d| d.charge).sum()
    }
}

/// Lots plus the attendant that places vehicles into them.
#[derive(Debug, Clone)]
pub struct Facility {
    name: String,
    attendant: Attendant,
}

impl Facility {
    pub fn new(name: impl Into<String>, attendant: Attendant) -> Self {
        Self {
            name: name.into(),
            attendant,
        }
    }

    /// Builds every configured lot with a logging observer attached.
    pub fn from_config(config: &FacilityConfig) -> Result<Self> {
        let lots = config
            .lots
            .iter()
            .map(|lot_config| -> Result<SharedLot> {
                let mut lot = ParkingLot::with_rate(lot_config.capacity, lot_config.rate_per_hour())?
                    .named(lot_config.name.clone());
                lot.register_observer(Arc::new(LoggingObserver::new(lot_config.name.clone())));
                Ok(SharedLot::new(lot))
            })
            .collect::<Result<Vec<_>>>()?;

        let attendant = Attendant::new(config.attendant_name()?, lots);
        Ok(Self::new(config.facility.name.clone(), attendant))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attendant(&self) -> &Attendant {
        &self.attendant
    }

    pub fn lots(&self) -> &[SharedLot] {
        self.attendant.lots()
    }

    pub fn run(&self, config: &FacilityConfig) -> Result<SessionSummary> {
        self.run_at(config, Utc::now())
    }

    /// Replays arrivals, then departures, against the facility as of `now`.
    pub fn run_at(&self, config: &FacilityConfig, now: DateTime<Utc>) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();

        for arrival in &config.arrivals {
            summary.arrivals.push(self.arrive(arrival, now)?);
        }

        for departure in &config.departures {
            match self.depart(&departure.plate, now)? {
                Some(receipt) => summary.departures.push(receipt),
                None => {
                    tracing::warn!(plate = %departure.plate, "departure for a vehicle that is not parked");
                    summary.unknown_departures.push(departure.plate.clone());
                }
            }
        }

        tracing::info!(
            facility = %self.name,
            admitted = summary.admitted(),
            departed = summary.departures.len(),
            "session complete"
        );
        Ok(summary)
    }

    /// Assigns the arrival through the attendant, which also updates the chosen
    /// lot's sign. Input problems are reported in the outcome instead of
    /// aborting the session; an unrepresentable entry time is a config error.
    pub fn arrive(&self, arrival: &ArrivalConfig, now: DateTime<Utc>) -> Result<ArrivalOutcome> {
        let vehicle = Vehicle::new(
            arrival.plate.clone(),
            arrival.color.clone(),
            arrival.make.clone(),
            arrival.model.clone(),
            arrival.size.clone(),
            arrival.accessible,
        );

        let mut options = AdmitOptions::default().at(entry_time(arrival, now)?);
        if let Some(row) = &arrival.row {
            options = options.row(row.clone());
        }

        let plate = arrival.plate.clone();
        let assignment = match self.attendant.assign_with(
            vehicle,
            arrival.needs_accessible(),
            arrival.oversized,
            options,
        ) {
            Ok(assignment) => assignment,
            Err(e) if e.category() == ErrorCategory::Input => {
                tracing::warn!(plate = %plate, error = %e, "arrival rejected");
                return Ok(ArrivalOutcome::Rejected {
                    plate,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let Some(assignment) = assignment else {
            return Ok(ArrivalOutcome::NoSpace { plate });
        };

        let lot = self.lots()[assignment.lot_index].lock()?.name().to_string();

        Ok(ArrivalOutcome::Admitted {
            plate,
            lot,
            spot: assignment.ticket.spot().to_string(),
        })
    }

    /// Charges and releases the vehicle with `plate` from the first lot holding
    /// one. Lookup, release and the sign update share one lock acquisition.
    pub fn depart(&self, plate: &str, now: DateTime<Utc>) -> Result<Option<DepartureReceipt>> {
        for shared in self.lots() {
            let mut lot = shared.lock()?;
            let Some(ticket) = find_ticket(lot.iter(), plate) else {
                continue;
            };

            let hours_charged = (now - ticket.entered_at()).num_hours().max(0);
            let charge = lot.charge_for_at(&ticket, now);
            lot.release_and_recompute(&ticket);

            return Ok(Some(DepartureReceipt {
                plate: plate.to_string(),
                lot: lot.name().to_string(),
                spot: ticket.spot().to_string(),
                hours_charged,
                charge,
            }));
        }
        Ok(None)
    }
}

fn entry_time(arrival: &ArrivalConfig, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let minutes = arrival.parked_minutes_ago.unwrap_or(0);
    TimeDelta::try_minutes(minutes)
        .and_then(|ago| now.checked_sub_signed(ago))
        .ok_or_else(|| ParkingError::InvalidConfigValueError {
            field: "arrivals.parked_minutes_ago".to_string(),
            value: minutes.to_string(),
            reason: format!("entry time for {} is out of range", arrival.plate),
        })
}

fn find_ticket<'a, I>(parked: I, plate: &str) -> Option<Ticket>
where
    I: Iterator<Item = (&'a Vehicle, &'a Ticket)>,
{
    parked
        .filter(|(vehicle, _)| vehicle.plate().eq_ignore_ascii_case(plate))
        .min_by_key(|(_, ticket)| ticket.entered_at())
        .map(|(_, ticket)| ticket.clone())
}
