use crate::domain::model::{Ticket, Vehicle};
use crate::domain::ports::SecurityObserver;
use crate::utils::error::{ParkingError, Result};
use crate::utils::validation::{validate_positive_number, validate_rate, Validate};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub const DEFAULT_RATE_PER_HOUR: f64 = 5.0;
pub const DEFAULT_ATTENDANT: &str = "Unknown Attendant";
pub const DEFAULT_LOT_NAME: &str = "Lot";
/// Rendered in place of a spot label when a ticket is not held by the lot.
pub const SPOT_NOT_FOUND: &str = "Car not found";

/// Optional details recorded on the ticket at admission.
#[derive(Debug, Clone, Default)]
pub struct AdmitOptions {
    pub row: Option<String>,
    pub entered_at: Option<DateTime<Utc>>,
    pub attendant: Option<String>,
}

impl AdmitOptions {
    pub fn row(mut self, row: impl Into<String>) -> Self {
        self.row = Some(row.into());
        self
    }

    /// Backdate (or postdate) the entry timestamp instead of using the current time.
    pub fn at(mut self, entered_at: DateTime<Utc>) -> Self {
        self.entered_at = Some(entered_at);
        self
    }

    pub fn attendant(mut self, name: impl Into<String>) -> Self {
        self.attendant = Some(name.into());
        self
    }
}

/// A fixed-capacity lot.
///
/// The full sign is cached: `admit` and `release` never touch it, only
/// [`ParkingLot::recompute_sign`] does. Callers that want the sign to follow
/// occupancy must recompute after every change, or use
/// [`ParkingLot::admit_and_recompute`] / [`ParkingLot::release_and_recompute`].
pub struct ParkingLot {
    name: String,
    capacity: usize,
    rate_per_hour: f64,
    parked: HashMap<Vehicle, Ticket>,
    full_sign_displayed: bool,
    observers: Vec<Arc<dyn SecurityObserver>>,
}

impl ParkingLot {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_rate(capacity, DEFAULT_RATE_PER_HOUR)
    }

    pub fn with_rate(capacity: usize, rate_per_hour: f64) -> Result<Self> {
        validate_positive_number("capacity", capacity, 1)?;
        validate_rate("rate_per_hour", rate_per_hour)?;

        Ok(Self {
            name: DEFAULT_LOT_NAME.to_string(),
            capacity,
            rate_per_hour,
            parked: HashMap::with_capacity(capacity),
            full_sign_displayed: false,
            observers: Vec::new(),
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn rate_per_hour(&self) -> f64 {
        self.rate_per_hour
    }

    pub fn register_observer(&mut self, observer: Arc<dyn SecurityObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn admit(&mut self, vehicle: Vehicle) -> Result<Option<Ticket>> {
        self.admit_with(vehicle, AdmitOptions::default())
    }

    /// Parks `vehicle` and issues its ticket.
    ///
    /// Returns `Ok(None)` when the lot is at capacity. A blank plate or a
    /// vehicle already parked here is an error. The spot label is
    /// `Spot_<occupied + 1>` computed from current occupancy, so labels can
    /// repeat after departures.
    pub fn admit_with(&mut self, vehicle: Vehicle, options: AdmitOptions) -> Result<Option<Ticket>> {
        vehicle.validate()?;

        if self.is_full() {
            tracing::debug!(lot = %self.name, plate = vehicle.plate(), "lot is full, no ticket issued");
            return Ok(None);
        }

        if self.parked.contains_key(&vehicle) {
            return Err(ParkingError::AlreadyParked {
                plate: vehicle.plate().to_string(),
            });
        }

        let spot = format!("Spot_{}", self.parked.len() + 1);
        let ticket = Ticket::new(
            spot,
            options.row,
            options.entered_at.unwrap_or_else(Utc::now),
            options
                .attendant
                .unwrap_or_else(|| DEFAULT_ATTENDANT.to_string()),
        );

        tracing::info!(
            lot = %self.name,
            plate = vehicle.plate(),
            spot = ticket.spot(),
            ticket = %ticket.id(),
            "vehicle admitted"
        );
        self.parked.insert(vehicle, ticket.clone());
        Ok(Some(ticket))
    }

    /// [`ParkingLot::admit_with`] followed by [`ParkingLot::recompute_sign`].
    /// The sign is recomputed even when the lot was full and nothing was admitted.
    pub fn admit_and_recompute(&mut self, vehicle: Vehicle, options: AdmitOptions) -> Result<Option<Ticket>> {
        let ticket = self.admit_with(vehicle, options)?;
        self.recompute_sign();
        Ok(ticket)
    }

    pub fn release_and_recompute(&mut self, ticket: &Ticket) -> Option<Vehicle> {
        let vehicle = self.release(ticket);
        self.recompute_sign();
        vehicle
    }

    /// Removes the vehicle holding `ticket`. Tickets match by id only.
    pub fn release(&mut self, ticket: &Ticket) -> Option<Vehicle> {
        let vehicle = self
            .parked
            .iter()
            .find(|(_, held)| *held == ticket)
            .map(|(vehicle, _)| vehicle.clone())?;

        self.parked.remove(&vehicle);
        tracing::info!(lot = %self.name, plate = vehicle.plate(), spot = ticket.spot(), "vehicle released");
        Some(vehicle)
    }

    pub fn locate(&self, ticket: &Ticket) -> Option<&str> {
        self.parked
            .values()
            .find(|held| *held == ticket)
            .map(|held| held.spot())
    }

    pub fn ticket_for(&self, vehicle: &Vehicle) -> Option<&Ticket> {
        self.parked.get(vehicle)
    }

    pub fn parked(&self) -> HashMap<Vehicle, Ticket> {
        self.parked.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vehicle, &Ticket)> {
        self.parked.iter()
    }

    pub fn by_color(&self, color: &str) -> HashMap<Vehicle, String> {
        self.spots_where(|vehicle, _| same_text(vehicle.color(), color))
    }

    pub fn by_make(&self, make: &str) -> HashMap<Vehicle, String> {
        self.spots_where(|vehicle, _| same_text(vehicle.make(), make))
    }

    pub fn by_make_and_color(&self, make: &str, color: &str) -> HashMap<Vehicle, String> {
        self.spots_where(|vehicle, _| {
            same_text(vehicle.make(), make) && same_text(vehicle.color(), color)
        })
    }

    pub fn parked_within(&self, window: Duration) -> HashMap<Vehicle, String> {
        self.parked_within_at(window, Utc::now())
    }

    /// Vehicles whose entry is strictly after `now - window`. A window reaching
    /// past the earliest representable instant has no cutoff at all.
    pub fn parked_within_at(&self, window: Duration, now: DateTime<Utc>) -> HashMap<Vehicle, String> {
        match now.checked_sub_signed(window) {
            Some(cutoff) => self.spots_where(|_, ticket| ticket.entered_at() > cutoff),
            None if window > Duration::zero() => self.spots_where(|_, _| true),
            None => HashMap::new(),
        }
    }

    /// Accessible, compact vehicles whose ticket row is one of `rows`.
    /// Row labels match exactly; tickets without a row never match.
    pub fn accessible_compact_in_rows(&self, rows: &[&str]) -> HashMap<Vehicle, Ticket> {
        self.parked
            .iter()
            .filter(|(vehicle, _)| vehicle.is_accessible() && vehicle.is_compact())
            .filter(|(_, ticket)| ticket.row().is_some_and(|row| rows.contains(&row)))
            .map(|(vehicle, ticket)| (vehicle.clone(), ticket.clone()))
            .collect()
    }

    pub fn occupied(&self) -> usize {
        self.parked.len()
    }

    pub fn free_spaces(&self) -> usize {
        self.capacity.saturating_sub(self.parked.len())
    }

    pub fn is_full(&self) -> bool {
        self.parked.len() >= self.capacity
    }

    /// Stand-in for "has a nearby accessible space"; no spatial model exists.
    pub fn has_nearest_free_space(&self) -> bool {
        !self.is_full()
    }

    pub fn is_full_sign_displayed(&self) -> bool {
        self.full_sign_displayed
    }

    /// Brings the cached full sign in line with occupancy, then notifies every
    /// observer of the current fullness, whether or not the sign changed.
    pub fn recompute_sign(&mut self) {
        let full = self.is_full();

        if full && !self.full_sign_displayed {
            tracing::info!(lot = %self.name, "🅿️ Parking lot is full. Full sign displayed.");
            self.full_sign_displayed = true;
        } else if !full && self.full_sign_displayed {
            tracing::info!(lot = %self.name, "🅿️ Parking lot is not full anymore. Full sign removed.");
            self.full_sign_displayed = false;
        }

        self.notify_observers(full);
    }

    fn notify_observers(&self, is_full: bool) {
        for (index, observer) in self.observers.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_fullness_changed(is_full)));
            if outcome.is_err() {
                tracing::warn!(lot = %self.name, observer = index, "security observer panicked");
            }
        }
    }

    pub fn charge_for(&self, ticket: &Ticket) -> f64 {
        self.charge_for_at(ticket, Utc::now())
    }

    /// Whole hours since entry times the hourly rate. Partial hours and entry
    /// times in the future are free.
    pub fn charge_for_at(&self, ticket: &Ticket, now: DateTime<Utc>) -> f64 {
        let hours = (now - ticket.entered_at()).num_hours().max(0);
        hours as f64 * self.rate_per_hour
    }

    fn spots_where<F>(&self, predicate: F) -> HashMap<Vehicle, String>
    where
        F: Fn(&Vehicle, &Ticket) -> bool,
    {
        self.parked
            .iter()
            .filter(|(vehicle, ticket)| predicate(*vehicle, *ticket))
            .map(|(vehicle, ticket)| (vehicle.clone(), ticket.spot().to_string()))
            .collect()
    }
}

impl fmt::Debug for ParkingLot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParkingLot")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("rate_per_hour", &self.rate_per_hour)
            .field("occupied", &self.parked.len())
            .field("full_sign_displayed", &self.full_sign_displayed)
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn same_text(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::observer::RecordingObserver;

    fn car(plate: &str, color: &str) -> Vehicle {
        Vehicle::new(plate, color, "Brand", "Model", "medium", false)
    }

    fn fill(lot: &mut ParkingLot, count: usize) {
        for i in 0..count {
            lot.admit(car(&format!("CAR{}", i), "AnyColor")).unwrap();
        }
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(ParkingLot::new(0).is_err());
        assert!(ParkingLot::with_rate(1, -5.0).is_err());
    }

    #[test]
    fn test_admit_issues_sequential_spots() {
        let mut lot = ParkingLot::new(10).unwrap();
        let first = lot.admit(car("A1", "Red")).unwrap().unwrap();
        let second = lot.admit(car("A2", "Red")).unwrap().unwrap();

        assert_eq!(first.spot(), "Spot_1");
        assert_eq!(second.spot(), "Spot_2");
        assert_eq!(first.attendant(), DEFAULT_ATTENDANT);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_full_lot_returns_no_ticket() {
        let mut lot = ParkingLot::new(3).unwrap();
        fill(&mut lot, 3);

        let ticket = lot.admit(car("XYZ789", "AnyColor")).unwrap();
        assert!(ticket.is_none());
        assert_eq!(lot.occupied(), 3);
    }

    #[test]
    fn test_blank_plate_is_invalid_input_not_full() {
        let mut lot = ParkingLot::new(1).unwrap();
        let result = lot.admit(car("", "Red"));
        assert!(matches!(result, Err(ParkingError::InvalidVehicle { .. })));
        assert_eq!(lot.occupied(), 0);
    }

    #[test]
    fn test_same_vehicle_cannot_hold_two_tickets() {
        let mut lot = ParkingLot::new(5).unwrap();
        let first = lot.admit(car("DUP1", "Red")).unwrap().unwrap();

        let again = lot.admit(car("DUP1", "Red"));
        assert!(matches!(again, Err(ParkingError::AlreadyParked { .. })));
        assert_eq!(lot.occupied(), 1);
        assert_eq!(lot.locate(&first), Some("Spot_1"));
    }

    #[test]
    fn test_same_plate_different_description_is_allowed() {
        let mut lot = ParkingLot::new(5).unwrap();
        lot.admit(car("SAME", "Red")).unwrap().unwrap();
        assert!(lot.admit(car("SAME", "Blue")).unwrap().is_some());
        assert_eq!(lot.occupied(), 2);
    }

    #[test]
    fn test_spot_labels_follow_current_occupancy() {
        let mut lot = ParkingLot::new(5).unwrap();
        let first = lot.admit(car("L1", "Red")).unwrap().unwrap();
        lot.admit(car("L2", "Red")).unwrap().unwrap();
        lot.release(&first).unwrap();

        let third = lot.admit(car("L3", "Red")).unwrap().unwrap();
        assert_eq!(third.spot(), "Spot_2");
    }

    #[test]
    fn test_release_round_trip() {
        let mut lot = ParkingLot::new(10).unwrap();
        let vehicle = car("GHI789", "AnyColor");
        let ticket = lot.admit(vehicle.clone()).unwrap().unwrap();

        assert_eq!(lot.locate(&ticket), Some(ticket.spot()));
        assert_eq!(lot.release(&ticket), Some(vehicle));
        assert_eq!(lot.locate(&ticket), None);
        assert_eq!(lot.release(&ticket), None);
    }

    #[test]
    fn test_release_with_lookalike_ticket_fails() {
        let mut lot = ParkingLot::new(10).unwrap();
        let ticket = lot.admit(car("REAL1", "Red")).unwrap().unwrap();
        let forged = Ticket::new(
            ticket.spot(),
            None,
            ticket.entered_at(),
            ticket.attendant(),
        );

        assert_eq!(lot.release(&forged), None);
        assert_eq!(lot.locate(&forged), None);
        assert_eq!(lot.occupied(), 1);
    }

    #[test]
    fn test_sign_follows_recompute_only() {
        let mut lot = ParkingLot::new(1).unwrap();
        let ticket = lot.admit(car("JKL012", "AnyColor")).unwrap().unwrap();
        assert!(lot.is_full());
        assert!(!lot.is_full_sign_displayed());

        lot.recompute_sign();
        assert!(lot.is_full_sign_displayed());

        lot.release(&ticket);
        assert!(lot.is_full_sign_displayed());
        lot.recompute_sign();
        assert!(!lot.is_full_sign_displayed());
    }

    #[test]
    fn test_observers_notified_on_every_recompute() {
        let mut lot = ParkingLot::new(1).unwrap();
        let observer = Arc::new(RecordingObserver::new());
        lot.register_observer(observer.clone());

        lot.admit(car("PQR678", "AnyColor")).unwrap();
        lot.recompute_sign();
        lot.recompute_sign();

        assert_eq!(observer.notifications(), 2);
        assert_eq!(observer.last(), Some(true));
    }

    #[test]
    fn test_panicking_observer_does_not_stop_fan_out() {
        struct Exploding;
        impl SecurityObserver for Exploding {
            fn on_fullness_changed(&self, _is_full: bool) {
                panic!("observer failure");
            }
        }

        let mut lot = ParkingLot::new(1).unwrap();
        let recorder = Arc::new(RecordingObserver::new());
        lot.register_observer(Arc::new(Exploding));
        lot.register_observer(recorder.clone());

        lot.admit(car("BOOM1", "Red")).unwrap();
        lot.recompute_sign();

        assert!(lot.is_full_sign_displayed());
        assert_eq!(recorder.last(), Some(true));
    }

    #[test]
    fn test_charge_floors_whole_hours() {
        let lot = ParkingLot::new(10).unwrap();
        let now = Utc::now();

        let one_hour = Ticket::new("S", None, now - Duration::hours(1), "A");
        let almost_two = Ticket::new("S", None, now - Duration::minutes(119), "A");
        let fresh = Ticket::new("S", None, now, "A");
        let future = Ticket::new("S", None, now + Duration::hours(3), "A");

        assert_eq!(lot.charge_for_at(&one_hour, now), DEFAULT_RATE_PER_HOUR);
        assert_eq!(lot.charge_for_at(&almost_two, now), DEFAULT_RATE_PER_HOUR);
        assert_eq!(lot.charge_for_at(&fresh, now), 0.0);
        assert_eq!(lot.charge_for_at(&future, now), 0.0);
    }

    #[test]
    fn test_custom_rate() {
        let lot = ParkingLot::with_rate(10, 2.5).unwrap();
        let now = Utc::now();
        let ticket = Ticket::new("S", None, now - Duration::hours(4), "A");
        assert_eq!(lot.charge_for_at(&ticket, now), 10.0);
    }

    #[test]
    fn test_color_and_make_queries_ignore_case() {
        let mut lot = ParkingLot::new(10).unwrap();
        lot.admit(Vehicle::new("BMW001", "Black", "BMW", "M3", "medium", false)).unwrap();
        lot.admit(Vehicle::new("AUDI001", "Red", "Audi", "A4", "medium", false)).unwrap();
        lot.admit(Vehicle::new("BMW002", "Blue", "bmw", "X5", "large", false)).unwrap();

        assert_eq!(lot.by_make("BMW").len(), 2);
        assert_eq!(lot.by_color("RED").len(), 1);
        assert_eq!(lot.by_make_and_color("bmw", "blue").len(), 1);
        assert!(lot.by_make("Toyota").is_empty());
    }

    #[test]
    fn test_parked_within_window() {
        let mut lot = ParkingLot::new(10).unwrap();
        let now = Utc::now();
        lot.admit_with(
            car("CAR123", "Blue"),
            AdmitOptions::default().at(now - Duration::minutes(20)),
        )
        .unwrap();
        lot.admit_with(
            car("CAR456", "Red"),
            AdmitOptions::default().at(now - Duration::minutes(40)),
        )
        .unwrap();

        let recent = lot.parked_within_at(Duration::minutes(30), now);
        assert_eq!(recent.len(), 1);
        assert!(recent.keys().any(|v| v.plate() == "CAR123"));
    }

    #[test]
    fn test_parked_within_excludes_entry_at_cutoff() {
        let mut lot = ParkingLot::new(10).unwrap();
        let now = Utc::now();
        lot.admit_with(car("EDGE", "Blue"), AdmitOptions::default().at(now - Duration::minutes(30)))
            .unwrap();
        lot.admit_with(
            car("INSIDE", "Blue"),
            AdmitOptions::default().at(now - Duration::minutes(30) + Duration::seconds(1)),
        )
        .unwrap();

        let recent = lot.parked_within_at(Duration::minutes(30), now);
        assert_eq!(recent.len(), 1);
        assert!(recent.keys().all(|v| v.plate() == "INSIDE"));
    }

    #[test]
    fn test_parked_within_zero_window() {
        let mut lot = ParkingLot::new(10).unwrap();
        let now = Utc::now();
        lot.admit_with(car("NOW", "Red"), AdmitOptions::default().at(now)).unwrap();
        lot.admit_with(car("LATER", "Red"), AdmitOptions::default().at(now + Duration::seconds(1)))
            .unwrap();

        let recent = lot.parked_within_at(Duration::zero(), now);
        assert_eq!(recent.len(), 1);
        assert!(recent.keys().all(|v| v.plate() == "LATER"));
    }

    #[test]
    fn test_parked_within_unbounded_window_matches_everything() {
        let mut lot = ParkingLot::new(10).unwrap();
        let now = Utc::now();
        lot.admit_with(car("OLD", "Red"), AdmitOptions::default().at(now - Duration::days(3650)))
            .unwrap();
        lot.admit(car("NEW", "Red")).unwrap();

        assert_eq!(lot.parked_within_at(Duration::MAX, now).len(), 2);
        assert_eq!(lot.parked_within(Duration::MAX).len(), 2);
        assert!(lot.parked_within_at(Duration::MIN, now).is_empty());
    }

    #[test]
    fn test_release_and_recompute_updates_sign() {
        let mut lot = ParkingLot::new(1).unwrap();
        let observer = Arc::new(RecordingObserver::new());
        lot.register_observer(observer.clone());

        let ticket = lot.admit_and_recompute(car("SOLO", "Red"), AdmitOptions::default()).unwrap().unwrap();
        assert!(lot.is_full_sign_displayed());
        assert_eq!(observer.last(), Some(true));

        assert!(lot.release_and_recompute(&ticket).is_some());
        assert!(!lot.is_full_sign_displayed());
        assert_eq!(observer.last(), Some(false));
    }

    #[test]
    fn test_accessible_compact_in_rows() {
        let mut lot = ParkingLot::new(10).unwrap();
        let opts = |row: &str| AdmitOptions::default().row(row);
        lot.admit_with(Vehicle::new("H1", "Blue", "B", "M", "small", true), opts("B")).unwrap();
        lot.admit_with(Vehicle::new("H2", "Red", "B", "M", "large", true), opts("D")).unwrap();
        lot.admit_with(Vehicle::new("H3", "Green", "B", "M", "small", true), opts("D")).unwrap();
        lot.admit_with(Vehicle::new("H4", "Green", "B", "M", "small", false), opts("D")).unwrap();
        lot.admit_with(Vehicle::new("H5", "Green", "B", "M", "small", true), opts("E")).unwrap();
        lot.admit(Vehicle::new("H6", "Green", "B", "M", "small", true)).unwrap();

        let found = lot.accessible_compact_in_rows(&["B", "D"]);
        assert_eq!(found.len(), 2);
        assert!(found.values().all(|t| matches!(t.row(), Some("B") | Some("D"))));
    }

    #[test]
    fn test_space_accounting() {
        let mut lot = ParkingLot::new(4).unwrap();
        fill(&mut lot, 3);
        assert_eq!(lot.free_spaces(), 1);
        assert!(lot.has_nearest_free_space());
        lot.admit(car("LAST", "AnyColor")).unwrap().unwrap();
        assert_eq!(lot.free_spaces(), 0);
        assert!(!lot.has_nearest_free_space());
    }
}
