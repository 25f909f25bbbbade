use crate::core::lot::{AdmitOptions, ParkingLot};
use crate::domain::model::{Ticket, Vehicle};
use crate::utils::error::{ParkingError, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// A lot shared between an attendant and other callers.
///
/// Each lot has its own lock; nothing ever holds two lot locks at once.
#[derive(Debug, Clone)]
pub struct SharedLot {
    inner: Arc<Mutex<ParkingLot>>,
}

impl SharedLot {
    pub fn new(lot: ParkingLot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(lot)),
        }
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, ParkingLot>> {
        self.inner.lock().map_err(|_| ParkingError::LockPoisoned)
    }

    /// Admits and recomputes the sign under one lock acquisition.
    pub fn admit_and_update_sign(&self, vehicle: Vehicle, options: AdmitOptions) -> Result<Option<Ticket>> {
        self.lock()?.admit_and_recompute(vehicle, options)
    }

    /// Releases and recomputes the sign under one lock acquisition.
    pub fn release_and_update_sign(&self, ticket: &Ticket) -> Result<Option<Vehicle>> {
        Ok(self.lock()?.release_and_recompute(ticket))
    }

    pub fn ptr_eq(&self, other: &SharedLot) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<ParkingLot> for SharedLot {
    fn from(lot: ParkingLot) -> Self {
        Self::new(lot)
    }
}
