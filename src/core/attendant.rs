use crate::core::lot::AdmitOptions;
use crate::core::shared::SharedLot;
use crate::domain::model::{Ticket, Vehicle};
use crate::utils::error::Result;
use serde::Serialize;

/// Which placement rule applies to a vehicle. Accessibility wins over size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlacementRule {
    /// First lot, in attendant order, with a free space nearby.
    Accessible,
    /// Lot with the most free spaces.
    Oversized,
    /// Lot with the fewest parked vehicles.
    Standard,
}

impl PlacementRule {
    pub fn from_flags(needs_accessible: bool, is_oversized: bool) -> Self {
        if needs_accessible {
            Self::Accessible
        } else if is_oversized {
            Self::Oversized
        } else {
            Self::Standard
        }
    }
}

/// Point-in-time occupancy of one lot, as seen by the selection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotLoad {
    pub occupied: usize,
    pub capacity: usize,
}

impl LotLoad {
    pub fn free_spaces(&self) -> usize {
        self.capacity.saturating_sub(self.occupied)
    }

    pub fn has_nearest_free_space(&self) -> bool {
        self.occupied < self.capacity
    }
}

/// Picks a lot index for `rule`. Ties go to the earliest lot.
pub fn select(rule: PlacementRule, loads: &[LotLoad]) -> Option<usize> {
    match rule {
        PlacementRule::Accessible => loads.iter().position(LotLoad::has_nearest_free_space),
        PlacementRule::Oversized => {
            let mut best: Option<(usize, usize)> = None;
            for (index, load) in loads.iter().enumerate() {
                let free = load.free_spaces();
                if best.map_or(true, |(_, most)| free > most) {
                    best = Some((index, free));
                }
            }
            best.map(|(index, _)| index)
        }
        PlacementRule::Standard => {
            let mut best: Option<(usize, usize)> = None;
            for (index, load) in loads.iter().enumerate() {
                if best.map_or(true, |(_, fewest)| load.occupied < fewest) {
                    best = Some((index, load.occupied));
                }
            }
            best.map(|(index, _)| index)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub lot_index: usize,
    pub ticket: Ticket,
}

/// Coordinates placement across lots it does not own.
#[derive(Debug, Clone)]
pub struct Attendant {
    name: String,
    lots: Vec<SharedLot>,
}

impl Attendant {
    pub fn new(name: impl Into<String>, lots: Vec<SharedLot>) -> Self {
        Self {
            name: name.into(),
            lots,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lots(&self) -> &[SharedLot] {
        &self.lots
    }

    pub fn loads(&self) -> Result<Vec<LotLoad>> {
        self.lots
            .iter()
            .map(|lot| -> Result<LotLoad> {
                let lot = lot.lock()?;
                Ok(LotLoad {
                    occupied: lot.occupied(),
                    capacity: lot.capacity(),
                })
            })
            .collect()
    }

    pub fn select_lot(&self, rule: PlacementRule) -> Result<Option<usize>> {
        Ok(select(rule, &self.loads()?))
    }

    pub fn assign(
        &self,
        vehicle: Vehicle,
        needs_accessible: bool,
        is_oversized: bool,
    ) -> Result<Option<Assignment>> {
        self.assign_with(vehicle, needs_accessible, is_oversized, AdmitOptions::default())
    }

    /// Selects a lot and admits `vehicle` there, recomputing that lot's sign
    /// under the same lock. The ticket carries this attendant's name. Returns
    /// `Ok(None)` when no lot qualifies or the chosen lot turns out to be full.
    pub fn assign_with(
        &self,
        vehicle: Vehicle,
        needs_accessible: bool,
        is_oversized: bool,
        options: AdmitOptions,
    ) -> Result<Option<Assignment>> {
        let rule = PlacementRule::from_flags(needs_accessible, is_oversized);
        let Some(lot_index) = self.select_lot(rule)? else {
            tracing::info!(attendant = %self.name, plate = vehicle.plate(), ?rule, "no eligible lot");
            return Ok(None);
        };

        tracing::debug!(attendant = %self.name, plate = vehicle.plate(), ?rule, lot_index, "lot selected");
        let options = options.attendant(self.name.clone());
        let ticket = self.lots[lot_index].admit_and_update_sign(vehicle, options)?;

        Ok(ticket.map(|ticket| Assignment { lot_index, ticket }))
    }
}
