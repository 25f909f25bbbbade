use crate::utils::error::{ParkingError, Result};
use crate::utils::validation::Validate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Size class tag for vehicles whose size fits the compact spaces.
pub const COMPACT_SIZE: &str = "small";

/// Immutable description of a vehicle. Equality covers every field, plate included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vehicle {
    plate: String,
    color: String,
    make: String,
    model: String,
    size: String,
    accessible: bool,
}

impl Vehicle {
    pub fn new(
        plate: impl Into<String>,
        color: impl Into<String>,
        make: impl Into<String>,
        model: impl Into<String>,
        size: impl Into<String>,
        accessible: bool,
    ) -> Self {
        Self {
            plate: plate.into(),
            color: color.into(),
            make: make.into(),
            model: model.into(),
            size: size.into(),
            accessible,
        }
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn make(&self) -> &str {
        &self.make
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    pub fn is_compact(&self) -> bool {
        self.size.to_lowercase() == COMPACT_SIZE
    }
}

impl Validate for Vehicle {
    fn validate(&self) -> Result<()> {
        if self.plate.trim().is_empty() {
            return Err(ParkingError::InvalidVehicle {
                reason: "license plate cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {} {})", self.plate, self.color, self.make, self.model)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Proof of entry. Two tickets are the same ticket only when their ids match,
/// whatever the rest of their content says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    spot: String,
    row: Option<String>,
    entered_at: DateTime<Utc>,
    attendant: String,
}

impl Ticket {
    pub fn new(
        spot: impl Into<String>,
        row: Option<String>,
        entered_at: DateTime<Utc>,
        attendant: impl Into<String>,
    ) -> Self {
        Self {
            id: TicketId::generate(),
            spot: spot.into(),
            row,
            entered_at,
            attendant: attendant.into(),
        }
    }

    pub fn id(&self) -> TicketId {
        self.id
    }

    pub fn spot(&self) -> &str {
        &self.spot
    }

    pub fn row(&self) -> Option<&str> {
        self.row.as_deref()
    }

    pub fn entered_at(&self) -> DateTime<Utc> {
        self.entered_at
    }

    pub fn attendant(&self) -> &str {
        &self.attendant
    }
}

impl PartialEq for Ticket {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Ticket {}

impl Hash for Ticket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
