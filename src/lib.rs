pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::session::{Facility, SessionSummary};
pub use config::toml_config::FacilityConfig;
pub use core::{
    attendant::{Assignment, Attendant, PlacementRule},
    lot::{AdmitOptions, ParkingLot, DEFAULT_RATE_PER_HOUR, SPOT_NOT_FOUND},
    observer::{LoggingObserver, RecordingObserver},
    shared::SharedLot,
};
pub use domain::model::{Ticket, TicketId, Vehicle};
pub use domain::ports::SecurityObserver;
pub use utils::error::{ParkingError, Result};
