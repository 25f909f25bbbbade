// Domain layer: vehicles, tickets and the observer port. No dependencies beyond serde/chrono/uuid.

pub mod model;
pub mod ports;
