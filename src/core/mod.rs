pub mod attendant;
pub mod lot;
pub mod observer;
pub mod shared;

pub use crate::domain::model::{Ticket, TicketId, Vehicle};
pub use crate::domain::ports::SecurityObserver;
pub use crate::utils::error::Result;
