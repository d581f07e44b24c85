//! Dashboard broadcast bus & operator-facing realtime channel (component E,
//! the non-REST half). See [`crate::routes`] for the REST surface that
//! shares this bus.

pub mod bus;
pub mod events;
pub mod ws;

pub use bus::{DashboardBus, DashboardFrame};
pub use events::DashboardEvent;
pub use ws::websocket_handler;
