//! Managed relays
//!
//! Provides `RelayManager` for starting, monitoring, and controlling
//! multiple relays with bounded output buffering, live following, and
//! automatic cleanup.
//!
//! # Module Structure
//!
//! - `relay_manager` - Core `RelayManager` with public API
//! - `session` - Active and completed relay structures
//! - `background` - Output collector task

mod background;
mod relay_manager;
mod session;

pub use relay_manager::RelayManager;
