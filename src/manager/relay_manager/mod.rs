//! Relay manager implementation
//!
//! This module is organized into logical submodules:
//! - `core`: Core struct, constructors, and lifecycle management
//! - `spawn`: Relay start logic
//! - `info`: Single relay queries
//! - `output`: Output retrieval with pagination
//! - `list`: Relay listing
//! - `interaction`: Stop, terminate and follow
//! - `pagination`: Pagination utilities

mod core;
mod info;
mod interaction;
mod list;
mod output;
mod pagination;
mod spawn;

pub use core::RelayManager;
