//! # Daftar Channels
//!
//! Implementations of the `LiveBus` seam. The in-app bus is the transport
//! the reminder scheduler publishes on; the UI gateway subscribes per user
//! and forwards payloads to connected clients.

pub mod in_app;

pub use in_app::InAppBus;
