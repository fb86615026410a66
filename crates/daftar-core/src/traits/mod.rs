//! Collaborator seams the scheduler is wired against.

pub mod bus;
pub mod store;

pub use bus::{LiveBus, LivePayload, PublishOutcome};
pub use store::{DebtStore, NotificationStore};
