//! Feed synchronization: the sync pass and the loop that drives it.

mod scheduler;
mod synchronizer;

pub use scheduler::{spawn_scheduler, spawn_with, SchedulerFault, SchedulerHandle};
pub use synchronizer::{metadata_changes, new_item, seed_store, EntryError, Synchronizer};
