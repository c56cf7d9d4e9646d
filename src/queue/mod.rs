pub mod entry;
pub mod events;
pub mod manager;

pub use entry::{EntryId, EntryStatus, QueueEntry};
pub use events::{QueueEvent, StatusState};
pub use manager::QueueController;
