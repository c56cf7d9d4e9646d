pub mod actor;
pub mod messages;

pub use actor::BackendActor;
pub use messages::BackendCommand;
