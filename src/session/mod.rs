pub mod config;
pub mod coordinator;

pub use config::SessionConfig;
pub use coordinator::SessionCoordinator;
