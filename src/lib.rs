pub mod config;
pub mod kernel;
pub mod services;

// Re-export specific items for convenient access
pub use config::EngineConfig;
pub use kernel::event::{Command, ModeRequest, SessionEvent, StartRequest};
pub use kernel::machine::SessionMachine;
pub use kernel::reactor::{Reactor, SessionObserver};
