pub mod analyzer;
pub mod cancel;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod feed;
pub mod machine;
pub mod phase;
pub mod reactor;
pub mod state;
pub mod telemetry;
pub mod time;
pub mod timers;
