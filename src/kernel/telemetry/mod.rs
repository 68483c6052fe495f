//! Engine instrumentation.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside decision logic (machine, timers or analyzer).
//!
//! # PRIVACY INVARIANT
//! Events carry no learner content: no nickname, no typed answers.
//! Only phases, identities, durations and counts.

pub mod event;
pub mod metrics;
pub mod recorder;
