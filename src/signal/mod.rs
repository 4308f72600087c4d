//! Signal model
//!
//! Evidence collection for the discovery pipeline. Signals are pure
//! facts: they never mutate once created, and the per-attempt
//! `DiscoveryResult` only ever appends.

mod types;

pub use types::{DiscoveryResult, Signal, SignalKind, AUTH_KINDS, PARADIGM_KINDS};
