//! modemscan - Cable Modem Auto-Discovery and Identification
//!
//! Identifies an unknown residential cable modem well enough to talk
//! to it: which paradigm it speaks (server-rendered HTML, HNAP RPC,
//! REST/JSON), which authentication strategy it requires, and which
//! device-specific decoder should parse its responses.
//!
//! ## Components
//!
//! 1. Signal - evidence units + per-attempt collection
//! 2. PatternIndex - cross-device auth-pattern knowledge base
//! 3. Detector - paradigm/auth classification with fixed weights
//! 4. Decoder - decoder contract, registry, generic HTML fallback
//! 5. Selector - post-auth evidence scoring over candidates
//! 6. AuthClient - probe transport, per-strategy login, session cache
//! 7. Pipeline - single-pass Connectivity → Auth → Selection →
//!    Validation orchestration
//!
//! ## Design Principles
//!
//! - Elimination model: pre-auth evidence rules out, post-auth
//!   evidence identifies
//! - Every stage result is retained; failures are attributable
//! - Shared state (index, registry) is read-only after startup

pub mod auth_client;
pub mod decoder;
pub mod detector;
pub mod error;
pub mod pattern_index;
pub mod pipeline;
pub mod selector;
pub mod signal;

pub use error::{Error, Result};
pub use pipeline::{run_discovery_pipeline, DiscoveryPipeline, DiscoveryPipelineResult};
