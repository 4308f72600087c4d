//! Probe transport and authentication
//!
//! The `ProbeClient` trait is the only way the pipeline touches the
//! network; `HttpProbeClient` is the reqwest implementation. The auth
//! submodule runs one authentication attempt per strategy, and the
//! session cache exposes the reboot-invalidation hook.

mod auth;
mod hnap;
mod session;
mod transport;
mod types;

pub use auth::{attempt, AuthOutcome};
pub use hnap::{derive_login_keys, hmac_md5_hex, hnap_login, url_token};
pub use session::SessionCache;
pub use transport::{HttpProbeClient, ProbeClient};
pub use types::{
    ConnectivityFailure, ConnectivityFailureKind, Credentials, ProbeResponse, SessionToken,
};
