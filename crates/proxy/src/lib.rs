//! CORS relay for the Nerkh market-data upstreams
//!
//! Browsers cannot call the upstreams directly; this forwards
//! `?source=brsapi|nobitex` requests and returns the upstream JSON unchanged.

pub mod relay;
pub mod server;

pub use relay::{router, RelayConfig, RelayError, RelayState};
pub use server::ProxyServer;
