//! Price aggregation for the Nerkh dashboard
//!
//! Features:
//! - Direct upstream calls with a server-side proxy as second route
//! - Normalization of heterogeneous upstream payloads
//! - Fallback synthesis for the dollar rate and gold prices
//! - Unique-by-id merge preferring live quotes
//! - Persisted last-fetch stamp for staleness display
//! - Cancellable periodic refresh

pub mod aggregator;
pub mod fallback;
pub mod feeds;
pub mod merge;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod transport;

pub use aggregator::{AggregatorConfig, PriceAggregator};
pub use scheduler::RefreshScheduler;
pub use state::{FetchReport, PriceSnapshot, SourceOutcome};
pub use store::{CachePolicy, FileStampStore, MemoryStampStore, StampStore, StoreError, LAST_FETCH_KEY};
pub use transport::{HttpTransport, Route, Transport, Upstream, UpstreamRequest};
