// Weekend flight deal monitor: searches upcoming Friday-Monday trips and
// reports round trips priced under a threshold

pub mod config;
pub mod digest;
pub mod notify;
pub mod offer;
pub mod orchestrator;
pub mod rate_limit;
pub mod search;
pub mod windows;

// Re-export key types for convenience
pub use config::{AppConfig, ConfigError, RunConfig, SmtpConfig};
pub use digest::{Digest, DigestComposer};
pub use notify::{deliver, LogSender, NotificationSender, SendError, SmtpSender};
pub use offer::{FlightDeal, MalformedOfferError, OfferParser, RawOffer, Segment};
pub use orchestrator::{DealDigest, SearchOrchestrator, SearchStats};
pub use rate_limit::{Clock, RateLimiter, TokioClock};
pub use search::{AmadeusClient, AmadeusConfig, FlightSearchClient, SearchError, SearchQuery};
pub use windows::{weekend_windows, DateWindow, WindowError};
