//! HTTP surface for the talkback voice agent

pub mod archive;
pub mod http;
pub mod metrics;
pub mod state;

pub use archive::AudioArchive;
pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;
