//! Application State
//!
//! Shared state across all handlers. Constructed once at service start; the
//! conversation store lives and dies with it.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use talkback_config::Settings;
use talkback_memory::ConversationStore;
use talkback_pipeline::TurnOrchestrator;

use crate::archive::AudioArchive;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Conversation store
    pub store: Arc<ConversationStore>,
    /// Turn orchestrator
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Optional audio archive
    pub archive: Option<Arc<AudioArchive>>,
    /// Prometheus handle for the /metrics endpoint
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Settings, metrics: Option<PrometheusHandle>) -> Self {
        let store = Arc::new(ConversationStore::new());
        let orchestrator = Arc::new(TurnOrchestrator::new(&config, store.clone()));
        let archive = config
            .server
            .archive_dir
            .as_deref()
            .map(|dir| Arc::new(AudioArchive::new(dir)));

        Self {
            config: Arc::new(config),
            store,
            orchestrator,
            archive,
            metrics,
        }
    }
}
