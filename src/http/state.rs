use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::config::Language;
use crate::session::ConversationSession;

/// Builds a fully wired conversation session for the requested language.
///
/// The control API never constructs adapters itself; the embedding layer
/// decides which capture/output variant and backend the session gets.
#[async_trait::async_trait]
pub trait SessionBuilder: Send + Sync {
    async fn build(&self, language: Language) -> Result<Arc<ConversationSession>>;
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single conversation session, if one has been started
    pub session: Arc<RwLock<Option<Arc<ConversationSession>>>>,

    /// Factory for new sessions
    pub builder: Arc<dyn SessionBuilder>,
}

impl AppState {
    pub fn new(builder: Arc<dyn SessionBuilder>) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            builder,
        }
    }
}
