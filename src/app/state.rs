//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::SessionRegistry;
use crate::matchmaking::LobbyService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lobby: Arc<LobbyService>,
    pub session_registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let session_registry = Arc::new(SessionRegistry::new());

        // Arc for sharing across cloned AppState
        let lobby = Arc::new(LobbyService::new(
            session_registry.clone(),
            config.session_settings(),
        ));

        Self {
            config,
            lobby,
            session_registry,
        }
    }
}
