//! Shared application state
//!
//! Handlers receive one cheaply cloned `AppState` holding the settings,
//! every service and the per-client rate limiter.

use std::sync::Arc;
use crate::config::Settings;
use crate::middleware::rate_limit::ClientRateLimiter;
use crate::services::ServiceFactory;

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub services: ServiceFactory,
    pub rate_limiter: Arc<ClientRateLimiter>,
}

impl AppState {
    pub fn new(settings: Settings, services: ServiceFactory) -> Self {
        let rate_limiter = Arc::new(ClientRateLimiter::new(&settings.rate_limit));
        Self {
            settings: Arc::new(settings),
            services,
            rate_limiter,
        }
    }
}
