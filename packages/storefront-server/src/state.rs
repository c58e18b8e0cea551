use std::sync::Arc;

use storefront_storage::domain::StorefrontStore;

use crate::config::ServerConfig;
use crate::payment::PaymentGateway;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StorefrontStore>,
    pub payments: Arc<dyn PaymentGateway>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn StorefrontStore>,
        payments: Arc<dyn PaymentGateway>,
        config: ServerConfig,
    ) -> Self {
        Self {
            store,
            payments,
            config: Arc::new(config),
        }
    }
}
