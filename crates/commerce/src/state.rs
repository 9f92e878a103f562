//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::CommerceConfig;
use crate::gateway::GatewayClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CommerceConfig,
    pool: PgPool,
    gateway: GatewayClient,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: CommerceConfig, pool: PgPool) -> Self {
        let gateway = GatewayClient::new(&config.gateway);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                gateway,
            }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &CommerceConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn gateway(&self) -> &GatewayClient {
        &self.inner.gateway
    }
}
