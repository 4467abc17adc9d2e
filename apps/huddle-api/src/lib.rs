pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;

use std::sync::Arc;

use auth::identity::IdentityResolver;
use config::Config;
use db::store::ChatStore;
use error::StartupError;
use gateway::fanout::ChatFanoutService;
use gateway::outbox::Outboxes;
use gateway::registry::ConnectionRegistry;
use gateway::transport::TransportGateway;
use huddle_common::MessageIdGenerator;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<TransportGateway>,
}

impl AppState {
    /// Wire the registry, outboxes, fanout service and gateway around the
    /// given storage and identity collaborators.
    pub fn build(
        config: Config,
        store: Arc<dyn ChatStore>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Result<Self, StartupError> {
        let ids = MessageIdGenerator::new(config.worker_id)
            .ok_or(StartupError::WorkerId(config.worker_id))?;

        let registry = Arc::new(ConnectionRegistry::new());
        let outboxes = Arc::new(Outboxes::new(config.outbox_capacity));
        let fanout = Arc::new(ChatFanoutService::new(
            store,
            registry.clone(),
            outboxes.clone(),
            Arc::new(ids),
            config.max_content_len,
        ));
        let gateway = Arc::new(TransportGateway::new(
            registry,
            outboxes,
            fanout,
            identity,
            config.error_acks,
        ));

        Ok(Self {
            config: Arc::new(config),
            gateway,
        })
    }
}
