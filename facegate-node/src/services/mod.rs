//! Long-lived services and their lifecycle
//!
//! Every service has a stable name plus `init`/`deinit` hooks. The
//! [`ServiceRegistry`] runs the hooks once per process: `init_all` after the
//! database session is open and before the router is served, `deinit_all`
//! after the server stops and before the session closes.

pub mod access_control;
pub mod authorization;
pub mod tasks;

pub use access_control::AccessControlService;
pub use authorization::AuthorizationService;
pub use tasks::TasksService;

use async_trait::async_trait;
use facegate_common::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs once, after shared resources are available
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Runs once at shutdown, also when `init` never succeeded
    async fn deinit(&self) -> Result<()> {
        Ok(())
    }
}

/// Ordered set of services owned by the application state
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<Arc<dyn Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: Arc<dyn Service>) {
        self.services.push(service);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.services
            .iter()
            .find(|service| service.name() == name)
            .cloned()
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.services.iter().map(|service| service.name()).collect()
    }

    /// Initialize in registration order, stopping at the first failure
    pub async fn init_all(&self) -> Result<()> {
        for service in &self.services {
            info!("Initializing service: {}", service.name());
            service.init().await?;
        }
        info!("All services initialized ({})", self.services.len());
        Ok(())
    }

    /// Deinitialize in reverse order; failures are logged and skipped
    pub async fn deinit_all(&self) {
        for service in self.services.iter().rev() {
            info!("Deinitializing service: {}", service.name());
            if let Err(e) = service.deinit().await {
                warn!("Service {} failed to deinitialize: {}", service.name(), e);
            }
        }
    }
}
