//! Health status contract and a monitor aggregating several services.

use futures_util::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{ErrorKind, ServiceResult};
use crate::service::ExternalService;

/// `{"status":"healthy"}` or `{"status":"unhealthy","reason":"<ErrorKind>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy { reason: ErrorKind },
}

impl HealthStatus {
    pub fn from_outcome<T>(outcome: &ServiceResult<T>) -> Self {
        match outcome {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy { reason: e.kind() },
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemHealth {
    pub status: OverallStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub services: BTreeMap<String, HealthStatus>,
}

impl SystemHealth {
    fn from_results(services: BTreeMap<String, HealthStatus>) -> Self {
        let unhealthy = services.values().filter(|s| !s.is_healthy()).count();
        let status = if unhealthy == 0 {
            OverallStatus::Healthy
        } else if unhealthy == services.len() {
            OverallStatus::Unhealthy
        } else {
            OverallStatus::Degraded
        };
        Self {
            status,
            timestamp: chrono::Utc::now(),
            services,
        }
    }
}

/// Registry of services checked together.
#[derive(Default)]
pub struct HealthMonitor {
    services: Mutex<BTreeMap<String, Arc<dyn ExternalService>>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under its name, replacing any previous entry.
    pub fn register(&self, service: Arc<dyn ExternalService>) {
        let name = service.name().to_string();
        info!("Registered service for health monitoring: {}", name);
        self.lock().insert(name, service);
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn ExternalService>> {
        let removed = self.lock().remove(name);
        if removed.is_some() {
            info!("Unregistered service from health monitoring: {}", name);
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Checks every registered service concurrently.
    #[tracing::instrument(skip(self))]
    pub async fn check_all(&self) -> SystemHealth {
        let services: Vec<_> = self
            .lock()
            .iter()
            .map(|(name, service)| (name.clone(), service.clone()))
            .collect();

        let checks = services.iter().map(|(name, service)| async move {
            let status = service.check_health().await;
            match status {
                HealthStatus::Healthy => debug!("{}: healthy", name),
                HealthStatus::Unhealthy { reason } => warn!("{}: unhealthy ({})", name, reason),
            }
            (name.clone(), status)
        });

        SystemHealth::from_results(join_all(checks).await.into_iter().collect())
    }

    pub fn destroy_all(&self) {
        for service in self.lock().values() {
            service.destroy();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Arc<dyn ExternalService>>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
