use anyhow::{Context, Result};
use log::info;

use crate::health::{HealthMonitor, SystemHealth};
use crate::integrations::ServiceKind;
use crate::runtime::Runtime;

use super::config::load_config;

/// Checks `services` (all built-in services when empty) concurrently.
#[tracing::instrument(skip(runtime))]
pub async fn health<R: Runtime + ?Sized>(
    runtime: &R,
    services: &[ServiceKind],
) -> Result<SystemHealth> {
    let mut kinds = if services.is_empty() {
        ServiceKind::ALL.to_vec()
    } else {
        services.to_vec()
    };
    kinds.sort();
    kinds.dedup();

    let monitor = HealthMonitor::new();
    for kind in kinds {
        let config = load_config(runtime, kind)?;
        let service = kind
            .connect(config)
            .with_context(|| format!("Failed to set up {}", kind))?;
        monitor.register(service);
    }

    let health = monitor.check_all().await;
    monitor.destroy_all();

    info!("Overall health: {:?}", health.status);
    Ok(health)
}
