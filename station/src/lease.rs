//! Keeps a station host registered with the discovery registry.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tag_runner::io::protocol::{self, Registration};

use crate::registry::MIN_LEASE;

/// Registers `registration` at `registry` and renews it at half the lease.
#[derive(Debug, Clone)]
pub struct LeaseKeeper {
    client: Client,
    registry: Url,
    registration: Registration,
}

impl LeaseKeeper {
    pub fn new(registry: &str, registration: Registration) -> Result<Self> {
        let registry =
            Url::parse(registry).with_context(|| format!("invalid registry url {registry}"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build registry client")?;
        Ok(Self {
            client,
            registry,
            registration,
        })
    }

    /// Half the lease the registry will actually grant.
    pub fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.registration.lease_secs).max(MIN_LEASE) / 2
    }

    pub async fn register(&self) -> Result<()> {
        self.client
            .post(self.url(&[])?)
            .json(&self.registration)
            .send()
            .await
            .context("register with registry")?
            .error_for_status()
            .context("registry refused registration")?;
        Ok(())
    }

    pub async fn deregister(&self) -> Result<()> {
        self.client
            .delete(self.url(&[self.registration.id.as_str()])?)
            .send()
            .await
            .context("deregister from registry")?
            .error_for_status()
            .context("registry refused deregistration")?;
        Ok(())
    }

    /// Renew in the background until the task is aborted. Failures are logged
    /// and retried on the next tick; the registry expires the lease meanwhile.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.renew_interval());
            let mut registered = false;
            loop {
                ticker.tick().await;
                match self.register().await {
                    Ok(()) if !registered => {
                        registered = true;
                        info!(
                            station = %self.registration.id,
                            registry = %self.registry,
                            "registered"
                        );
                    }
                    Ok(()) => debug!(station = %self.registration.id, "lease renewed"),
                    Err(err) => {
                        registered = false;
                        warn!(station = %self.registration.id, "lease renewal failed: {err:#}");
                    }
                }
            }
        })
    }

    fn url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = self.registry.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("registry url cannot be a base: {}", self.registry))?
            .pop_if_empty()
            .extend(protocol::REGISTRY_STATIONS)
            .extend(tail);
        Ok(url)
    }
}
