//! Network availability checks
//!
//! Sync and feed loading branch on a single boolean: can we reach the
//! backend right now. The check never fails; anything other than a
//! successful answer counts as offline.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::{ApiConfig, ConnectivityConfig, ConnectivityMode};
use crate::error::AppError;

/// Boolean predicate over network state
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Fixed answer, switchable at runtime
///
/// Used for the `online`/`offline` config modes and CLI overrides.
#[derive(Debug)]
pub struct StaticConnectivity {
    online: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for StaticConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Reports online when a TCP connection to the API host succeeds
#[derive(Debug, Clone)]
pub struct TcpProbe {
    /// host:port
    target: String,
    timeout: Duration,
}

impl TcpProbe {
    /// Build a probe for the API's host and port
    ///
    /// # Errors
    /// Returns error if the base URL has no host
    pub fn from_api(api: &ApiConfig, timeout: Duration) -> Result<Self, AppError> {
        let url = url::Url::parse(&api.base_url)
            .map_err(|e| AppError::Config(format!("api.base_url is not a valid URL: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::Config("api.base_url must have a host".to_string()))?;
        let port = url.port_or_known_default().unwrap_or(80);

        let target = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };

        Ok(Self { target, timeout })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn is_online(&self) -> bool {
        match tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(&self.target))
            .await
        {
            Ok(Ok(_stream)) => true,
            Ok(Err(error)) => {
                tracing::debug!(target_addr = %self.target, %error, "Connectivity probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(target_addr = %self.target, "Connectivity probe timed out");
                false
            }
        }
    }
}

/// Build the connectivity check selected by configuration
pub fn from_config(
    connectivity: &ConnectivityConfig,
    api: &ApiConfig,
) -> Result<Box<dyn Connectivity>, AppError> {
    Ok(match connectivity.mode {
        ConnectivityMode::Online => Box::new(StaticConnectivity::new(true)),
        ConnectivityMode::Offline => Box::new(StaticConnectivity::new(false)),
        ConnectivityMode::Probe => Box::new(TcpProbe::from_api(
            api,
            Duration::from_millis(connectivity.probe_timeout_ms),
        )?),
    })
}
