use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Prometheus exporter settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default = "default_prometheus_enabled")]
    pub prometheus_enabled: bool,

    /// Interface the `/metrics` endpoint binds to
    #[serde(default = "default_prometheus_host")]
    pub prometheus_host: IpAddr,

    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: default_prometheus_enabled(),
            prometheus_host: default_prometheus_host(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.prometheus_host, self.prometheus_port)
    }

    /// Only checked when the exporter is enabled: the port must be
    /// unprivileged and, outside tests, free to bind.
    pub fn validate(&self) -> Result<()> {
        if !self.prometheus_enabled {
            if self.prometheus_port != default_prometheus_port() {
                tracing::warn!(
                    port = self.prometheus_port,
                    "prometheus_port set while the exporter is disabled"
                );
            }
            return Ok(());
        }

        match self.prometheus_port {
            0 => Err(Error::InvalidConfig("prometheus_port must be set when the exporter is enabled".into())),
            port if port < 1024 => Err(Error::InvalidConfig(format!(
                "prometheus_port {port} is privileged"
            ))),
            _ => self.ensure_bindable(),
        }
    }

    #[cfg(not(test))]
    fn ensure_bindable(&self) -> Result<()> {
        std::net::TcpListener::bind(self.socket_addr())
            .map(|_| ())
            .map_err(|e| Error::InvalidConfig(format!("metrics address {} unavailable: {e}", self.socket_addr())))
    }

    #[cfg(test)]
    fn ensure_bindable(&self) -> Result<()> {
        Ok(())
    }
}

fn default_prometheus_enabled() -> bool {
    false
}

fn default_prometheus_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_prometheus_port() -> u16 {
    9108
}
