use std::{fmt, net::IpAddr, str::FromStr, time::Duration};

use clap::{Parser, ValueEnum};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Airrohr2MQTT gateway: republish airrohr sensor pushes as Home Assistant
/// MQTT discovery messages.
#[derive(Parser, Debug, Clone)]
#[command(name = "airrohr2mqtt")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// HTTP port the sensor station posts to.
    #[arg(long, env = "AIRROHR2MQTT_PORT", default_value_t = 8042)]
    pub port: u16,

    /// Address to bind the HTTP listener on.
    #[arg(long, env = "AIRROHR2MQTT_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// MQTT broker: `host`, `host:port` or `mqtt://host[:port]`.
    #[arg(long, env = "MQTT_SERVER", default_value = "localhost")]
    pub mqtt_server: BrokerAddress,

    /// Seconds allowed for one connect/publish/disconnect cycle.
    #[arg(long, env = "MQTT_PUBLISH_TIMEOUT", default_value_t = 10)]
    pub publish_timeout: u64,

    /// What to answer the station when a publish fails.
    #[arg(long, env = "MQTT_ON_PUBLISH_ERROR", value_enum, default_value_t = FailurePolicy::BestEffort)]
    pub on_publish_error: FailurePolicy,
}

impl Config {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Log the failure, keep publishing the rest and answer 200.
    BestEffort,
    /// Stop at the first failure and answer 502.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl FromStr for BrokerAddress {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::EmptyBroker);
        }

        if raw.contains("://") {
            let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
            if url.scheme() != "mqtt" && url.scheme() != "tcp" {
                return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
            }
            let host = url
                .host_str()
                .filter(|h| !h.is_empty())
                .ok_or(ConfigError::EmptyBroker)?
                .to_string();
            let port = url.port().unwrap_or(DEFAULT_MQTT_PORT);
            if port == 0 {
                return Err(ConfigError::InvalidPort(port.to_string()));
            }
            return Ok(Self { host, port });
        }

        match raw.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(ConfigError::EmptyBroker);
                }
                let port = port
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| ConfigError::InvalidPort(port.to_string()))?;
                Ok(Self {
                    host: host.to_string(),
                    port,
                })
            }
            None => Ok(Self {
                host: raw.to_string(),
                port: DEFAULT_MQTT_PORT,
            }),
        }
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
