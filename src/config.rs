use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::reconcile::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub etcd_endpoints: Vec<String>,
    /// Per-request etcd timeout.
    pub etcd_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    /// Per-attempt Docker inspection timeout.
    pub inspect_timeout_ms: u64,
    pub retry_initial_ms: u64,
    pub retry_max_interval_ms: u64,
    pub retry_max_elapsed_ms: u64,
    pub reconnect_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            etcd_endpoints: vec!["http://127.0.0.1:2379".into()],
            etcd_timeout_ms: 1_000,
            network_name: None,
            inspect_timeout_ms: 5_000,
            retry_initial_ms: 100,
            retry_max_interval_ms: 2_000,
            retry_max_elapsed_ms: 10_000,
            reconnect_delay_ms: 2_000,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("swtch.toml"))
            .merge(Json::file("swtch.json"))
            .merge(Env::prefixed("SWTCH_"))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        // Support Docker link style variables for the etcd container
        if std::env::var_os("SWTCH_ETCD_ENDPOINTS").is_none() {
            if let (Ok(addr), Ok(port)) = (
                std::env::var("ETCD_PORT_2379_TCP_ADDR"),
                std::env::var("ETCD_PORT_2379_TCP_PORT"),
            ) {
                config.etcd_endpoints = vec![format!("http://{}:{}", addr, port)];
            }
        }

        if config.etcd_endpoints.is_empty() {
            anyhow::bail!("No etcd endpoints configured");
        }
        Ok(config)
    }

    pub fn etcd_timeout(&self) -> Duration {
        Duration::from_millis(self.etcd_timeout_ms)
    }

    pub fn inspect_timeout(&self) -> Duration {
        Duration::from_millis(self.inspect_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(self.retry_initial_ms),
            max_interval: Duration::from_millis(self.retry_max_interval_ms),
            max_elapsed: Duration::from_millis(self.retry_max_elapsed_ms),
        }
    }
}
