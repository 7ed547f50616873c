//! Server configuration.
//!
//! Everything is environment-driven with documented defaults, so the binary
//! can run unconfigured and a deployment can override individual knobs.

use std::time::Duration;

use crate::reclaim::ReclaimConfig;

/// Configuration for the embeddings server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Model name echoed in responses
    pub model_name: String,

    /// Embedding vector dimension of the stub backend
    pub dimension: usize,

    /// Gate capacity: maximum concurrent in-flight compute calls
    pub max_concurrent: usize,

    /// Blocking worker threads; must be >= max_concurrent
    pub workers: usize,

    /// Micro-batch size for one compute dispatch
    pub micro_batch: usize,

    /// Idle time before a reclamation pass
    pub idle_threshold: Duration,

    /// Idle-check interval
    pub idle_check_interval: Duration,

    /// Interval between stats-window flushes
    pub stats_interval: Duration,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let max_concurrent = 2;
        Self {
            port: 4000,
            model_name: "jina-code-v2".to_string(),
            dimension: 768,
            max_concurrent,
            workers: max_concurrent,
            micro_batch: 32,
            idle_threshold: Duration::from_secs(300),
            idle_check_interval: Duration::from_secs(60),
            stats_interval: Duration::from_secs(60),
            max_body_bytes: 8 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse("EMBEDGATE_PORT") {
            config.port = n;
        }
        if let Ok(name) = std::env::var("EMBEDGATE_MODEL") {
            config.model_name = name;
        }
        if let Some(n) = env_parse("EMBEDGATE_DIMENSION") {
            config.dimension = n;
        }
        if let Some(n) = env_parse("EMBEDGATE_MAX_CONCURRENT") {
            config.max_concurrent = n;
            config.workers = config.workers.max(n);
        }
        if let Some(n) = env_parse("EMBEDGATE_WORKERS") {
            config.workers = n;
        }
        if let Some(n) = env_parse("EMBEDGATE_MICRO_BATCH") {
            config.micro_batch = n;
        }
        if let Some(n) = env_parse("EMBEDGATE_IDLE_THRESHOLD_SECS") {
            config.idle_threshold = Duration::from_secs(n);
        }
        if let Some(n) = env_parse("EMBEDGATE_IDLE_CHECK_SECS") {
            config.idle_check_interval = Duration::from_secs(n);
        }
        if let Some(n) = env_parse("EMBEDGATE_STATS_INTERVAL_SECS") {
            config.stats_interval = Duration::from_secs(n);
        }
        if let Some(n) = env_parse("EMBEDGATE_MAX_BODY_BYTES") {
            config.max_body_bytes = n;
        }

        config
    }

    /// Reject configurations that cannot run correctly.
    ///
    /// Gate capacity above the worker-thread count would let admitted
    /// requests starve waiting for a worker slot, so it is refused at
    /// startup rather than surfacing as a runtime stall.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent == 0 {
            anyhow::bail!("EMBEDGATE_MAX_CONCURRENT must be at least 1");
        }
        if self.micro_batch == 0 {
            anyhow::bail!("EMBEDGATE_MICRO_BATCH must be at least 1");
        }
        if self.dimension == 0 {
            anyhow::bail!("EMBEDGATE_DIMENSION must be at least 1");
        }
        if self.max_concurrent > self.workers {
            anyhow::bail!(
                "gate capacity ({}) exceeds worker threads ({}); admitted requests could starve",
                self.max_concurrent,
                self.workers
            );
        }
        Ok(())
    }

    pub fn reclaim_config(&self) -> ReclaimConfig {
        ReclaimConfig {
            idle_threshold: self.idle_threshold,
            check_interval: self.idle_check_interval,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 4000);
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.micro_batch, 32);
        assert_eq!(config.idle_threshold, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_capacity_must_not_exceed_workers() {
        let config = ServerConfig {
            max_concurrent: 8,
            workers: 4,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ServerConfig {
            max_concurrent: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
