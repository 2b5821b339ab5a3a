use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;
use url::Url;

use crate::http::worker::DEFAULT_RECV_TIMEOUT_MS;

/// Server settings.
///
/// Built from defaults, then an optional YAML file, then `EVAL_*`
/// environment variables. Command line flags are applied by the binary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listener port (all interfaces)
    pub port: u16,
    /// Pending connection queue depth, at least 1
    pub backlog: u32,
    /// Receive timeout for accepted connections, at least 1
    pub recv_timeout_ms: u64,
    /// Where clicked search results are forwarded; none disables forwarding
    pub analytics_url: Option<Url>,
    /// One of trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            backlog: 10,
            recv_timeout_ms: DEFAULT_RECV_TIMEOUT_MS,
            analytics_url: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, overlaid with `path` if given, overlaid with the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        // An empty document means "all defaults"
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Applies `EVAL_PORT`, `EVAL_BACKLOG`, `EVAL_RECV_TIMEOUT_MS`,
    /// `EVAL_ANALYTICS_URL` and `EVAL_LOG_LEVEL` as returned by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = lookup("EVAL_PORT") {
            self.port = v.parse().with_context(|| format!("EVAL_PORT={v} is not a port"))?;
        }
        if let Some(v) = lookup("EVAL_BACKLOG") {
            self.backlog = v
                .parse()
                .with_context(|| format!("EVAL_BACKLOG={v} is not a number"))?;
        }
        if let Some(v) = lookup("EVAL_RECV_TIMEOUT_MS") {
            self.recv_timeout_ms = v
                .parse()
                .with_context(|| format!("EVAL_RECV_TIMEOUT_MS={v} is not a number"))?;
        }
        if let Some(v) = lookup("EVAL_ANALYTICS_URL") {
            self.analytics_url = if v.is_empty() {
                None
            } else {
                Some(Url::parse(&v).with_context(|| format!("EVAL_ANALYTICS_URL={v} is not a URL"))?)
            };
        }
        if let Some(v) = lookup("EVAL_LOG_LEVEL") {
            self.log_level = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backlog == 0 {
            bail!("backlog must be positive");
        }
        if self.recv_timeout_ms == 0 {
            bail!("recv_timeout_ms must be positive");
        }
        if let Some(url) = &self.analytics_url {
            if url.scheme() != "http" {
                bail!("analytics_url must use http, got {}", url.scheme());
            }
            if url.host_str().is_none() {
                bail!("analytics_url must name a host");
            }
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown log level {:?}", self.log_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_fields() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[
            ("EVAL_PORT", "9000"),
            ("EVAL_BACKLOG", "3"),
            ("EVAL_ANALYTICS_URL", "http://127.0.0.1:9100/v0/ReportClick"),
        ]))
        .unwrap();

        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.backlog, 3);
        assert_eq!(cfg.recv_timeout_ms, DEFAULT_RECV_TIMEOUT_MS);
        assert_eq!(
            cfg.analytics_url.unwrap().as_str(),
            "http://127.0.0.1:9100/v0/ReportClick"
        );
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let mut cfg = Config::default();
        assert!(cfg.apply_env(env(&[("EVAL_PORT", "eighty")])).is_err());
        assert!(cfg.apply_env(env(&[("EVAL_PORT", "70000")])).is_err());
    }

    #[test]
    fn empty_analytics_url_disables_forwarding() {
        let mut cfg = Config {
            analytics_url: Some(Url::parse("http://localhost:1/").unwrap()),
            ..Config::default()
        };
        cfg.apply_env(env(&[("EVAL_ANALYTICS_URL", "")])).unwrap();
        assert!(cfg.analytics_url.is_none());
    }

    #[test]
    fn log_level_parses() {
        let cfg = Config {
            log_level: "debug".to_string(),
            ..Config::default()
        };
        assert_eq!(cfg.log_level().unwrap(), tracing::Level::DEBUG);
    }
}
