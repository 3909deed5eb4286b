use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ProbeError;
use crate::probe::{ClientOptions, ProbeMethod, ProbeTarget};

/// DNS-over-HTTPS provider options
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DnsProvider {
    Quad9,
    #[value(name = "adguard")]
    AdGuard,
    Cloudflare,
    Google,
    #[default]
    System,
}

impl DnsProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            DnsProvider::Quad9 => "Quad9 (Recommended)",
            DnsProvider::AdGuard => "AdGuard",
            DnsProvider::Cloudflare => "Cloudflare",
            DnsProvider::Google => "Google",
            DnsProvider::System => "System DNS",
        }
    }
}

/// An Xtream panel login.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    #[serde(alias = "url")]
    pub base_url: String,
    #[serde(alias = "user")]
    pub username: String,
    #[serde(alias = "pass")]
    pub password: String,
}

impl Account {
    pub fn new(name: &str, base_url: &str, username: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// One probe target as written in the config file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TargetConfig {
    pub name: String,
    pub url: String,

    #[serde(default)]
    pub method: ProbeMethod,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Read at most this many body bytes on a 2xx response
    #[serde(default)]
    pub sample_bytes: Option<usize>,

    /// Ignored for HEAD, which never follows redirects
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_search_term() -> String {
    "MSNBC".to_string()
}

fn default_max_matches() -> usize {
    3
}

impl TryFrom<&TargetConfig> for ProbeTarget {
    type Error = ProbeError;

    fn try_from(cfg: &TargetConfig) -> Result<Self, Self::Error> {
        let mut target = ProbeTarget::new(
            cfg.name.as_str(),
            &cfg.url,
            cfg.method,
            Duration::from_secs(cfg.timeout_secs),
        )?;
        for (name, value) in &cfg.headers {
            target = target.header(name, value)?;
        }
        if let Some(n) = cfg.sample_bytes {
            target = target.sample_body(n);
        }
        if !cfg.follow_redirects {
            target = target.no_redirects();
        }
        Ok(target)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProbeConfig {
    #[serde(default)]
    pub dns_provider: DnsProvider,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub no_proxy: bool,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default = "default_search_term")]
    pub search_term: String,
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            dns_provider: DnsProvider::default(),
            user_agent: None,
            accept_invalid_certs: false,
            no_proxy: false,
            targets: Vec::new(),
            accounts: Vec::new(),
            search_term: default_search_term(),
            max_matches: default_max_matches(),
        }
    }
}

impl ProbeConfig {
    /// `<config_dir>/config.json` for this tool, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "vibecoding", "iptv-probe")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load from the default location, falling back to built-in defaults
    /// when no file exists there.
    pub fn load() -> Result<Self, anyhow::Error> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(ProbeConfig::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: ProbeConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            user_agent: self.user_agent.clone(),
            dns_provider: self.dns_provider,
            accept_invalid_certs: self.accept_invalid_certs,
            no_proxy: self.no_proxy,
        }
    }

    /// Validate every configured target, failing on the first bad one.
    pub fn probe_targets(&self) -> Result<Vec<ProbeTarget>, ProbeError> {
        self.targets.iter().map(ProbeTarget::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: ProbeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.dns_provider, DnsProvider::System);
        assert_eq!(config.search_term, "MSNBC");
        assert_eq!(config.max_matches, 3);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_account_accepts_short_keys() {
        let json = r#"{"name": "Trex", "url": "http://line.example", "user": "u1", "pass": "p1"}"#;
        let acc: Account = serde_json::from_str(json).unwrap();
        assert_eq!(acc, Account::new("Trex", "http://line.example", "u1", "p1"));
    }

    #[test]
    fn test_target_config_conversion() {
        let json = r#"{
            "dns_provider": "quad9",
            "targets": [
                {"name": "TS", "url": "http://host.example/live/a/b/1.ts", "method": "HEAD", "timeout_secs": 5,
                 "headers": {"User-Agent": "VLC/3.0.20 LibVLC/3.0.20"}},
                {"name": "Stream", "url": "http://host.example/live/a/b/1.ts", "sample_bytes": 64}
            ]
        }"#;
        let config: ProbeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.dns_provider, DnsProvider::Quad9);

        let targets = config.probe_targets().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].method(), ProbeMethod::Head);
        assert_eq!(targets[0].timeout(), Duration::from_secs(5));
        assert!(!targets[0].follows_redirects());
        assert_eq!(targets[0].headers()["user-agent"], "VLC/3.0.20 LibVLC/3.0.20");
        assert_eq!(targets[1].method(), ProbeMethod::Get);
        assert_eq!(targets[1].sample_bytes(), Some(64));
        assert_eq!(targets[1].timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_target_is_rejected() {
        let json = r#"{"targets": [{"name": "bad", "url": "ftp://host.example/file", "timeout_secs": 5}]}"#;
        let config: ProbeConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.probe_targets(), Err(ProbeError::InvalidTarget(_))));
    }
}
