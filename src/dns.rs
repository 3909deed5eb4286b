//! DNS helpers: a DNS-over-HTTPS resolver for reqwest, and the Google-style
//! JSON DoH lookup used to check whether a host exists at all.

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::Url;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::config::DnsProvider;
use crate::errors::ProbeError;
use crate::probe::{ProbeRunner, ProbeTarget};

pub const GOOGLE_DOH_JSON: &str = "https://dns.google/resolve";
pub const DOH_TIMEOUT_SECS: u64 = 5;
const DOH_BODY_LIMIT: usize = 64 * 1024;

const ADGUARD_IPS: &[IpAddr] = &[
    IpAddr::V4(Ipv4Addr::new(94, 140, 14, 14)),
    IpAddr::V4(Ipv4Addr::new(94, 140, 15, 15)),
];

/// Resolves host names for reqwest through a DoH provider.
#[derive(Clone)]
pub struct DohResolver {
    resolver: Arc<TokioAsyncResolver>,
}

impl DohResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let mut opts = ResolverOpts::default();
        opts.attempts = 2;
        Self {
            resolver: Arc::new(TokioAsyncResolver::tokio(config, opts)),
        }
    }
}

impl Resolve for DohResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.resolver.clone();
        Box::pin(async move {
            let lookup = resolver.lookup_ip(name.as_str()).await?;
            let addrs: Addrs = Box::new(lookup.into_iter().map(|ip| SocketAddr::new(ip, 0)));
            Ok::<Addrs, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

fn resolver_config(provider: DnsProvider) -> Option<ResolverConfig> {
    match provider {
        DnsProvider::Quad9 => Some(ResolverConfig::quad9_https()),
        DnsProvider::Cloudflare => Some(ResolverConfig::cloudflare_https()),
        DnsProvider::Google => Some(ResolverConfig::google_https()),
        DnsProvider::AdGuard => {
            let group = NameServerConfigGroup::from_ips_https(
                ADGUARD_IPS,
                443,
                "dns.adguard-dns.com".to_string(),
                true,
            );
            Some(ResolverConfig::from_parts(None, vec![], group))
        }
        DnsProvider::System => None,
    }
}

/// `None` means keep reqwest's own system resolver.
pub fn resolver_for(provider: DnsProvider) -> Option<DohResolver> {
    resolver_config(provider).map(DohResolver::new)
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DohQuestion {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DohRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
    #[serde(rename = "TTL", default)]
    pub ttl: u32,
    pub data: String,
}

/// Body of `GET https://dns.google/resolve?name=...`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DohResponse {
    #[serde(rename = "Status")]
    pub status: u32,
    #[serde(rename = "TC", default)]
    pub truncated: bool,
    #[serde(rename = "Question", default)]
    pub question: Vec<DohQuestion>,
    #[serde(rename = "Answer", default)]
    pub answer: Vec<DohRecord>,
    #[serde(rename = "Comment", default)]
    pub comment: Option<String>,
}

impl DohResponse {
    pub fn rcode_name(&self) -> &'static str {
        match self.status {
            0 => "NOERROR",
            1 => "FORMERR",
            2 => "SERVFAIL",
            3 => "NXDOMAIN",
            4 => "NOTIMP",
            5 => "REFUSED",
            _ => "UNKNOWN",
        }
    }

    pub fn host_exists(&self) -> bool {
        self.status == 0 && !self.answer.is_empty()
    }

    /// A and AAAA answers that parse as IP addresses
    pub fn addresses(&self) -> Vec<IpAddr> {
        self.answer
            .iter()
            .filter(|r| r.record_type == 1 || r.record_type == 28)
            .filter_map(|r| r.data.parse().ok())
            .collect()
    }
}

pub fn record_type_name(record_type: u16) -> &'static str {
    match record_type {
        1 => "A",
        2 => "NS",
        5 => "CNAME",
        6 => "SOA",
        15 => "MX",
        16 => "TXT",
        28 => "AAAA",
        _ => "OTHER",
    }
}

pub fn lookup_target(domain: &str, record_type: Option<&str>) -> Result<ProbeTarget, ProbeError> {
    let mut params = vec![("name", domain)];
    if let Some(t) = record_type {
        params.push(("type", t));
    }
    let url = Url::parse_with_params(GOOGLE_DOH_JSON, &params)
        .map_err(|e| ProbeError::InvalidTarget(format!("{}: {}", domain, e)))?;

    Ok(ProbeTarget::get(format!("DoH {}", domain), url.as_str(), DOH_TIMEOUT_SECS)?
        .header("accept", "application/dns-json")?
        .sample_body(DOH_BODY_LIMIT))
}

pub async fn lookup(
    runner: &ProbeRunner,
    domain: &str,
    record_type: Option<&str>,
) -> Result<DohResponse, ProbeError> {
    let target = lookup_target(domain, record_type)?;
    runner.probe(&target).await.json()
}

/// Host named by a `Location` header, resolving relative locations against
/// the URL that was probed.
pub fn host_of(location: &str, base: &Url) -> Option<String> {
    let url = base.join(location).ok()?;
    url.host_str().map(|h| h.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_google_answer() {
        let body = r#"{"Status":0,"TC":false,"RD":true,"RA":true,"AD":false,"CD":false,
            "Question":[{"name":"example.com.","type":1}],
            "Answer":[{"name":"example.com.","type":5,"TTL":300,"data":"edge.example.net."},
                      {"name":"edge.example.net.","type":1,"TTL":60,"data":"93.184.216.34"}]}"#;
        let resp: DohResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.rcode_name(), "NOERROR");
        assert!(resp.host_exists());
        assert_eq!(resp.addresses(), vec!["93.184.216.34".parse::<IpAddr>().unwrap()]);
        assert_eq!(record_type_name(resp.answer[0].record_type), "CNAME");
    }

    #[test]
    fn test_parse_nxdomain() {
        let body = r#"{"Status":3,"TC":false,"Question":[{"name":"nope.invalid.","type":1}],
            "Comment":"Response from 127.0.0.1."}"#;
        let resp: DohResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.rcode_name(), "NXDOMAIN");
        assert!(!resp.host_exists());
        assert!(resp.addresses().is_empty());
    }

    #[test]
    fn test_lookup_target_shape() {
        let target = lookup_target("panel.example", Some("A")).unwrap();
        assert_eq!(target.url().host_str(), Some("dns.google"));
        assert_eq!(target.url().query(), Some("name=panel.example&type=A"));
        assert_eq!(target.timeout().as_secs(), DOH_TIMEOUT_SECS);
        assert_eq!(target.headers()["accept"], "application/dns-json");
        assert!(target.follows_redirects());
    }

    #[test]
    fn test_host_of_location() {
        let base = Url::parse("http://panel.example/live/u/p/1.ts").unwrap();
        assert_eq!(
            host_of("http://cdn7.example:8080/hls/1.ts?token=x", &base).as_deref(),
            Some("cdn7.example")
        );
        assert_eq!(host_of("/other/1.ts", &base).as_deref(), Some("panel.example"));
    }

    #[test]
    fn test_system_provider_keeps_default_resolver() {
        assert!(resolver_config(DnsProvider::System).is_none());
        assert!(resolver_config(DnsProvider::Quad9).is_some());
        assert!(resolver_config(DnsProvider::AdGuard).is_some());
    }
}
