//! Sequential HTTP probe runner.
//!
//! A [`ProbeTarget`] describes one outbound request. [`ProbeRunner`] sends the
//! targets one at a time and turns every outcome, including transport
//! failures, into a [`ProbeResult`]. Nothing inside a run returns an error to
//! the caller.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::DnsProvider;
use crate::dns;
use crate::errors::ProbeError;

/// Reference sample size for stream liveness checks
pub const DEFAULT_SAMPLE_BYTES: usize = 64;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    #[default]
    Get,
    Head,
}

impl ProbeMethod {
    fn as_method(&self) -> Method {
        match self {
            ProbeMethod::Get => Method::GET,
            ProbeMethod::Head => Method::HEAD,
        }
    }
}

impl std::fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeMethod::Get => write!(f, "GET"),
            ProbeMethod::Head => write!(f, "HEAD"),
        }
    }
}

/// A single request to make. Built once, then only read.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    name: String,
    url: Url,
    method: ProbeMethod,
    headers: HeaderMap,
    timeout: Duration,
    sample_bytes: Option<usize>,
    follow_redirects: bool,
}

impl ProbeTarget {
    /// Validates that `url` is absolute http(s) and `timeout` is non-zero.
    /// HEAD targets never follow redirects, so their `Location` stays visible.
    pub fn new(
        name: impl Into<String>,
        url: &str,
        method: ProbeMethod,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let parsed = Url::parse(url)
            .map_err(|e| ProbeError::InvalidTarget(format!("{}: {}", url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ProbeError::InvalidTarget(format!(
                "{}: scheme must be http or https",
                url
            )));
        }
        if parsed.host_str().is_none() {
            return Err(ProbeError::InvalidTarget(format!("{}: missing host", url)));
        }
        if timeout.is_zero() {
            return Err(ProbeError::InvalidTarget(format!(
                "{}: timeout must be greater than zero",
                url
            )));
        }

        Ok(Self {
            name: name.into(),
            url: parsed,
            method,
            headers: HeaderMap::new(),
            timeout,
            sample_bytes: None,
            follow_redirects: method == ProbeMethod::Get,
        })
    }

    pub fn get(name: impl Into<String>, url: &str, timeout_secs: u64) -> Result<Self, ProbeError> {
        Self::new(name, url, ProbeMethod::Get, Duration::from_secs(timeout_secs))
    }

    pub fn head(name: impl Into<String>, url: &str, timeout_secs: u64) -> Result<Self, ProbeError> {
        Self::new(name, url, ProbeMethod::Head, Duration::from_secs(timeout_secs))
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self, ProbeError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProbeError::InvalidTarget(format!("header name {:?}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ProbeError::InvalidTarget(format!("header {}: {}", name, e)))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Capture at most `n` body bytes when the response is 2xx.
    pub fn sample_body(mut self, n: usize) -> Self {
        self.sample_bytes = Some(n);
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn method(&self) -> ProbeMethod {
        self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn sample_bytes(&self) -> Option<usize> {
        self.sample_bytes
    }

    pub fn follows_redirects(&self) -> bool {
        self.method == ProbeMethod::Get && self.follow_redirects
    }
}

/// What came back from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    pub version: String,
    /// Lowercase names; repeated headers joined with ", "
    pub headers: BTreeMap<String, String>,
    /// Only present when the target asked for a sample and the status was 2xx
    pub body: Option<Vec<u8>>,
    pub body_truncated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Response(ProbeResponse),
    Failed(ProbeError),
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub target: ProbeTarget,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    fn failed(target: ProbeTarget, error: ProbeError) -> Self {
        Self {
            target,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            outcome: ProbeOutcome::Failed(error),
        }
    }

    pub fn response(&self) -> Option<&ProbeResponse> {
        match &self.outcome {
            ProbeOutcome::Response(resp) => Some(resp),
            ProbeOutcome::Failed(_) => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    pub fn headers(&self) -> Option<&BTreeMap<String, String>> {
        self.response().map(|r| &r.headers)
    }

    /// Case-insensitive single header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers()?.get(&name).map(String::as_str)
    }

    pub fn body_prefix(&self) -> Option<&[u8]> {
        self.response()?.body.as_deref()
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match &self.outcome {
            ProbeOutcome::Failed(e) => Some(e),
            ProbeOutcome::Response(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code().is_some_and(|s| (200..300).contains(&s))
    }

    /// 200 with at least one body byte: the endpoint is actively delivering.
    pub fn is_alive(&self) -> bool {
        self.status_code() == Some(200) && self.body_prefix().is_some_and(|b| !b.is_empty())
    }

    /// Decode the captured body as JSON, treating non-2xx and cut-off bodies
    /// as errors.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ProbeError> {
        let resp = match &self.outcome {
            ProbeOutcome::Failed(e) => return Err(e.clone()),
            ProbeOutcome::Response(resp) => resp,
        };
        if !(200..300).contains(&resp.status) {
            return Err(ProbeError::ServerError(resp.status, reason_phrase(resp.status)));
        }
        let body = match resp.body.as_deref() {
            Some(body) if !body.is_empty() => body,
            _ => return Err(ProbeError::EmptyResponse(format!("{} returned no body", self.target.name))),
        };
        if resp.body_truncated {
            return Err(ProbeError::ParseError(format!(
                "body larger than {} bytes",
                body.len()
            )));
        }
        serde_json::from_slice(body).map_err(|e| ProbeError::ParseError(e.to_string()))
    }
}

pub fn reason_phrase(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
        .to_string()
}

/// Settings shared by every request a runner makes.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub user_agent: Option<String>,
    pub dns_provider: DnsProvider,
    pub accept_invalid_certs: bool,
    /// Ignore HTTP(S)_PROXY from the environment
    pub no_proxy: bool,
}

fn build_client(options: &ClientOptions, policy: redirect::Policy) -> Result<Client, ProbeError> {
    let mut builder = Client::builder()
        .redirect(policy)
        .danger_accept_invalid_certs(options.accept_invalid_certs);

    if options.no_proxy {
        builder = builder.no_proxy();
    }
    if let Some(agent) = &options.user_agent {
        builder = builder.user_agent(agent.as_str());
    }
    if let Some(resolver) = dns::resolver_for(options.dns_provider) {
        builder = builder.dns_resolver(Arc::new(resolver));
    }

    builder.build().map_err(|e| ProbeError::Client(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct ProbeRunner {
    following: Client,
    direct: Client,
}

impl ProbeRunner {
    pub fn new(options: ClientOptions) -> Result<Self, ProbeError> {
        Ok(Self {
            following: build_client(&options, redirect::Policy::default())?,
            direct: build_client(&options, redirect::Policy::none())?,
        })
    }

    /// Probe every target in order, one at a time.
    pub async fn run_probes(&self, targets: &[ProbeTarget]) -> Vec<ProbeResult> {
        self.run_probes_with(targets, |_| {}).await
    }

    /// Like [`run_probes`](Self::run_probes), calling `on_result` as each
    /// probe finishes.
    pub async fn run_probes_with<F>(&self, targets: &[ProbeTarget], mut on_result: F) -> Vec<ProbeResult>
    where
        F: FnMut(&ProbeResult),
    {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let result = self.probe(target).await;
            on_result(&result);
            results.push(result);
        }
        results
    }

    pub async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
        let client = if target.follows_redirects() {
            &self.following
        } else {
            &self.direct
        };

        tracing::debug!(
            probe = target.name(),
            method = %target.method(),
            url = %target.url(),
            timeout_secs = target.timeout().as_secs_f64(),
            "probing"
        );

        let started_at = Utc::now();
        let start = Instant::now();
        let outcome = match execute(client, target).await {
            Ok(resp) => {
                tracing::debug!(probe = target.name(), status = resp.status, "probe answered");
                ProbeOutcome::Response(resp)
            }
            Err(e) => {
                tracing::warn!(probe = target.name(), error = %e, "probe failed");
                ProbeOutcome::Failed(e)
            }
        };

        ProbeResult {
            target: target.clone(),
            started_at,
            elapsed: start.elapsed(),
            outcome,
        }
    }
}

async fn execute(client: &Client, target: &ProbeTarget) -> Result<ProbeResponse, ProbeError> {
    let timeout_secs = target.timeout().as_secs();
    let classify = |e: reqwest::Error| ProbeError::from_reqwest(&e, target.host(), timeout_secs);

    let mut resp = client
        .request(target.method().as_method(), target.url().clone())
        .headers(target.headers().clone())
        .timeout(target.timeout())
        .send()
        .await
        .map_err(classify)?;

    let status = resp.status().as_u16();
    let version = http_version(&resp);
    let headers = collect_headers(resp.headers());

    let (body, body_truncated) = match target.sample_bytes() {
        Some(limit) if resp.status().is_success() && target.method() == ProbeMethod::Get => {
            let (bytes, truncated) = read_prefix(&mut resp, limit)
                .await
                .map_err(|e| ProbeError::BodyInterrupted(status, crate::errors::report(&e)))?;
            (Some(bytes), truncated)
        }
        _ => (None, false),
    };
    // Dropping the response here releases the connection without draining it.
    drop(resp);

    Ok(ProbeResponse {
        status,
        version,
        headers,
        body,
        body_truncated,
    })
}

/// Pull chunks until `limit` bytes are held or the body ends.
async fn read_prefix(resp: &mut Response, limit: usize) -> Result<(Vec<u8>, bool), reqwest::Error> {
    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    while buf.len() < limit {
        match resp.chunk().await? {
            Some(chunk) => {
                let take = (limit - buf.len()).min(chunk.len());
                buf.extend_from_slice(&chunk[..take]);
                if take < chunk.len() {
                    return Ok((buf, true));
                }
            }
            None => return Ok((buf, false)),
        }
    }
    // bound reached exactly: only a declared longer length proves more follows
    Ok((buf, resp.content_length().map_or(true, |n| n > limit as u64)))
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

fn http_version(resp: &Response) -> String {
    match resp.version() {
        reqwest::Version::HTTP_09 => "HTTP/0.9".to_string(),
        reqwest::Version::HTTP_10 => "HTTP/1.0".to_string(),
        reqwest::Version::HTTP_11 => "HTTP/1.1".to_string(),
        reqwest::Version::HTTP_2 => "HTTP/2.0".to_string(),
        reqwest::Version::HTTP_3 => "HTTP/3.0".to_string(),
        _ => "UNKNOWN".to_string(),
    }
}

/// Probe `targets` with a default runner.
///
/// If the runner itself cannot be built, every target gets a failed result
/// carrying that error, so the output still matches the input one to one.
pub async fn run_probes(targets: &[ProbeTarget]) -> Vec<ProbeResult> {
    match ProbeRunner::new(ClientOptions::default()) {
        Ok(runner) => runner.run_probes(targets).await,
        Err(e) => targets
            .iter()
            .map(|t| ProbeResult::failed(t.clone(), e.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_validation() {
        assert!(ProbeTarget::get("ok", "http://example.com/x", 5).is_ok());
        assert!(matches!(
            ProbeTarget::get("rel", "/relative/path", 5),
            Err(ProbeError::InvalidTarget(_))
        ));
        assert!(matches!(
            ProbeTarget::get("ftp", "ftp://example.com/", 5),
            Err(ProbeError::InvalidTarget(_))
        ));
        assert!(matches!(
            ProbeTarget::get("zero", "http://example.com/", 0),
            Err(ProbeError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_head_never_follows_redirects() {
        let head = ProbeTarget::head("h", "http://example.com/", 5).unwrap();
        assert!(!head.follows_redirects());

        let get = ProbeTarget::get("g", "http://example.com/", 5).unwrap();
        assert!(get.follows_redirects());
        assert!(!get.no_redirects().follows_redirects());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let target = ProbeTarget::get("g", "http://example.com/", 5).unwrap();
        assert!(target.clone().header("bad header", "x").is_err());
        assert!(target.header("Referer", "line\nbreak").is_err());
    }

    #[test]
    fn test_collect_headers_joins_duplicates() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.insert("Location", HeaderValue::from_static("http://cdn.example/1.ts"));

        let out = collect_headers(&map);
        assert_eq!(out["set-cookie"], "a=1, b=2");
        assert_eq!(out["location"], "http://cdn.example/1.ts");
    }

    fn result_with(status: u16, body: Option<&[u8]>, truncated: bool) -> ProbeResult {
        ProbeResult {
            target: ProbeTarget::get("api", "http://example.com/", 5).unwrap(),
            started_at: Utc::now(),
            elapsed: Duration::from_millis(12),
            outcome: ProbeOutcome::Response(ProbeResponse {
                status,
                version: "HTTP/1.1".to_string(),
                headers: BTreeMap::new(),
                body: body.map(|b| b.to_vec()),
                body_truncated: truncated,
            }),
        }
    }

    #[test]
    fn test_json_decoding_rules() {
        let ok = result_with(200, Some(b"[1,2,3]"), false);
        assert_eq!(ok.json::<Vec<u8>>().unwrap(), vec![1, 2, 3]);

        let not_json = result_with(200, Some(b"<html>"), false);
        assert!(matches!(not_json.json::<Vec<u8>>(), Err(ProbeError::ParseError(_))));

        let forbidden = result_with(403, Some(b"[]"), false);
        assert!(matches!(forbidden.json::<Vec<u8>>(), Err(ProbeError::ServerError(403, _))));

        let empty = result_with(200, Some(b""), false);
        assert!(matches!(empty.json::<Vec<u8>>(), Err(ProbeError::EmptyResponse(_))));

        let cut = result_with(200, Some(b"[1,2"), true);
        assert!(matches!(cut.json::<Vec<u8>>(), Err(ProbeError::ParseError(_))));
    }

    #[test]
    fn test_liveness() {
        assert!(result_with(200, Some(&[0x47; 64]), true).is_alive());
        assert!(!result_with(200, Some(b""), false).is_alive());
        assert!(!result_with(302, None, false).is_alive());
    }
}
