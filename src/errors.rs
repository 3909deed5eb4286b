use std::fmt::Write;
use thiserror::Error;

/// Detailed connection stage for diagnostic purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStage {
    /// DNS resolution failed to find the server
    DnsResolution,
    /// TCP connection to server failed
    TcpConnection,
    /// TLS handshake failed
    TlsHandshake,
    /// HTTP request failed after connecting
    HttpHandshake,
    /// Failed to read or decode the server response
    ResponseParsing,
}

impl std::fmt::Display for ConnectionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl ConnectionStage {
    /// Get a user-friendly name for the stage
    pub fn display_name(&self) -> &'static str {
        match self {
            ConnectionStage::DnsResolution => "DNS Resolution",
            ConnectionStage::TcpConnection => "TCP Connection",
            ConnectionStage::TlsHandshake => "TLS Handshake",
            ConnectionStage::HttpHandshake => "HTTP Handshake",
            ConnectionStage::ResponseParsing => "Response Parsing",
        }
    }

    /// Get actionable suggestion for fixing the issue at this stage
    pub fn suggestion(&self) -> &'static str {
        match self {
            ConnectionStage::DnsResolution => {
                "Try a DNS-over-HTTPS provider (--dns quad9 or --dns cloudflare), or check the host name."
            }
            ConnectionStage::TcpConnection => {
                "Server appears to be offline or blocking your IP. Check the port or try a VPN."
            }
            ConnectionStage::TlsHandshake => {
                "Certificate or TLS error. Retry with --insecure to skip certificate verification."
            }
            ConnectionStage::HttpHandshake => {
                "Server is not speaking HTTP properly. Check the URL and try again later."
            }
            ConnectionStage::ResponseParsing => {
                "Server response was cut off or malformed. This is usually a provider issue."
            }
        }
    }
}

/// Everything that can go wrong with a single probe
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProbeError {
    /// Target could not be built (bad URL, zero timeout, bad header)
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    /// DNS resolution failed
    #[error("DNS resolution failed for {0}: {1}")]
    DnsResolution(String, String),

    /// Request exceeded its timeout
    #[error("Connection timeout after {1}s to {0}")]
    ConnectionTimeout(String, u64),

    /// Connection failed
    #[error("Connection failed at {0}: {1}")]
    ConnectionFailed(ConnectionStage, String),

    /// Server returned a non-success status where one was required
    #[error("Server returned {0}: {1}")]
    ServerError(u16, String),

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Empty or invalid response
    #[error("Empty or invalid response received: {0}")]
    EmptyResponse(String),

    /// Headers arrived but the body broke off
    #[error("Response body interrupted after status {0}: {1}")]
    BodyInterrupted(u16, String),
}

impl ProbeError {
    /// Classify a reqwest failure for `host` into the probe taxonomy.
    pub fn from_reqwest(err: &reqwest::Error, host: &str, timeout_secs: u64) -> Self {
        let chain = report(err);
        let lowered = chain.to_lowercase();

        if err.is_timeout() {
            return ProbeError::ConnectionTimeout(host.to_string(), timeout_secs);
        }
        if err.is_connect() {
            if is_dns_failure(&lowered) {
                return ProbeError::DnsResolution(host.to_string(), innermost(err));
            }
            if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl") {
                return ProbeError::ConnectionFailed(ConnectionStage::TlsHandshake, innermost(err));
            }
            return ProbeError::ConnectionFailed(ConnectionStage::TcpConnection, innermost(err));
        }
        if err.is_body() || err.is_decode() {
            return ProbeError::ConnectionFailed(ConnectionStage::ResponseParsing, innermost(err));
        }
        // resolver errors that were not flagged as connect errors
        if is_dns_failure(&lowered) {
            return ProbeError::DnsResolution(host.to_string(), innermost(err));
        }
        ProbeError::ConnectionFailed(ConnectionStage::HttpHandshake, innermost(err))
    }

    /// The connection stage this error points at, if it is a transport failure
    pub fn stage(&self) -> Option<ConnectionStage> {
        match self {
            ProbeError::DnsResolution(..) => Some(ConnectionStage::DnsResolution),
            ProbeError::ConnectionTimeout(..) => Some(ConnectionStage::TcpConnection),
            ProbeError::ConnectionFailed(stage, _) => Some(*stage),
            ProbeError::ParseError(_)
            | ProbeError::EmptyResponse(_)
            | ProbeError::BodyInterrupted(..) => Some(ConnectionStage::ResponseParsing),
            _ => None,
        }
    }

    /// Get detailed diagnostic information about the error
    pub fn diagnostics(&self) -> String {
        match self {
            ProbeError::InvalidTarget(reason) => {
                format!("Invalid Target\nReason: {}\nSuggestion: Use an absolute http:// or https:// URL and a timeout above zero", reason)
            }
            ProbeError::Client(reason) => {
                format!("Client Setup Error\nReason: {}\nSuggestion: Check the DNS provider and TLS settings", reason)
            }
            ProbeError::DnsResolution(host, source) => {
                format!(
                    "DNS Resolution Error\nHost: {}\nError: {}\nSuggestion: {}",
                    host,
                    source,
                    ConnectionStage::DnsResolution.suggestion()
                )
            }
            ProbeError::ConnectionTimeout(host, timeout) => {
                format!("Connection Timeout\nHost: {}\nTimeout: {} seconds\nSuggestion: Server is slow or offline", host, timeout)
            }
            ProbeError::ConnectionFailed(stage, source) => {
                format!("Connection Failed at {}\nError: {}\nSuggestion: {}", stage.display_name(), source, stage.suggestion())
            }
            ProbeError::ServerError(status, message) => {
                format!("Server Error\nStatus: {}\nMessage: {}\nSuggestion: Verify the credentials and try again later", status, message)
            }
            ProbeError::ParseError(source) => {
                format!("Parse Error\nError: {}\nSuggestion: Provider response is invalid", source)
            }
            ProbeError::EmptyResponse(reason) => {
                format!("Empty Response\nReason: {}\nSuggestion: Try again later", reason)
            }
            ProbeError::BodyInterrupted(status, source) => {
                format!(
                    "Body Interrupted\nStatus: {}\nError: {}\nSuggestion: {}",
                    status,
                    source,
                    ConnectionStage::ResponseParsing.suggestion()
                )
            }
        }
    }
}

fn is_dns_failure(lowered_chain: &str) -> bool {
    lowered_chain.contains("dns error")
        || lowered_chain.contains("failed to lookup address")
        || lowered_chain.contains("no record found")
        || lowered_chain.contains("name or service not known")
        || lowered_chain.contains("nodename nor servname")
        || lowered_chain.contains("name resolution")
}

/// Render an error and every `source()` below it on one line.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}

/// The deepest cause in the chain, which is usually the readable one.
fn innermost(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(src) = current.source() {
        current = src;
    }
    current.to_string()
}
