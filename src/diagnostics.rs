//! Console drivers shared by the `iptv-probe` subcommands and the standalone
//! debug binaries. Each prints as it goes and returns what it found.

use reqwest::Url;

use crate::benchmark::{self, AccountReport, BenchmarkOptions};
use crate::config::Account;
use crate::dns::{self, DohResponse};
use crate::errors::ProbeError;
use crate::probe::{ProbeOutcome, ProbeResult, ProbeRunner, ProbeTarget};
use crate::report::{render_account, render_doh, render_headers, summarize};

pub const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const VLC_UA: &str = "VLC/3.0.20 LibVLC/3.0.20";

pub const REDIRECT_TIMEOUT_SECS: u64 = 5;
pub const STREAM_TIMEOUT_SECS: u64 = 10;

/// Probe `targets` in order, printing each summary as soon as it lands.
pub async fn run_targets(runner: &ProbeRunner, targets: &[ProbeTarget]) -> Vec<ProbeResult> {
    runner
        .run_probes_with(targets, |result| println!("{}", summarize(result)))
        .await
}

pub async fn dns_check(
    runner: &ProbeRunner,
    domain: &str,
    record_type: Option<&str>,
) -> Result<DohResponse, ProbeError> {
    println!("Querying DoH for {}...", domain);
    let outcome = dns::lookup(runner, domain, record_type).await;
    match &outcome {
        Ok(resp) => println!("{}", render_doh(domain, resp)),
        Err(e) => println!("{}", e),
    }
    outcome
}

/// Ask Google DoH whether the host a redirect points at exists.
pub async fn verify_redirect_host(runner: &ProbeRunner, location: &str, base: &Url) {
    let Some(host) = dns::host_of(location, base) else {
        println!("  [?] Could not extract a host from {}", location);
        return;
    };

    println!("  Checking DNS for host: {}", host);
    match dns::lookup(runner, &host, None).await {
        Ok(resp) if resp.host_exists() => {
            let addrs: Vec<String> = resp.addresses().iter().map(|ip| ip.to_string()).collect();
            println!("  [✓] Host ({}) exists (Google DoH): {}", host, addrs.join(", "))
        }
        Ok(resp) => println!(
            "  [X] Host ({}) returned {} from Google DoH.",
            host,
            resp.rcode_name()
        ),
        Err(e) => println!("  [?] Could not check DoH for host: {}", e),
    }
}

/// HEAD each target without following redirects and report where it points.
pub async fn redirect_check(runner: &ProbeRunner, targets: &[ProbeTarget]) -> Vec<ProbeResult> {
    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        println!("Checking {}...", target.name());
        let result = runner.probe(target).await;
        match &result.outcome {
            ProbeOutcome::Response(resp) => {
                println!("Status: {}", resp.status);
                match result.header("location") {
                    Some(location) => {
                        println!("Location: {}", location);
                        verify_redirect_host(runner, location, target.url()).await;
                    }
                    None => println!("No Location header"),
                }
            }
            ProbeOutcome::Failed(e) => println!("Error: {}", e),
        }
        results.push(result);
    }
    results
}

/// Stream liveness: status, all headers, and the first sampled bytes on 200.
pub async fn stream_check(runner: &ProbeRunner, target: &ProbeTarget) -> ProbeResult {
    println!("Testing URL: {}", target.url());
    let result = runner.probe(target).await;

    match &result.outcome {
        ProbeOutcome::Response(resp) => {
            println!("Status Code: {}", resp.status);
            println!("Headers:");
            print!("{}", render_headers(&result));

            if resp.status == 200 {
                let wanted = target.sample_bytes().unwrap_or_default();
                println!("\nReading first {} bytes...", wanted);
                let got = result.body_prefix().map(<[u8]>::len).unwrap_or(0);
                println!("Bytes len: {}", got);
                if result.is_alive() {
                    println!("SUCCESS: Stream is alive!");
                } else {
                    println!("FAILURE: Server answered 200 but sent no bytes");
                }
            } else {
                println!("\nFAILURE: Server returned {}", resp.status);
            }
        }
        ProbeOutcome::Failed(e) => {
            println!("\nERROR: {}", e);
            println!("{}", e.diagnostics());
        }
    }
    result
}

/// Header sets tried against one stream URL, from bare to browser-like.
pub fn scenarios(url: &str) -> Result<Vec<ProbeTarget>, ProbeError> {
    let parsed = Url::parse(url).map_err(|e| ProbeError::InvalidTarget(format!("{}: {}", url, e)))?;
    let referer = format!("{}/", parsed.origin().ascii_serialization());
    let base = |name: &str| -> Result<ProbeTarget, ProbeError> {
        Ok(ProbeTarget::get(name, url, STREAM_TIMEOUT_SECS)?.no_redirects())
    };

    Ok(vec![
        base("No Headers")?,
        base("Chrome UA")?.header("user-agent", CHROME_UA)?,
        base("VLC UA")?.header("user-agent", VLC_UA)?,
        base("Chrome UA + Referer")?
            .header("user-agent", CHROME_UA)?
            .header("referer", &referer)?,
    ])
}

/// Try one URL under each header scenario to see which ones the panel accepts.
pub async fn diagnose_scenarios(runner: &ProbeRunner, url: &str) -> Result<Vec<ProbeResult>, ProbeError> {
    println!("Diagnosing Stream URL: {}", url);
    let targets = scenarios(url)?;
    let mut results = Vec::with_capacity(targets.len());

    for target in &targets {
        println!("\n--- Testing Scenario: {} ---", target.name());
        let result = runner.probe(target).await;
        match &result.outcome {
            ProbeOutcome::Response(resp) => {
                println!("Status: {}", resp.status);
                println!("Headers:");
                print!("{}", render_headers(&result));

                if (300..400).contains(&resp.status) {
                    if let Some(location) = result.header("location") {
                        println!("-> Redirects to: {}", location);
                        verify_redirect_host(runner, location, target.url()).await;
                    }
                } else if result.is_success() {
                    println!("SUCCESS: Stream reachable directly!");
                }
            }
            ProbeOutcome::Failed(e) => println!("Request Failed: {}", e),
        }
        results.push(result);
    }
    Ok(results)
}

pub async fn benchmark(
    runner: &ProbeRunner,
    accounts: &[Account],
    options: &BenchmarkOptions,
) -> Vec<AccountReport> {
    println!("=== IPTV Performance Benchmark ===");
    let reports = benchmark::run_benchmark(runner, accounts, options, |report| {
        println!("\n{}", render_account(report, &options.search_term));
    })
    .await;
    println!("\n=== Benchmark Complete ===");
    reports
}
