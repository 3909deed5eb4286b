use std::fmt::Write;

use crate::benchmark::AccountReport;
use crate::dns::{record_type_name, DohResponse};
use crate::probe::{reason_phrase, ProbeOutcome, ProbeResult};

const KEY_HEADERS: &[&str] = &["location", "content-type", "content-length", "server"];

/// One paragraph for the console: name, request, status or error, key
/// headers, how many body bytes were sampled and when the probe started.
pub fn summarize(result: &ProbeResult) -> String {
    let target = &result.target;
    let mut s = format!("[{}] {} {}", target.name(), target.method(), target.url());

    match &result.outcome {
        ProbeOutcome::Response(resp) => {
            let _ = write!(
                s,
                " -> {} {} ({}) in {} ms",
                resp.status,
                reason_phrase(resp.status),
                resp.version,
                result.elapsed.as_millis()
            );
            for key in KEY_HEADERS {
                if let Some(value) = resp.headers.get(*key) {
                    let _ = write!(s, "; {}: {}", key, value);
                }
            }
            if let Some(body) = &resp.body {
                let _ = write!(
                    s,
                    "; {} bytes sampled{}",
                    body.len(),
                    if resp.body_truncated { " (truncated)" } else { "" }
                );
            }
        }
        ProbeOutcome::Failed(e) => {
            let _ = write!(s, " -> error after {} ms: {}", result.elapsed.as_millis(), e);
        }
    }
    let _ = write!(s, "; started {}", result.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    s
}

/// Every response header, one per line, indented.
pub fn render_headers(result: &ProbeResult) -> String {
    let mut s = String::new();
    if let Some(headers) = result.headers() {
        for (k, v) in headers {
            let _ = writeln!(s, "  {}: {}", k, v);
        }
    }
    s
}

pub fn render_doh(domain: &str, resp: &DohResponse) -> String {
    let mut s = format!("{} -> {} ({})", domain, resp.rcode_name(), resp.status);
    for record in &resp.answer {
        let _ = write!(
            s,
            "\n  {} {} TTL={} {}",
            record.name,
            record_type_name(record.record_type),
            record.ttl,
            record.data
        );
    }
    if let Some(comment) = &resp.comment {
        let _ = write!(s, "\n  comment: {}", comment);
    }
    s
}

pub fn render_account(report: &AccountReport, search_term: &str) -> String {
    let mut s = format!("Processing: {}", report.account);

    if let Some(cats) = &report.categories {
        let _ = write!(
            s,
            "\n  ✅ Categories: {} items in {:.2}s",
            cats.items,
            cats.elapsed.as_secs_f64()
        );
    }
    if let Some(streams) = &report.streams {
        let _ = write!(
            s,
            "\n  ✅ Streams: {} items in {:.2}s",
            streams.items,
            streams.elapsed.as_secs_f64()
        );
        if report.total_matches > 0 {
            let _ = write!(s, "\n  📍 Found {} {} streams:", report.total_matches, search_term);
            for m in &report.matches {
                let _ = write!(s, "\n    - [{}] {}\n      Link: {}", m.stream_id, m.name, m.play_url);
            }
        } else if report.failure.is_none() {
            let _ = write!(s, "\n  ❌ {} NOT FOUND.", search_term);
        }
    }
    if let Some((stage, e)) = &report.failure {
        let _ = write!(s, "\n  ❌ {} Error: {}", stage, e);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{BenchmarkStage, StageTiming, StreamMatch};
    use crate::errors::ProbeError;
    use crate::flex_id::FlexId;
    use crate::probe::{ProbeResponse, ProbeTarget};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn redirect_result() -> ProbeResult {
        let mut headers = BTreeMap::new();
        headers.insert("location".to_string(), "http://cdn.example/1.ts".to_string());
        headers.insert("x-other".to_string(), "ignored".to_string());
        ProbeResult {
            target: ProbeTarget::head("TS", "http://panel.example/live/u/p/1.ts", 5).unwrap(),
            started_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            elapsed: Duration::from_millis(42),
            outcome: ProbeOutcome::Response(ProbeResponse {
                status: 302,
                version: "HTTP/1.1".to_string(),
                headers,
                body: None,
                body_truncated: false,
            }),
        }
    }

    #[test]
    fn test_summarize_response() {
        let text = summarize(&redirect_result());
        assert!(text.starts_with("[TS] HEAD http://panel.example/live/u/p/1.ts -> 302 Found"));
        assert!(text.contains("in 42 ms"));
        assert!(text.contains("location: http://cdn.example/1.ts"));
        assert!(!text.contains("x-other"));
        assert!(!text.contains("bytes sampled"));
        assert!(text.ends_with("; started 2026-03-14 09:26:53 UTC"));
    }

    #[test]
    fn test_summarize_failure() {
        let mut result = redirect_result();
        result.outcome = ProbeOutcome::Failed(ProbeError::DnsResolution(
            "panel.example".into(),
            "no record found".into(),
        ));
        let text = summarize(&result);
        assert!(text.contains("error after 42 ms: DNS resolution failed for panel.example"));
        assert!(text.contains("started 2026-03-14 09:26:53 UTC"));
    }

    #[test]
    fn test_render_headers_lists_all() {
        let text = render_headers(&redirect_result());
        assert_eq!(text, "  location: http://cdn.example/1.ts\n  x-other: ignored\n");
    }

    #[test]
    fn test_render_account() {
        let report = AccountReport {
            account: "Trex".to_string(),
            categories: Some(StageTiming { items: 12, elapsed: Duration::from_millis(1500) }),
            streams: Some(StageTiming { items: 900, elapsed: Duration::from_secs(3) }),
            matches: vec![StreamMatch {
                stream_id: FlexId::Number(7),
                name: "US | MSNBC".to_string(),
                play_url: "http://line.example/live/u/p/7.ts".to_string(),
            }],
            total_matches: 4,
            failure: None,
        };
        let text = render_account(&report, "MSNBC");
        assert!(text.contains("Categories: 12 items in 1.50s"));
        assert!(text.contains("Found 4 MSNBC streams"));
        assert!(text.contains("- [7] US | MSNBC"));

        let failed = AccountReport {
            categories: None,
            streams: None,
            matches: vec![],
            total_matches: 0,
            failure: Some((BenchmarkStage::Categories, ProbeError::ParseError("expected value".into()))),
            ..report
        };
        let text = render_account(&failed, "MSNBC");
        assert!(text.contains("❌ Categories Error: Failed to parse response"));
        assert!(!text.contains("NOT FOUND"));
    }
}
