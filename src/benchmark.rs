//! Multi-account Xtream benchmark: list live categories, then (only if that
//! worked) list live streams and pick out channels by name.

use std::time::Duration;

use serde_json::Value;

use crate::api::{Stream, XtreamAccount};
use crate::config::{Account, ProbeConfig};
use crate::errors::ProbeError;
use crate::flex_id::FlexId;
use crate::probe::{ProbeRunner, ProbeTarget};

#[derive(Debug, Clone)]
pub struct BenchmarkOptions {
    /// Case-sensitive substring looked for in each stream `name`
    pub search_term: String,
    pub max_matches: usize,
    pub categories_timeout_secs: u64,
    pub streams_timeout_secs: u64,
    pub stream_extension: String,
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self {
            search_term: "MSNBC".to_string(),
            max_matches: 3,
            categories_timeout_secs: 30,
            streams_timeout_secs: 120,
            stream_extension: "ts".to_string(),
        }
    }
}

impl From<&ProbeConfig> for BenchmarkOptions {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            search_term: config.search_term.clone(),
            max_matches: config.max_matches,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkStage {
    Categories,
    Streams,
}

impl std::fmt::Display for BenchmarkStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchmarkStage::Categories => write!(f, "Categories"),
            BenchmarkStage::Streams => write!(f, "Streams"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub items: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamMatch {
    pub stream_id: FlexId,
    pub name: String,
    pub play_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountReport {
    pub account: String,
    pub categories: Option<StageTiming>,
    pub streams: Option<StageTiming>,
    /// First `max_matches` hits only
    pub matches: Vec<StreamMatch>,
    pub total_matches: usize,
    /// Set when a stage failed; later stages were skipped
    pub failure: Option<(BenchmarkStage, ProbeError)>,
}

impl AccountReport {
    fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            categories: None,
            streams: None,
            matches: Vec::new(),
            total_matches: 0,
            failure: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// A stage passes when the body is a JSON array; its elements are not
/// checked here.
async fn fetch_list(
    runner: &ProbeRunner,
    target: Result<ProbeTarget, ProbeError>,
) -> Result<(Vec<Value>, Duration), ProbeError> {
    let result = runner.probe(&target?).await;
    let items: Vec<Value> = result.json()?;
    Ok((items, result.elapsed))
}

/// Streams whose name contains `term`, in panel order.
pub fn find_streams<'a>(streams: &'a [Stream], term: &str) -> Vec<&'a Stream> {
    streams.iter().filter(|s| s.name.contains(term)).collect()
}

pub async fn benchmark_account(
    runner: &ProbeRunner,
    account: &Account,
    options: &BenchmarkOptions,
) -> AccountReport {
    let mut report = AccountReport::new(&account.name);
    let xtream = XtreamAccount::from(account);

    let target = xtream.live_categories_target(
        &format!("{} categories", account.name),
        options.categories_timeout_secs,
    );
    match fetch_list(runner, target).await {
        Ok((cats, elapsed)) => {
            report.categories = Some(StageTiming { items: cats.len(), elapsed });
        }
        Err(e) => {
            tracing::warn!(account = %account.name, error = %e, "categories stage failed, skipping streams");
            report.failure = Some((BenchmarkStage::Categories, e));
            return report;
        }
    }

    let target = xtream.live_streams_target(
        &format!("{} streams", account.name),
        options.streams_timeout_secs,
    );
    let streams: Vec<Stream> = match fetch_list(runner, target).await {
        Ok((items, elapsed)) => {
            report.streams = Some(StageTiming { items: items.len(), elapsed });
            items.iter().map(Stream::from_value).collect()
        }
        Err(e) => {
            tracing::warn!(account = %account.name, error = %e, "streams stage failed");
            report.failure = Some((BenchmarkStage::Streams, e));
            return report;
        }
    };

    let hits = find_streams(&streams, &options.search_term);
    report.total_matches = hits.len();
    report.matches = hits
        .into_iter()
        .take(options.max_matches)
        .map(|s| StreamMatch {
            stream_id: s.stream_id.clone(),
            name: s.name.clone(),
            play_url: xtream.get_stream_url(&s.stream_id, &options.stream_extension),
        })
        .collect();
    report
}

/// Benchmark each account in turn; one account failing never stops the rest.
pub async fn run_benchmark<F>(
    runner: &ProbeRunner,
    accounts: &[Account],
    options: &BenchmarkOptions,
    mut on_report: F,
) -> Vec<AccountReport>
where
    F: FnMut(&AccountReport),
{
    let mut reports = Vec::with_capacity(accounts.len());
    for account in accounts {
        let report = benchmark_account(runner, account, options).await;
        on_report(&report);
        reports.push(report);
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(id: i64, name: &str) -> Stream {
        Stream {
            stream_id: FlexId::Number(id),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_streams_is_case_sensitive() {
        let streams = vec![
            stream(1, "US | MSNBC HD"),
            stream(2, "msnbc lowercase"),
            stream(3, "CNN"),
            stream(4, "MSNBC"),
        ];
        let hits = find_streams(&streams, "MSNBC");
        let ids: Vec<_> = hits.iter().map(|s| s.stream_id.clone()).collect();
        assert_eq!(ids, vec![FlexId::Number(1), FlexId::Number(4)]);
    }

    #[test]
    fn test_options_from_config() {
        let config = ProbeConfig {
            search_term: "ESPN".to_string(),
            max_matches: 5,
            ..Default::default()
        };
        let opts = BenchmarkOptions::from(&config);
        assert_eq!(opts.search_term, "ESPN");
        assert_eq!(opts.max_matches, 5);
        assert_eq!(opts.categories_timeout_secs, 30);
        assert_eq!(opts.streams_timeout_secs, 120);
    }
}
