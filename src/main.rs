use std::path::PathBuf;

use clap::{Parser, Subcommand};

use iptv_probe_lib::benchmark::BenchmarkOptions;
use iptv_probe_lib::config::{DnsProvider, ProbeConfig};
use iptv_probe_lib::diagnostics::{self, CHROME_UA, REDIRECT_TIMEOUT_SECS, STREAM_TIMEOUT_SECS};
use iptv_probe_lib::probe::{ProbeRunner, ProbeTarget, DEFAULT_SAMPLE_BYTES};

#[derive(Parser, Debug)]
#[command(
    name = "iptv-probe",
    version,
    about = "Probe IPTV panels, stream URLs and DNS while troubleshooting"
)]
struct Cli {
    /// Config file (defaults to config.json in the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resolve hosts through this DNS provider instead of the configured one
    #[arg(long, global = true, value_enum)]
    dns: Option<DnsProvider>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    insecure: bool,

    /// Connect directly, ignoring proxy environment variables
    #[arg(long, global = true)]
    no_proxy: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe every target listed in the config file
    Run,
    /// Look a domain up through Google DNS-over-HTTPS
    Dns {
        domain: String,
        /// Record type, e.g. A, AAAA, CNAME
        #[arg(long = "type")]
        record_type: Option<String>,
    },
    /// HEAD each URL without following redirects and show the Location
    Redirect {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Check a stream is delivering bytes by reading only the first few
    Stream {
        url: String,
        #[arg(long)]
        referer: Option<String>,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_BYTES)]
        bytes: usize,
    },
    /// Try a stream URL under several User-Agent/Referer combinations
    Diagnose { url: String },
    /// Time category and stream listing for every configured account
    Benchmark {
        /// Channel name substring to look for (case-sensitive)
        #[arg(long)]
        search: Option<String>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ProbeConfig> {
    let mut config = match &cli.config {
        Some(path) => ProbeConfig::load_from(path)?,
        None => ProbeConfig::load()?,
    };
    if let Some(provider) = cli.dns {
        config.dns_provider = provider;
    }
    if cli.insecure {
        config.accept_invalid_certs = true;
    }
    if cli.no_proxy {
        config.no_proxy = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    iptv_probe_lib::init_tracing(if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    });

    let config = load_config(&cli)?;
    tracing::debug!(
        "Using DNS provider: {}, {} targets, {} accounts",
        config.dns_provider.display_name(),
        config.targets.len(),
        config.accounts.len()
    );
    let runner = ProbeRunner::new(config.client_options())?;

    match cli.command {
        Command::Run => {
            let targets = config.probe_targets()?;
            if targets.is_empty() {
                println!("No targets configured.");
                return Ok(());
            }
            diagnostics::run_targets(&runner, &targets).await;
        }
        Command::Dns { domain, record_type } => {
            let _ = diagnostics::dns_check(&runner, &domain, record_type.as_deref()).await;
        }
        Command::Redirect { urls } => {
            let targets = urls
                .iter()
                .map(|u| ProbeTarget::head(u.as_str(), u, REDIRECT_TIMEOUT_SECS)?.header("user-agent", CHROME_UA))
                .collect::<Result<Vec<_>, _>>()?;
            diagnostics::redirect_check(&runner, &targets).await;
        }
        Command::Stream { url, referer, bytes } => {
            let mut target = ProbeTarget::get("stream", &url, STREAM_TIMEOUT_SECS)?
                .header("user-agent", CHROME_UA)?
                .sample_body(bytes);
            if let Some(referer) = referer {
                target = target.header("referer", &referer)?;
            }
            diagnostics::stream_check(&runner, &target).await;
        }
        Command::Diagnose { url } => {
            diagnostics::diagnose_scenarios(&runner, &url).await?;
        }
        Command::Benchmark { search } => {
            if config.accounts.is_empty() {
                println!("❌ No accounts found in config");
                return Ok(());
            }
            let mut options = BenchmarkOptions::from(&config);
            if let Some(term) = search {
                options.search_term = term;
            }
            diagnostics::benchmark(&runner, &config.accounts, &options).await;
        }
    }

    Ok(())
}
