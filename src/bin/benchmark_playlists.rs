use iptv_probe_lib::benchmark::BenchmarkOptions;
use iptv_probe_lib::config::Account;
use iptv_probe_lib::diagnostics;
use iptv_probe_lib::probe::{ClientOptions, ProbeRunner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    iptv_probe_lib::init_tracing(tracing::Level::WARN);

    let accounts = vec![
        Account::new("Provider A", "http://your-provider.com:80", "username", "password"),
        Account::new("Provider B", "http://line.other-provider.com", "username", "password"),
    ];

    let runner = ProbeRunner::new(ClientOptions::default())?;
    diagnostics::benchmark(&runner, &accounts, &BenchmarkOptions::default()).await;
    Ok(())
}
