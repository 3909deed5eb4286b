use iptv_probe_lib::diagnostics;
use iptv_probe_lib::probe::{ClientOptions, ProbeRunner};

const DOMAIN: &str = "your-provider.com";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    iptv_probe_lib::init_tracing(tracing::Level::WARN);

    let runner = ProbeRunner::new(ClientOptions::default())?;
    let _ = diagnostics::dns_check(&runner, DOMAIN, None).await;
    Ok(())
}
