use iptv_probe_lib::diagnostics;
use iptv_probe_lib::probe::{ClientOptions, ProbeRunner};

const URL: &str = "http://your-provider.com/live/username/password/12345.ts";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    iptv_probe_lib::init_tracing(tracing::Level::WARN);

    // Certificate problems are part of what this tool is meant to surface past
    let runner = ProbeRunner::new(ClientOptions {
        accept_invalid_certs: true,
        ..Default::default()
    })?;

    diagnostics::diagnose_scenarios(&runner, URL).await?;
    Ok(())
}
