use iptv_probe_lib::diagnostics::{self, CHROME_UA, STREAM_TIMEOUT_SECS};
use iptv_probe_lib::probe::{ClientOptions, ProbeRunner, ProbeTarget, DEFAULT_SAMPLE_BYTES};

const URL: &str = "http://your-provider.com/live/username/password/12345.ts";
const REFERER: &str = "http://your-provider.com/";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    iptv_probe_lib::init_tracing(tracing::Level::WARN);

    let runner = ProbeRunner::new(ClientOptions::default())?;
    let target = ProbeTarget::get("stream", URL, STREAM_TIMEOUT_SECS)?
        .header("user-agent", CHROME_UA)?
        .header("referer", REFERER)?
        .sample_body(DEFAULT_SAMPLE_BYTES);

    diagnostics::stream_check(&runner, &target).await;
    Ok(())
}
