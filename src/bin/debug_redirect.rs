use iptv_probe_lib::diagnostics::{self, CHROME_UA, REDIRECT_TIMEOUT_SECS};
use iptv_probe_lib::probe::{ClientOptions, ProbeRunner, ProbeTarget};

const URL_TS: &str = "http://your-provider.com/live/username/password/12345.ts";
const URL_M3U8: &str = "http://your-provider.com/live/username/password/12345.m3u8";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    iptv_probe_lib::init_tracing(tracing::Level::WARN);

    let runner = ProbeRunner::new(ClientOptions::default())?;
    let targets = vec![
        ProbeTarget::head("TS", URL_TS, REDIRECT_TIMEOUT_SECS)?.header("user-agent", CHROME_UA)?,
        ProbeTarget::head("M3U8", URL_M3U8, REDIRECT_TIMEOUT_SECS)?.header("user-agent", CHROME_UA)?,
    ];

    diagnostics::redirect_check(&runner, &targets).await;
    Ok(())
}
