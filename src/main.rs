use advisor_voice::{ChatGateway, Config};
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "advisor-voice")]
#[command(about = "Voice conversation engine for the advisor chat widget")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/advisor-voice")]
    config: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Advisor Voice v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Control API will bind to {}:{}",
        cfg.service.http.bind, cfg.service.http.port
    );
    info!("Chat endpoint: {}", cfg.backend.chat_url);
    info!("Live endpoint: {}", cfg.backend.live_url);
    info!("Language: {}", cfg.conversation.language.as_str());

    if cfg.backend.api_key.is_none() {
        warn!("No API key configured; set ADVISOR_BACKEND__API_KEY");
    }

    let _gateway = ChatGateway::new(&cfg.backend)?;
    info!("Chat gateway ready");

    Ok(())
}
