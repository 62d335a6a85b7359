use anyhow::Result;
use marginflow::{app, config::Config, logging::log_fatal};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    if let Err(err) = app::run(cfg).await {
        log_fatal(&format!("{:#}", err));
        return Err(err);
    }
    Ok(())
}
