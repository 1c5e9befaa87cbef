use anyhow::Context;
use watchlist_screener::config::ScreenerConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    watchlist_screener::init_tracing();
    let config = ScreenerConfig::from_env().context("failed to load configuration")?;

    match watchlist_screener::run(config).await {
        Ok(path) => {
            tracing::info!("Report saved to {}", path.display());
            println!("{}", path.display());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed [{}]: {}", e.code(), e);
            if e.is_data_source() {
                tracing::warn!("Check TUSHARE_TOKEN and the API quota");
            }
            Err(e).context("screening run failed")
        }
    }
}
