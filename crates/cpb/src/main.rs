use std::sync::Arc;

use cpb_core::{config::Config, store::SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cpb_core::logging::init("cpb")?;

    let cfg = Arc::new(Config::load()?);
    let store = Arc::new(SqliteStore::open(&cfg.db_path).await?);

    cpb_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| anyhow::anyhow!("telegram bot failed: {e}"))?;

    Ok(())
}
