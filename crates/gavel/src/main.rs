use std::sync::Arc;

use gavel_core::{
    config::Config,
    store::{port::RecordStore, BaserowClient},
};

#[tokio::main]
async fn main() -> Result<(), gavel_core::Error> {
    gavel_core::logging::init("gavel")?;

    let cfg = Arc::new(Config::load()?);
    let store: Arc<dyn RecordStore> = Arc::new(BaserowClient::new(&cfg)?);

    gavel_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| gavel_core::Error::Messenger(format!("telegram bot failed: {e}")))?;

    Ok(())
}
