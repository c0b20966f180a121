pub mod chat;
pub mod key;
pub mod onboard;
pub mod stats;

use std::sync::Arc;

use mathtutor_config::AppConfig;
use mathtutor_providers::GeminiTransport;
use mathtutor_session::Tutor;
use mathtutor_store::FileStore;

/// Load config and open a tutor over the file-backed preference store.
pub(crate) async fn open_tutor() -> Result<(AppConfig, Tutor), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = Arc::new(FileStore::new(config.resolved_store_path()));
    let transport = Arc::new(GeminiTransport::from_config(&config)?);
    let tutor = Tutor::open(&config, transport, store).await?;
    Ok((config, tutor))
}
