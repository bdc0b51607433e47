//! Entry point: load config, open real-time channels and log store changes until Ctrl-C.

use std::sync::Arc;

use sportisode_sync::config::Config;
use sportisode_sync::error::SyncError;
use sportisode_sync::models::Channel;
use sportisode_sync::transport::WsConnector;
use sportisode_sync::{ConnectionManager, Dispatcher, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(SyncError::from)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let stream_id = std::env::var("STREAM_ID")
        .ok()
        .map(|v| v.parse::<u64>())
        .transpose()
        .map_err(|e| anyhow::anyhow!("STREAM_ID: {}", e))?;

    let store = Store::new(config.stream_chat_capacity);
    let manager = ConnectionManager::new(
        &config,
        Arc::new(WsConnector),
        Dispatcher::new(store.clone()),
    );

    let mut handles = vec![manager.try_open(Channel::Notifications)?];
    if let Some(id) = stream_id {
        handles.push(manager.try_open(Channel::stream(id))?);
    }
    tracing::info!(base = %config.ws_base_url, channels = handles.len(), "sync started");

    let mut revisions = store.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let revision = *revisions.borrow_and_update();
                let unread = store.unread_count().await;
                match stream_id {
                    Some(id) => tracing::info!(
                        revision,
                        unread,
                        viewers = store.viewer_count(id).await,
                        chat = store.stream_chat(id).await.len(),
                        "store updated"
                    ),
                    None => tracing::info!(revision, unread, "store updated"),
                }
            }
        }
    }

    tracing::info!("shutting down");
    for handle in handles {
        handle.close().await;
    }
    Ok(())
}
