//! fedmsg-notifyd — desktop notification daemon for the fedmsg bus.

use tracing_subscriber::EnvFilter;

mod bootstrap;
mod config;
mod dbus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting fedmsg-notify daemon");
    bootstrap::run().await
}
