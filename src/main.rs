//! trade-relay entry point.
//!
//! Validates configuration, then runs the change-feed, the event worker,
//! the order-queue poller, the expiry sweeper, and the status API until
//! interrupted.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use trade_relay::api;
use trade_relay::app_state::AppState;
use trade_relay::config::RelayConfig;
use trade_relay::domain::{DedupStore, Expiring, MilestoneTracker};
use trade_relay::feed::RealtimeFeed;
use trade_relay::notifier::{Notifier, TelegramNotifier};
use trade_relay::queue::{OrderQueue, PollSettings, SqsQueue, run_poller};
use trade_relay::service::sweeper::run_sweeper;
use trade_relay::service::{RelayService, run_event_worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration; any missing setting aborts before a task starts.
    let config = RelayConfig::from_env().context("invalid relay configuration")?;
    tracing::info!(?config, "starting trade-relay");

    // Build domain layer
    let dedup = Arc::new(DedupStore::new(config.dedup_window));
    let milestones = Arc::new(MilestoneTracker::new(config.milestone_retention));

    // Build service layer
    let notifier: Arc<dyn Notifier> = Arc::new(
        TelegramNotifier::new(&config.telegram_bot_token, &config.telegram_chat_id)
            .context("building telegram client")?,
    );
    let relay = Arc::new(RelayService::new(
        Arc::clone(&dedup),
        Arc::clone(&milestones),
        notifier,
    ));

    // Change-feed → single event worker
    let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
    let worker = tokio::spawn(run_event_worker(Arc::clone(&relay), event_rx));
    let feed = tokio::spawn(RealtimeFeed::new(&config).run(event_tx));

    // Order queue poller
    let queue: Arc<dyn OrderQueue> = Arc::new(SqsQueue::connect(&config).await);
    let poller = tokio::spawn(run_poller(
        queue,
        Arc::clone(&relay),
        PollSettings::from(&config),
    ));

    // Expiry sweeper
    let stores: Vec<Arc<dyn Expiring>> = vec![dedup, milestones];
    let sweeper = tokio::spawn(run_sweeper(stores, config.sweep_interval));

    // Status API
    let app = api::build_router(AppState::new(relay));
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "status api listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("status api failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    feed.abort();
    poller.abort();
    sweeper.abort();
    worker.abort();
    tracing::info!("trade-relay stopped");
    Ok(())
}
