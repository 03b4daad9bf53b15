//! Background task announcing greetings written by other processes.
//!
//! A guestbook file can be shared: `invitation post` or a second server
//! appends on its own connection and never touches this process's
//! notifier. The watcher polls the store and publishes those rows so open
//! pages refresh as they do for local appends.

use std::time::Duration;

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state::AppState;

/// Polls `state` every `every` until shutdown begins.
pub fn spawn_insert_watcher(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shutdown = state.shutdown_receiver();
        let mut timer = tokio::time::interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "event=insert_watch module=watcher status=start interval_ms={}",
            every.as_millis()
        );

        while !*shutdown.borrow() {
            tokio::select! {
                _ = timer.tick() => {}
                _ = shutdown.changed() => break,
            }

            if let Err(err) = state.blocking(|state| state.sync_external_inserts()).await {
                warn!("event=insert_watch module=watcher status=error error={err}");
            }
        }

        info!("event=insert_watch module=watcher status=ok detail=stopped");
    })
}
