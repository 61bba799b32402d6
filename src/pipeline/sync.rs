// Sync orchestrator: runs one cycle across every subscribed game.
//
// Flow per game:
// 1. Fetch the latest-updated mods (fetches for several games may be in
//    flight at once, results are consumed in game order)
// 2. Reconcile against the seen-mod ledger
// 3. Format notifications (changelogs fetched for updates only)
// 4. Send every message to every subscribed channel
//
// A failure at any step is contained to the smallest unit it affects: one
// mod, one channel, or one game. Only a failure to load the subscription
// list aborts the whole cycle.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::chat::traits::ChatPlatform;
use crate::db::{Database, SubscriptionStore};
use crate::error::FeedError;
use crate::nexus::models::FetchedMod;
use crate::nexus::traits::ModSource;
use crate::output::notification::{format_new_mods, FormattedBatch};

use super::reconcile::reconcile;

/// Scan-state key holding the finish time of the last completed cycle.
pub const LAST_SYNC_KEY: &str = "last_sync_at";

/// What happened to one game during a cycle.
#[derive(Debug)]
pub enum GameOutcome {
    /// Nothing upstream that the ledger hadn't already seen.
    NoNewMods,
    /// New mods were recorded and (where anything was presentable) sent.
    Delivered(DeliverySummary),
    /// The game was skipped this cycle; its mods will be retried next time.
    Failed(FeedError),
}

/// Counters for a game that had new mods.
#[derive(Debug, Default)]
pub struct DeliverySummary {
    pub new_mods: usize,
    /// Cards built from those mods.
    pub units: usize,
    /// Messages each channel should receive.
    pub messages: usize,
    pub discarded: usize,
    pub changelog_failures: usize,
    pub channels_delivered: usize,
    /// Channels that no longer exist or the bot can't see.
    pub channels_skipped: usize,
    pub channel_failures: Vec<FeedError>,
}

#[derive(Debug)]
pub struct GameReport {
    pub game: String,
    pub channels: usize,
    pub outcome: GameOutcome,
}

/// Result of one full cycle, in game order.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub games: Vec<GameReport>,
    pub finished_at: String,
}

impl CycleReport {
    pub fn new_mod_count(&self) -> usize {
        self.games
            .iter()
            .map(|g| match &g.outcome {
                GameOutcome::Delivered(d) => d.new_mods,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_game_count(&self) -> usize {
        self.games
            .iter()
            .filter(|g| matches!(g.outcome, GameOutcome::Failed(_)))
            .count()
    }

    pub fn channel_failure_count(&self) -> usize {
        self.games
            .iter()
            .map(|g| match &g.outcome {
                GameOutcome::Delivered(d) => d.channel_failures.len(),
                _ => 0,
            })
            .sum()
    }
}

pub struct SyncOrchestrator {
    db: Arc<dyn Database>,
    source: Arc<dyn ModSource>,
    chat: Arc<dyn ChatPlatform>,
    fetch_concurrency: usize,
    in_progress: AtomicBool,
}

/// Clears the in-progress flag when a cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncOrchestrator {
    pub fn new(
        db: Arc<dyn Database>,
        source: Arc<dyn ModSource>,
        chat: Arc<dyn ChatPlatform>,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            db,
            source,
            chat,
            fetch_concurrency: fetch_concurrency.max(1),
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Run one cycle unless another is already in progress.
    ///
    /// Returns None when skipped. Err means the cycle couldn't start at all
    /// (subscriptions unreadable); per-game problems live in the report.
    pub async fn try_run_cycle(&self) -> Option<Result<CycleReport>> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Previous sync cycle still running, skipping this tick");
            return None;
        }
        let _guard = CycleGuard(&self.in_progress);

        Some(self.run_cycle().await)
    }

    async fn run_cycle(&self) -> Result<CycleReport> {
        let subscriptions = self
            .db
            .list_subscriptions_by_game()
            .await
            .map_err(|e| FeedError::storage_unavailable("loading subscriptions", &e))?;

        info!(games = subscriptions.len(), "Starting sync cycle");

        let mut report = CycleReport::default();

        // Fetches run ahead up to fetch_concurrency; `buffered` yields them
        // in input order so the rest of the cycle stays sequential.
        let mut fetches = stream::iter(subscriptions.into_iter().map(|(game, channels)| {
            let source = self.source.clone();
            async move {
                let fetched = source.fetch_recent_mods(&game).await;
                (game, channels, fetched)
            }
        }))
        .buffered(self.fetch_concurrency);

        while let Some((game, channels, fetched)) = fetches.next().await {
            let outcome = match fetched {
                Ok(mods) => self.process_game(&game, &channels, &mods).await,
                Err(e) => {
                    let err = FeedError::source_unavailable(&game, &e);
                    error!(game = %game, error = %err, "Fetch failed, skipping game this cycle");
                    GameOutcome::Failed(err)
                }
            };

            report.games.push(GameReport {
                game,
                channels: channels.len(),
                outcome,
            });
        }

        report.finished_at = chrono::Utc::now().to_rfc3339();
        if let Err(e) = self.db.set_scan_state(LAST_SYNC_KEY, &report.finished_at).await {
            warn!(error = %e, "Failed to record last sync time");
        }

        info!(
            games = report.games.len(),
            new_mods = report.new_mod_count(),
            failed_games = report.failed_game_count(),
            channel_failures = report.channel_failure_count(),
            "Sync cycle complete"
        );

        Ok(report)
    }

    async fn process_game(
        &self,
        game: &str,
        channels: &[String],
        fetched: &[FetchedMod],
    ) -> GameOutcome {
        let new_mods = match reconcile(self.db.as_ref(), game, fetched).await {
            Ok(new_mods) => new_mods,
            Err(e) => {
                let err = FeedError::storage_unavailable(format!("reconciling {game}"), &e);
                error!(game = game, error = %err, "Reconcile failed, skipping game this cycle");
                return GameOutcome::Failed(err);
            }
        };

        if new_mods.is_empty() {
            debug!(game = game, fetched = fetched.len(), "No new mods");
            return GameOutcome::NoNewMods;
        }

        let batch = format_new_mods(self.source.as_ref(), game, &new_mods).await;
        let mut summary = DeliverySummary {
            new_mods: new_mods.len(),
            units: batch.unit_count,
            messages: batch.messages.len(),
            discarded: batch.discarded,
            changelog_failures: batch.changelog_failures,
            ..Default::default()
        };

        if batch.is_empty() {
            info!(game = game, discarded = batch.discarded, "New mods had nothing presentable");
            return GameOutcome::Delivered(summary);
        }

        for channel_id in channels {
            self.deliver(game, channel_id, &batch, &mut summary).await;
        }

        info!(
            game = game,
            new_mods = summary.new_mods,
            messages = summary.messages,
            channels = summary.channels_delivered,
            "Delivered notifications"
        );

        GameOutcome::Delivered(summary)
    }

    /// Send a game's batch to one channel. Stops at the first failed send so
    /// later messages in the batch don't arrive out of context.
    async fn deliver(
        &self,
        game: &str,
        channel_id: &str,
        batch: &FormattedBatch,
        summary: &mut DeliverySummary,
    ) {
        let handle = match self.chat.resolve_channel(channel_id).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                warn!(game = game, channel_id = channel_id, "Channel not found, skipping");
                summary.channels_skipped += 1;
                return;
            }
            Err(e) => {
                let err = FeedError::delivery_failure(channel_id, &e);
                warn!(game = game, channel_id = channel_id, error = %err, "Channel lookup failed");
                summary.channel_failures.push(err);
                return;
            }
        };

        for message in &batch.messages {
            if let Err(e) = self.chat.send_message(&handle, message).await {
                let err = FeedError::delivery_failure(channel_id, &e);
                warn!(
                    game = game,
                    channel_id = channel_id,
                    channel = handle.label(),
                    error = %err,
                    "Send failed, moving to next channel"
                );
                summary.channel_failures.push(err);
                return;
            }
        }

        summary.channels_delivered += 1;
    }

    /// Run a cycle on every tick until `shutdown` resolves.
    ///
    /// The first tick fires immediately. Each cycle runs in its own task, so
    /// a slow cycle doesn't delay the ticker; the in-progress flag makes the
    /// overlapping tick a no-op instead.
    ///
    /// On shutdown no new cycle is started, but a cycle already in flight is
    /// awaited before this returns, so no recorded mod is left unsent.
    pub async fn run<F>(self: Arc<Self>, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut cycles = JoinSet::new();

        info!(interval_secs = period.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Reap cycles that already finished
                    while cycles.try_join_next().is_some() {}

                    let this = Arc::clone(&self);
                    cycles.spawn(async move {
                        if let Some(Err(e)) = this.try_run_cycle().await {
                            error!(error = %e, "Sync cycle aborted");
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
            }
        }

        if !cycles.is_empty() {
            info!(pending = cycles.len(), "Waiting for in-flight sync cycle to finish");
        }
        while let Some(joined) = cycles.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Sync cycle task panicked");
            }
        }
        info!("Scheduler stopped");
    }
}
