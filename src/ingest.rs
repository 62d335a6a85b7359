//! Polling loop that turns upstream snapshots into per-asset series points.
//!
//! Each cycle is Idle -> Polling -> Idle. A snapshot is accepted only when its
//! `calculationTime` is strictly greater than the last accepted one; accepting
//! appends one point to every asset listed in it. The pause before the next
//! cycle starts after the current one finishes, so cycles never overlap.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

use crate::feed::{CoinStat, FeedError, Snapshot, SnapshotFetcher};
use crate::logging::{log_accepted, log_asset_failed, log_fetch_failed, log_stale, Domain};
use crate::store::{SeriesStore, StoreError};

/// Wall-clock source, Unix seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// The wait between two cycles.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn pause(&self, period: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn pause(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// New upstream data; `written` assets got a point, `failed` were skipped.
    Accepted {
        calculation_time: i64,
        written: usize,
        failed: usize,
    },
    /// Upstream has not recomputed since the last accepted snapshot.
    Stale {
        calculation_time: i64,
        last_accepted: i64,
    },
    FetchFailed(FeedError),
}

impl CycleOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CycleOutcome::Accepted { .. })
    }
}

pub struct IngestionLoop<F, C = SystemClock, S = TokioScheduler> {
    fetcher: F,
    store: SeriesStore,
    clock: C,
    scheduler: S,
    period: Duration,
    last_accepted: i64,
}

impl<F: SnapshotFetcher> IngestionLoop<F> {
    pub fn new(fetcher: F, store: SeriesStore, period: Duration) -> Self {
        Self::with_time(fetcher, store, period, SystemClock, TokioScheduler)
    }
}

impl<F, C, S> IngestionLoop<F, C, S>
where
    F: SnapshotFetcher,
    C: Clock,
    S: Scheduler,
{
    /// The acceptance floor starts at the current wall-clock time.
    pub fn with_time(fetcher: F, store: SeriesStore, period: Duration, clock: C, scheduler: S) -> Self {
        let last_accepted = clock.now_unix();
        Self {
            fetcher,
            store,
            clock,
            scheduler,
            period,
            last_accepted,
        }
    }

    pub fn last_accepted(&self) -> i64 {
        self.last_accepted
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs until the process ends.
    pub async fn run(mut self) {
        loop {
            self.tick().await;
        }
    }

    /// One full cycle followed by the pause before the next one.
    pub async fn tick(&mut self) -> CycleOutcome {
        let outcome = self.poll_once().await;
        self.scheduler.pause(self.period).await;
        outcome
    }

    /// Fetch, decide, and append if the snapshot is new. Never pauses.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        match self.fetcher.fetch_snapshot().await {
            Ok(snapshot) => self.apply(snapshot).await,
            Err(e) => {
                log_fetch_failed(&e.to_string());
                CycleOutcome::FetchFailed(e)
            }
        }
    }

    pub async fn apply(&mut self, snapshot: Snapshot) -> CycleOutcome {
        let calculation_time = snapshot.calculation_time;
        if calculation_time <= self.last_accepted {
            log_stale(calculation_time, self.last_accepted);
            return CycleOutcome::Stale {
                calculation_time,
                last_accepted: self.last_accepted,
            };
        }

        let observed_at = self.clock.now_unix();
        let results = append_all(self.store.clone(), snapshot.coins, observed_at).await;

        let mut written = 0;
        let mut failed = 0;
        for (asset, result) in results {
            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    failed += 1;
                    log_asset_failed(Domain::Ingest, &asset, &e.to_string());
                }
            }
        }

        // Advances even when some assets failed; they wait for the next upstream update.
        self.last_accepted = calculation_time;
        log_accepted(calculation_time, written, failed);
        CycleOutcome::Accepted {
            calculation_time,
            written,
            failed,
        }
    }
}

/// Appends one point per coin on the blocking pool; record I/O is synchronous.
async fn append_all(
    store: SeriesStore,
    coins: Vec<CoinStat>,
    observed_at: i64,
) -> Vec<(String, Result<(), StoreError>)> {
    let assets: Vec<String> = coins.iter().map(|c| c.asset.clone()).collect();
    let job = tokio::task::spawn_blocking(move || {
        coins
            .into_iter()
            .map(|coin| {
                let result = append(&store, &coin, observed_at);
                (coin.asset, result)
            })
            .collect::<Vec<_>>()
    });
    match job.await {
        Ok(results) => results,
        Err(e) => {
            let reason = e.to_string();
            assets
                .into_iter()
                .map(|asset| (asset, Err(StoreError::Task(reason.clone()))))
                .collect()
        }
    }
}

fn append(store: &SeriesStore, coin: &CoinStat, observed_at: i64) -> Result<(), StoreError> {
    let mut series = store.load(&coin.asset)?;
    series.push(coin.total_borrow_in_usdt, coin.total_repay_in_usdt, observed_at);
    store.save(&coin.asset, &series)
}
