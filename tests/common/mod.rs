#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use marginflow::feed::{FeedError, SnapshotFetcher};
use marginflow::ingest::{Clock, IngestionLoop, Scheduler};
use marginflow::store::SeriesStore;

/// Hands out queued responses in order; transport error once exhausted.
#[derive(Default)]
pub struct ScriptedFetcher {
    queue: Mutex<VecDeque<Result<String, FeedError>>>,
}

impl ScriptedFetcher {
    pub fn new(items: Vec<Result<String, FeedError>>) -> Self {
        Self {
            queue: Mutex::new(items.into()),
        }
    }
}

#[async_trait]
impl SnapshotFetcher for ScriptedFetcher {
    async fn fetch(&self) -> Result<String, FeedError> {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FeedError::Transport("no more responses".to_string())))
    }
}

/// Shared settable clock.
#[derive(Clone, Default)]
pub struct ManualClock(pub Arc<AtomicI64>);

impl ManualClock {
    pub fn at(ts: i64) -> Self {
        Self(Arc::new(AtomicI64::new(ts)))
    }

    pub fn set(&self, ts: i64) {
        self.0.store(ts, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct NoPause;

#[async_trait]
impl Scheduler for NoPause {
    async fn pause(&self, _period: Duration) {}
}

pub type TestLoop = IngestionLoop<ScriptedFetcher, ManualClock, NoPause>;

pub fn test_loop(store: SeriesStore, clock: ManualClock, items: Vec<Result<String, FeedError>>) -> TestLoop {
    IngestionLoop::with_time(
        ScriptedFetcher::new(items),
        store,
        Duration::from_secs(60),
        clock,
        NoPause,
    )
}

/// Body shaped like the upstream response.
pub fn snapshot(calc: i64, coins: &[(&str, f64, f64)]) -> Result<String, FeedError> {
    let coins: Vec<_> = coins
        .iter()
        .map(|(asset, borrow, repay)| {
            serde_json::json!({
                "asset": asset,
                "totalBorrowInUsdt": borrow,
                "totalRepayInUsdt": repay,
            })
        })
        .collect();
    Ok(serde_json::json!({
        "code": "000000",
        "data": { "calculationTime": calc, "coins": coins },
        "success": true,
    })
    .to_string())
}

pub fn transport_error() -> Result<String, FeedError> {
    Err(FeedError::Transport("connection refused".to_string()))
}
