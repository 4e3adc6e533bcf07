//! Readiness - 一度だけ確定する readiness
//!
//! # 学習ポイント
//! - `Option<oneshot::Sender>` を `take()` して「一度だけ」を型で表現
//! - `watch` で現在の状態をハンドル側から覗けるようにする

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};

use crate::domain::{LaunchError, ReadinessState};

/// ある時点の readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessSnapshot {
    pub state: ReadinessState,
    pub settled_at: Option<DateTime<Utc>>,
}

impl ReadinessSnapshot {
    fn pending() -> Self {
        Self {
            state: ReadinessState::Pending,
            settled_at: None,
        }
    }
}

pub(crate) type ReadyReceiver = oneshot::Receiver<Result<(), LaunchError>>;

/// Readiness は resolve / reject のどちらかを高々一度だけ行う
pub(crate) struct Readiness {
    settle: Option<oneshot::Sender<Result<(), LaunchError>>>,
    snapshot: watch::Sender<ReadinessSnapshot>,
}

impl Readiness {
    pub(crate) fn new() -> (Self, ReadyReceiver, watch::Receiver<ReadinessSnapshot>) {
        let (settle_tx, settle_rx) = oneshot::channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ReadinessSnapshot::pending());
        let readiness = Self {
            settle: Some(settle_tx),
            snapshot: snapshot_tx,
        };
        (readiness, settle_rx, snapshot_rx)
    }

    pub(crate) fn state(&self) -> ReadinessState {
        self.snapshot.borrow().state
    }

    pub(crate) fn is_pending(&self) -> bool {
        !self.state().is_settled()
    }

    /// 未確定なら resolve して true
    pub(crate) fn resolve(&mut self) -> bool {
        self.settle(ReadinessState::Resolved, Ok(()))
    }

    /// 未確定なら reject して true
    pub(crate) fn reject(&mut self, error: LaunchError) -> bool {
        self.settle(ReadinessState::Rejected, Err(error))
    }

    fn settle(&mut self, state: ReadinessState, outcome: Result<(), LaunchError>) -> bool {
        let Some(settle) = self.settle.take() else {
            return false;
        };
        self.snapshot.send_replace(ReadinessSnapshot {
            state,
            settled_at: Some(Utc::now()),
        });
        // ignore send error: the caller may have stopped waiting
        let _ = settle.send(outcome);
        true
    }
}
