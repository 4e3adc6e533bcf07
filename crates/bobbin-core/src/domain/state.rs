//! State - bootstrap と readiness の状態

use serde::{Deserialize, Serialize};

/// BootstrapPhase は worker 内の bootstrap の状態
///
/// # 状態遷移
/// - Created -> Importing -> Initializing -> Running -> Signaled
/// - Created | Importing | Initializing | Running -> Failed
///
/// Signaled と Failed は終端。終端に入った後の inbound message は違反としてログに残すだけ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BootstrapPhase {
    /// 最初の inbound message 待ち
    Created,
    /// import 先を決めて dynamic import 中
    Importing,
    /// `init(module, memory)` の完了待ち
    Initializing,
    /// `worker_entry_point(state)` 実行中
    Running,
    /// `"started"` を送信済み
    Signaled,
    /// 失敗（error channel に通知済み）
    Failed,
}

impl BootstrapPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, BootstrapPhase::Signaled | BootstrapPhase::Failed)
    }

    /// この遷移が許されるか
    pub fn can_advance_to(self, next: BootstrapPhase) -> bool {
        use BootstrapPhase::*;
        matches!(
            (self, next),
            (Created, Importing)
                | (Importing, Initializing)
                | (Initializing, Running)
                | (Running, Signaled)
                | (Created | Importing | Initializing | Running, Failed)
        )
    }
}

/// ReadinessState は primary 側から見た readiness
///
/// Pending から一度だけ Resolved か Rejected に移り、その後は変わらない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadinessState {
    Pending,
    Resolved,
    Rejected,
}

impl ReadinessState {
    pub fn is_settled(self) -> bool {
        !matches!(self, ReadinessState::Pending)
    }
}
