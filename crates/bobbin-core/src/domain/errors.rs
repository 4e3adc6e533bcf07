//! Errors - 起動ハンドシェイクのエラー分類
//!
//! # 分類
//! - SpawnError: worker の生成または初回送信が同期的に失敗
//! - BootstrapError: worker 内部の import / init / entry point の失敗（worker にとって致命的）
//! - LaunchError: primary 側から見た launch の失敗
//!
//! ProtocolViolation は error ではなくログ対象なので `domain::protocol` にあります。

use thiserror::Error;

/// ports の collaborator（loader, entry module）が返すエラー
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// worker の生成、または StartupPayload の送信が同期的に失敗した
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("worker creation failed: {0}")]
    Create(String),

    #[error("message could not be delivered to the worker: {0}")]
    Send(String),
}

/// worker 内の bootstrap が失敗した（リトライなし、その worker は使えない）
///
/// error channel を越えて primary に届けるため、原因は文字列で保持します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("import of `{target}` failed: {reason}")]
    Import { target: String, reason: String },

    #[error("module init failed: {0}")]
    Init(String),

    #[error("worker entry point failed: {0}")]
    WorkloadStart(String),

    #[error("expected a startup payload as the first message, got {0}")]
    UnexpectedMessage(String),

    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("worker runtime could not be created: {0}")]
    Runtime(String),
}

/// launch の失敗（primary 側の readiness が reject された理由）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error("worker failed during bootstrap: {0}")]
    Upstream(#[from] BootstrapError),

    #[error("worker sent `{0}` before signaling started")]
    UnexpectedMessage(String),

    #[error("worker exited before signaling started")]
    Disconnected,
}
