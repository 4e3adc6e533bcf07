//! Protocol - primary と worker の間を流れるメッセージ
//!
//! # メッセージ
//! - primary → worker: `InboundMessage::Startup` を生成直後に一度だけ。それ以降は `Data`。
//! - worker → primary: 成功時に `"started"` を一度だけ。
//! - error channel: worker の uncaught error に相当する `WorkerEvent::Error`。

use std::fmt;

use super::errors::BootstrapError;
use super::ids::WorkerId;
use super::payload::StartupPayload;

/// 起動成功を表すリテラル
pub const STARTED: &str = "started";

/// primary → worker
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Startup(StartupPayload),
    Data(serde_json::Value),
}

impl InboundMessage {
    /// ログ用の短い説明（payload の中身は出さない）
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Startup(_) => "startup",
            InboundMessage::Data(_) => "data",
        }
    }
}

/// worker → primary
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// payload を持たない `"started"`
    Started,
    Data(serde_json::Value),
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Started => STARTED,
            OutboundMessage::Data(_) => "data",
        }
    }
}

/// primary が worker から受け取るイベント
///
/// message channel と error channel を 1 本の FIFO に多重化しています。
/// これにより「error を送ってから切断」の順序が primary 側でも保たれます。
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Message(OutboundMessage),
    Error(BootstrapError),
}

impl WorkerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerEvent::Message(message) => message.kind(),
            WorkerEvent::Error(_) => "error",
        }
    }
}

/// worker が起動後に出す唯一の意味あるシグナル
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleSignal {
    Started,
    Failed(BootstrapError),
}

/// どちらの側でプロトコル違反を観測したか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationSide {
    /// worker が started 後に inbound message を受け取った
    Worker,
    /// primary が readiness 確定後に二つ目の started を受け取った
    Primary,
}

/// started 以降に届いたメッセージ
///
/// ログに残すだけで、throw も伝播もしない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolViolation {
    pub worker: Option<WorkerId>,
    pub side: ViolationSide,
    pub message_kind: &'static str,
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            ViolationSide::Worker => "worker",
            ViolationSide::Primary => "primary",
        };
        match self.worker {
            Some(worker) => write!(
                f,
                "unexpected `{}` message on {side} side of {worker} after started",
                self.message_kind
            ),
            None => write!(
                f,
                "unexpected `{}` message on {side} side after started",
                self.message_kind
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_uses_the_literal() {
        assert_eq!(OutboundMessage::Started.kind(), "started");
        assert_eq!(
            WorkerEvent::Message(OutboundMessage::Started).kind(),
            STARTED
        );
        assert_eq!(
            WorkerEvent::Error(BootstrapError::Init("x".into())).kind(),
            "error"
        );
    }

    #[test]
    fn violation_display_names_the_message() {
        let violation = ProtocolViolation {
            worker: None,
            side: ViolationSide::Worker,
            message_kind: "data",
        };
        assert_eq!(
            violation.to_string(),
            "unexpected `data` message on worker side after started"
        );
    }
}
