//! WorkerSpawner port - worker context の生成
//!
//! # 学習ポイント
//! - `Box<dyn FnOnce(..) -> Pin<Box<dyn Future>> + Send>` で「別スレッドで実行される非同期処理」を渡す
//! - worker 内の future は `Send` でなくてよい（worker は自分専用の単一スレッド runtime を持つ）

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::domain::{
    BootstrapError, InboundMessage, LifecycleSignal, OutboundMessage, SpawnError, WorkerEvent, WorkerId,
    WorkerOptions,
};

/// worker が受け取る inbound message の受信口
pub type Inbox = mpsc::UnboundedReceiver<InboundMessage>;

/// worker context 上で poll される future（`Send` は要求しない）
pub type WorkerFuture = Pin<Box<dyn Future<Output = Result<(), BootstrapError>>>>;

/// worker context 上で実行される本体
///
/// 起動失敗は error channel に通知済みのうえで、ここからも `Err` として返る。
pub type WorkerMain = Box<dyn FnOnce(Inbox, OutboundPort) -> WorkerFuture + Send>;

/// primary 側から見た、起動済み worker への送信口
pub trait WorkerPort: Send + Sync {
    /// FIFO で worker に送る。worker が既に閉じていれば同期的に失敗する。
    fn post_message(&self, message: InboundMessage) -> Result<(), SpawnError>;

    /// 以降の送信を止め、worker に終了を促す
    fn terminate(&self);
}

/// WorkerSpawner は新しい worker context を作る
///
/// # 設計原則
/// - `options` は解釈せずプラットフォームに渡す
/// - 生成に失敗したら `SpawnError` を同期的に返す（`main` は実行されない）
pub trait WorkerSpawner: Send + Sync {
    fn spawn(
        &self,
        id: WorkerId,
        options: &WorkerOptions,
        main: WorkerMain,
        outbound: OutboundPort,
    ) -> Result<Box<dyn WorkerPort>, SpawnError>;
}

/// worker → primary の送信口
///
/// `post_message` が message channel、`report_error` が uncaught-error channel に相当します。
#[derive(Debug, Clone)]
pub struct OutboundPort {
    worker: WorkerId,
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl OutboundPort {
    pub fn channel(worker: WorkerId) -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { worker, tx }, rx)
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// primary が既に受信をやめていれば false
    pub fn post_message(&self, message: OutboundMessage) -> bool {
        self.tx.send(WorkerEvent::Message(message)).is_ok()
    }

    pub fn report_error(&self, error: BootstrapError) -> bool {
        self.tx.send(WorkerEvent::Error(error)).is_ok()
    }

    /// bootstrap の結果を対応する channel に流す
    pub fn signal(&self, signal: LifecycleSignal) -> bool {
        match signal {
            LifecycleSignal::Started => self.post_message(OutboundMessage::Started),
            LifecycleSignal::Failed(error) => self.report_error(error),
        }
    }
}
