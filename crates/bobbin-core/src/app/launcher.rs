//! WorkerLauncher - primary 側の起動手順
//!
//! # フロー
//! 1. WorkerSpawner で worker を作る（失敗したら即 reject、何も送らない）
//! 2. 生成直後に StartupPayload を一度だけ送る（失敗したら worker を terminate して reject）
//! 3. monitor タスクが worker からのイベントを読み、readiness を一度だけ確定する
//!
//! readiness 確定後のメッセージとエラーは `WorkerHandle::next_event` に転送します。
//! 二つ目の `"started"` は転送せず、プロトコル違反としてログに残します。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::bootstrap::WorkerBootstrap;
use super::locator::BundlerSignal;
use super::readiness::{Readiness, ReadinessSnapshot, ReadyReceiver};
use super::status::WorkerStatus;
use crate::config::LauncherConfig;
use crate::domain::{
    CompiledModule, InboundMessage, LaunchError, OutboundMessage, ProtocolViolation,
    ReadinessState, SharedMemory, SpawnError, StartupPayload, ViolationSide, WorkerEvent,
    WorkerId, WorkerOptions, WorkerState,
};
use crate::ports::{
    Inbox, ModuleLoader, OutboundPort, WorkerFuture, WorkerMain, WorkerPort, WorkerSpawner,
};

/// readiness 確定後のイベントを handle 側で保持する数
///
/// `next_event` で読まれないまま溢れた分は `warn!` を出して捨てる。
pub const EVENT_BUFFER: usize = 256;

/// WorkerLauncher は worker を一つずつ起動する
///
/// # 使用例
/// ```ignore
/// let launcher = WorkerLauncher::new(Arc::new(registry), Arc::new(ThreadSpawner::new()));
/// let handle = launcher
///     .launch(module, memory, WorkerState::empty(), WorkerOptions::default(), "./entry.js")
///     .await?;
/// ```
pub struct WorkerLauncher {
    loader: Arc<dyn ModuleLoader>,
    spawner: Arc<dyn WorkerSpawner>,
    signal: BundlerSignal,
    default_options: WorkerOptions,
}

impl WorkerLauncher {
    pub fn new(loader: Arc<dyn ModuleLoader>, spawner: Arc<dyn WorkerSpawner>) -> Self {
        Self {
            loader,
            spawner,
            signal: BundlerSignal::default(),
            default_options: WorkerOptions::default(),
        }
    }

    pub fn from_config(
        config: &LauncherConfig,
        loader: Arc<dyn ModuleLoader>,
        spawner: Arc<dyn WorkerSpawner>,
    ) -> Self {
        Self {
            loader,
            spawner,
            signal: config.bundler,
            default_options: config.worker_options(),
        }
    }

    /// worker 側の ModuleLocator に渡す環境シグナルを設定
    pub fn with_signal(mut self, signal: BundlerSignal) -> Self {
        self.signal = signal;
        self
    }

    /// 設定から組み立てた既定の WorkerOptions
    pub fn default_options(&self) -> &WorkerOptions {
        &self.default_options
    }

    /// worker を作って StartupPayload を送るところまでを同期的に行う
    ///
    /// # Errors
    /// - 生成に失敗: `LaunchError::Spawn(SpawnError::Create)`（payload は送られない）
    /// - 送信に失敗: `LaunchError::Spawn(SpawnError::Send)`（worker は terminate される）
    ///
    /// # Panics
    /// monitor タスクを `tokio::spawn` するので、tokio runtime の中で呼ぶこと。
    pub fn start(
        &self,
        module: CompiledModule,
        memory: SharedMemory,
        state: WorkerState,
        options: WorkerOptions,
        entry_locator: impl Into<String>,
    ) -> Result<PendingWorker, LaunchError> {
        let id = WorkerId::generate();
        let spawned_at = Utc::now();
        let (outbound, events) = OutboundPort::channel(id);

        let bootstrap = WorkerBootstrap::new(Arc::clone(&self.loader), self.signal);
        let main: WorkerMain = Box::new(move |inbox: Inbox, outbound: OutboundPort| -> WorkerFuture {
            Box::pin(bootstrap.run(inbox, outbound))
        });

        let port = self
            .spawner
            .spawn(id, &options, main, outbound)
            .inspect_err(|err| warn!(worker = %id, error = %err, "worker creation failed"))?;

        let payload = StartupPayload::new(module, memory, state, entry_locator);
        if let Err(err) = port.post_message(InboundMessage::Startup(payload)) {
            warn!(worker = %id, error = %err, "startup payload could not be sent");
            port.terminate();
            return Err(err.into());
        }
        debug!(worker = %id, "startup payload sent");

        let (readiness, ready, snapshot) = Readiness::new();
        let (forward_tx, forward_rx) = mpsc::channel(EVENT_BUFFER);
        let violations = Arc::new(AtomicUsize::new(0));
        tokio::spawn(monitor(
            id,
            events,
            readiness,
            forward_tx,
            Arc::clone(&violations),
        ));

        Ok(PendingWorker {
            handle: WorkerHandle {
                id,
                port,
                snapshot,
                events: forward_rx,
                violations,
                spawned_at,
            },
            ready,
        })
    }

    /// worker を起動し、`"started"` を受け取るまで待つ
    ///
    /// タイムアウトは持たない。必要なら `tokio::time::timeout` で包むこと。
    pub async fn launch(
        &self,
        module: CompiledModule,
        memory: SharedMemory,
        state: WorkerState,
        options: WorkerOptions,
        entry_locator: impl Into<String>,
    ) -> Result<WorkerHandle, LaunchError> {
        self.start(module, memory, state, options, entry_locator)?
            .ready()
            .await
    }
}

/// worker からのイベントを読み、readiness を確定させる
async fn monitor(
    worker: WorkerId,
    mut events: mpsc::UnboundedReceiver<WorkerEvent>,
    mut readiness: Readiness,
    forward: mpsc::Sender<WorkerEvent>,
    violations: Arc<AtomicUsize>,
) {
    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Message(OutboundMessage::Started) => {
                if readiness.resolve() {
                    info!(worker = %worker, "worker started");
                } else {
                    violations.fetch_add(1, Ordering::SeqCst);
                    let violation = ProtocolViolation {
                        worker: Some(worker),
                        side: ViolationSide::Primary,
                        message_kind: OutboundMessage::Started.kind(),
                    };
                    warn!(state = ?readiness.state(), "{violation}");
                }
            }
            WorkerEvent::Message(message) if readiness.is_pending() => {
                warn!(worker = %worker, kind = message.kind(), "message before started");
                readiness.reject(LaunchError::UnexpectedMessage(message.kind().to_string()));
            }
            WorkerEvent::Error(error) if readiness.is_pending() => {
                readiness.reject(LaunchError::Upstream(error));
            }
            event => {
                if let WorkerEvent::Error(error) = &event {
                    warn!(worker = %worker, error = %error, "worker error after readiness settled");
                }
                match forward.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(event)) => {
                        warn!(
                            worker = %worker,
                            kind = event.kind(),
                            capacity = EVENT_BUFFER,
                            "event buffer full, dropping worker event"
                        );
                    }
                    // handle が drop 済み
                    Err(TrySendError::Closed(_)) => {}
                }
            }
        }
    }

    if readiness.reject(LaunchError::Disconnected) {
        warn!(worker = %worker, "worker exited before signaling started");
    }
    debug!(worker = %worker, "worker event stream closed");
}

/// readiness 待ちの worker
///
/// `ready()` は一度だけ確定する。確定前でも `handle()` で terminate などができる。
pub struct PendingWorker {
    handle: WorkerHandle,
    ready: ReadyReceiver,
}

impl PendingWorker {
    pub fn handle(&self) -> &WorkerHandle {
        &self.handle
    }

    /// `"started"` を受け取ったら handle を返す
    pub async fn ready(self) -> Result<WorkerHandle, LaunchError> {
        match self.ready.await {
            Ok(Ok(())) => Ok(self.handle),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(LaunchError::Disconnected),
        }
    }
}

impl fmt::Debug for PendingWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWorker")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// 起動した worker のハンドル（所有権は呼び出し元にある）
///
/// この crate は worker を terminate しない。handle を drop すると送信口が閉じ、
/// worker はワークロードの entry point が戻った後に終了する。
pub struct WorkerHandle {
    id: WorkerId,
    port: Box<dyn WorkerPort>,
    snapshot: watch::Receiver<ReadinessSnapshot>,
    events: mpsc::Receiver<WorkerEvent>,
    violations: Arc<AtomicUsize>,
    spawned_at: DateTime<Utc>,
}

impl WorkerHandle {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// worker にデータを送る（started 後の worker はログに残して捨てる）
    pub fn post_message(&self, value: serde_json::Value) -> Result<(), SpawnError> {
        self.port.post_message(InboundMessage::Data(value))
    }

    pub fn terminate(&self) {
        debug!(worker = %self.id, "terminating worker");
        self.port.terminate();
    }

    pub fn readiness(&self) -> ReadinessState {
        self.snapshot.borrow().state
    }

    /// primary 側で観測した二つ目以降の `"started"` の数
    pub fn protocol_violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    /// readiness 確定後に worker から届いたメッセージ・エラー
    ///
    /// 読まれていないイベントは最大 `EVENT_BUFFER` 件まで保持し、それを超えた分は捨てる。
    /// worker が終了して全て読み終えたら None。
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.events.recv().await
    }

    pub fn status(&self) -> WorkerStatus {
        let snapshot = *self.snapshot.borrow();
        WorkerStatus {
            id: self.id,
            readiness: snapshot.state,
            spawned_at: self.spawned_at,
            settled_at: snapshot.settled_at,
            protocol_violations: self.protocol_violations(),
        }
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("readiness", &self.readiness())
            .finish_non_exhaustive()
    }
}
