//! WorkerBootstrap - worker context 内で実行される起動手順
//!
//! # フロー
//! 1. 最初の inbound message を StartupPayload として分解
//! 2. ModuleLocator で import 先を決めて dynamic import
//! 3. `init(module, memory)` を await
//! 4. `worker_entry_point(state)` を一度だけ呼ぶ
//! 5. `"started"` を一度だけ送信し、以降の inbound message は違反としてログに残す
//!
//! 失敗時は error channel に一度だけ通知し、同じエラーを呼び出し元にも返します。

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::locator::{BundlerSignal, ModuleLocator};
use crate::domain::{
    BootstrapError, BootstrapPhase, InboundMessage, LifecycleSignal, ProtocolViolation,
    ViolationSide,
};
use crate::ports::{Inbox, ModuleLoader, OutboundPort};

/// inbound message をどう処理したか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 起動が完了し `"started"` を送った
    Started,
    /// 終端状態だったのでログに残して捨てた
    Ignored,
}

/// WorkerBootstrap は worker ごとに一度だけ実行される状態機械
pub struct WorkerBootstrap {
    loader: Arc<dyn ModuleLoader>,
    locator: ModuleLocator,
    signal: BundlerSignal,
    phase: BootstrapPhase,
    violations: usize,
}

impl WorkerBootstrap {
    pub fn new(loader: Arc<dyn ModuleLoader>, signal: BundlerSignal) -> Self {
        Self {
            loader,
            locator: ModuleLocator::new(),
            signal,
            phase: BootstrapPhase::Created,
            violations: 0,
        }
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.phase
    }

    /// 終端状態に入ってから受け取ったメッセージの数
    pub fn protocol_violations(&self) -> usize {
        self.violations
    }

    /// worker の main loop
    ///
    /// 起動に失敗したらその時点でエラーを返す。成功した場合は inbox が閉じるまで
    /// 後続のメッセージを捨て続ける。
    pub async fn run(mut self, mut inbox: Inbox, outbound: OutboundPort) -> Result<(), BootstrapError> {
        let Some(first) = inbox.recv().await else {
            debug!(worker = %outbound.worker(), "inbox closed before startup payload");
            return Ok(());
        };
        self.handle_message(first, &outbound).await?;

        while let Some(message) = inbox.recv().await {
            self.handle_message(message, &outbound).await?;
        }
        debug!(worker = %outbound.worker(), "inbox closed, worker exiting");
        Ok(())
    }

    /// 現在の phase に応じて 1 件処理する
    pub async fn handle_message(
        &mut self,
        message: InboundMessage,
        outbound: &OutboundPort,
    ) -> Result<Disposition, BootstrapError> {
        if self.phase.is_terminal() {
            self.record_violation(&message, outbound);
            return Ok(Disposition::Ignored);
        }

        match self.start(message, outbound).await {
            Ok(()) => {
                if !outbound.signal(LifecycleSignal::Started) {
                    debug!(worker = %outbound.worker(), "primary stopped listening before started");
                }
                self.advance(BootstrapPhase::Signaled, outbound);
                Ok(Disposition::Started)
            }
            Err(err) => {
                self.advance(BootstrapPhase::Failed, outbound);
                error!(worker = %outbound.worker(), error = %err, "bootstrap failed");
                outbound.signal(LifecycleSignal::Failed(err.clone()));
                Err(err)
            }
        }
    }

    async fn start(
        &mut self,
        message: InboundMessage,
        outbound: &OutboundPort,
    ) -> Result<(), BootstrapError> {
        let payload = match message {
            InboundMessage::Startup(payload) => payload,
            other => return Err(BootstrapError::UnexpectedMessage(other.kind().to_string())),
        };
        let (module, memory, state, entry_locator) = payload.into_parts();

        self.advance(BootstrapPhase::Importing, outbound);
        let target = self.locator.resolve(self.signal);
        let path = target.path(&entry_locator);
        debug!(worker = %outbound.worker(), ?target, path, "importing entry module");
        let entry = self
            .loader
            .import(path)
            .await
            .map_err(|e| BootstrapError::Import {
                target: path.to_string(),
                reason: e.to_string(),
            })?;

        self.advance(BootstrapPhase::Initializing, outbound);
        entry
            .init(&module, &memory)
            .await
            .map_err(|e| BootstrapError::Init(e.to_string()))?;

        self.advance(BootstrapPhase::Running, outbound);
        entry
            .worker_entry_point(state)
            .map_err(|e| BootstrapError::WorkloadStart(e.to_string()))
    }

    fn advance(&mut self, next: BootstrapPhase, outbound: &OutboundPort) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "invalid bootstrap transition {:?} -> {next:?}",
            self.phase
        );
        debug!(worker = %outbound.worker(), from = ?self.phase, to = ?next, "bootstrap phase");
        self.phase = next;
    }

    fn record_violation(&mut self, message: &InboundMessage, outbound: &OutboundPort) {
        self.violations += 1;
        let violation = ProtocolViolation {
            worker: Some(outbound.worker()),
            side: ViolationSide::Worker,
            message_kind: message.kind(),
        };
        warn!(phase = ?self.phase, "{violation}");
    }
}
