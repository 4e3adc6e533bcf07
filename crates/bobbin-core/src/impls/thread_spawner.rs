//! ThreadSpawner - OS スレッドを worker context とする WorkerSpawner
//!
//! # 実装詳細
//! - worker ごとに専用スレッドを立て、その中に current-thread の tokio runtime を作る
//! - `LocalSet` 上で実行するので、ワークロードは `spawn_local` で `!Send` な処理を起動できる
//! - worker 内の panic は捕まえて error channel に `BootstrapError::Panicked` として流す
//!
//! inbox が閉じる（handle の drop / terminate）と bootstrap が戻り、スレッドは終了します。
//! その時点で終わっていない `spawn_local` のタスクは破棄されます。

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing::{debug, error};

use crate::domain::{BootstrapError, InboundMessage, SpawnError, WorkerId, WorkerOptions};
use crate::ports::{Inbox, OutboundPort, WorkerMain, WorkerPort, WorkerSpawner};

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSpawner;

impl ThreadSpawner {
    pub fn new() -> Self {
        Self
    }
}

impl WorkerSpawner for ThreadSpawner {
    fn spawn(
        &self,
        id: WorkerId,
        options: &WorkerOptions,
        main: WorkerMain,
        outbound: OutboundPort,
    ) -> Result<Box<dyn WorkerPort>, SpawnError> {
        let (tx, inbox) = mpsc::unbounded_channel();

        let name = options.name.clone().unwrap_or_else(|| id.to_string());
        // std は NUL を含むスレッド名で panic する
        if name.contains('\0') {
            return Err(SpawnError::Create(format!(
                "worker name {name:?} contains a NUL byte"
            )));
        }
        let mut builder = std::thread::Builder::new().name(name);
        if let Some(stack_size) = options.stack_size {
            builder = builder.stack_size(stack_size);
        }

        builder
            .spawn(move || run_worker(main, inbox, outbound))
            .map_err(|e| SpawnError::Create(e.to_string()))?;

        debug!(worker = %id, "worker thread spawned");
        Ok(Box::new(ThreadWorkerPort {
            tx: Mutex::new(Some(tx)),
        }))
    }
}

fn run_worker(main: WorkerMain, inbox: Inbox, outbound: OutboundPort) -> Result<(), BootstrapError> {
    let errors = outbound.clone();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let err = BootstrapError::Runtime(e.to_string());
            error!(worker = %errors.worker(), error = %err, "worker runtime unavailable");
            errors.report_error(err.clone());
            return Err(err);
        }
    };

    let local = LocalSet::new();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        local.block_on(&runtime, main(inbox, outbound))
    }));

    match result {
        Ok(result) => result,
        Err(payload) => {
            let err = BootstrapError::Panicked(panic_message(payload.as_ref()));
            error!(worker = %errors.worker(), error = %err, "worker panicked");
            errors.report_error(err.clone());
            Err(err)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// primary 側の送信口
///
/// terminate で sender を捨てると worker の inbox が閉じる。
struct ThreadWorkerPort {
    tx: Mutex<Option<mpsc::UnboundedSender<InboundMessage>>>,
}

impl WorkerPort for ThreadWorkerPort {
    fn post_message(&self, message: InboundMessage) -> Result<(), SpawnError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx
                .send(message)
                .map_err(|_| SpawnError::Send("worker has exited".to_string())),
            None => Err(SpawnError::Send("worker was terminated".to_string())),
        }
    }

    fn terminate(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
