//! テスト用の collaborator（entry module と spawner の差し替え）

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{
    BoxError, CompiledModule, InboundMessage, OutboundMessage, SharedMemory, SpawnError,
    WorkerId, WorkerOptions, WorkerState,
};
use crate::ports::{EntryModule, OutboundPort, WorkerMain, WorkerPort, WorkerSpawner};

/// 呼び出し順と回数を記録する EntryModule
#[derive(Default)]
pub(crate) struct RecordingModule {
    init_error: Option<String>,
    entry_error: Option<String>,
    entry_panics: bool,
    calls: Mutex<Vec<&'static str>>,
    memory_seen: Mutex<Option<SharedMemory>>,
    state_seen: Mutex<Option<WorkerState>>,
}

impl RecordingModule {
    pub(crate) fn ok() -> Self {
        Self::default()
    }

    pub(crate) fn failing_init(message: &str) -> Self {
        Self {
            init_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn failing_entry(message: &str) -> Self {
        Self {
            entry_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn panicking_entry() -> Self {
        Self {
            entry_panics: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn entry_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == "worker_entry_point")
            .count()
    }

    pub(crate) fn memory_seen(&self) -> Option<SharedMemory> {
        self.memory_seen.lock().unwrap().clone()
    }

    pub(crate) fn state_seen(&self) -> Option<WorkerState> {
        self.state_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntryModule for RecordingModule {
    async fn init(&self, _module: &CompiledModule, memory: &SharedMemory) -> Result<(), BoxError> {
        self.calls.lock().unwrap().push("init");
        *self.memory_seen.lock().unwrap() = Some(memory.clone());
        match &self.init_error {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }

    fn worker_entry_point(&self, state: WorkerState) -> Result<(), BoxError> {
        self.calls.lock().unwrap().push("worker_entry_point");
        *self.state_seen.lock().unwrap() = Some(state);
        if self.entry_panics {
            panic!("workload exploded");
        }
        match &self.entry_error {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}

/// 生成そのものが失敗する spawner
pub(crate) struct FailingSpawner {
    message: String,
    attempts: AtomicUsize,
}

impl FailingSpawner {
    pub(crate) fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl WorkerSpawner for FailingSpawner {
    fn spawn(
        &self,
        _id: WorkerId,
        _options: &WorkerOptions,
        _main: WorkerMain,
        _outbound: OutboundPort,
    ) -> Result<Box<dyn WorkerPort>, SpawnError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SpawnError::Create(self.message.clone()))
    }
}

/// 送られたメッセージを記録するだけの port
#[derive(Clone, Default)]
pub(crate) struct RecordingPort {
    posted: Arc<Mutex<Vec<&'static str>>>,
    terminated: Arc<AtomicUsize>,
    reject_posts: bool,
}

impl RecordingPort {
    pub(crate) fn rejecting() -> Self {
        Self {
            reject_posts: true,
            ..Self::default()
        }
    }

    pub(crate) fn posted(&self) -> Vec<&'static str> {
        self.posted.lock().unwrap().clone()
    }

    pub(crate) fn terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst) > 0
    }
}

impl WorkerPort for RecordingPort {
    fn post_message(&self, message: InboundMessage) -> Result<(), SpawnError> {
        if self.reject_posts {
            return Err(SpawnError::Send("port closed".into()));
        }
        self.posted.lock().unwrap().push(message.kind());
        Ok(())
    }

    fn terminate(&self) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

/// bootstrap を実行せず、決められたイベントだけを primary に送る spawner
///
/// 「worker が started を二度送る」などのプロトコル外の振る舞いを再現するのに使う。
pub(crate) struct ScriptedSpawner {
    port: RecordingPort,
    script: Vec<ScriptStep>,
    hold_open: bool,
    held: Mutex<Vec<OutboundPort>>,
}

#[derive(Clone)]
pub(crate) enum ScriptStep {
    Post(OutboundMessage),
    Error(crate::domain::BootstrapError),
}

impl ScriptedSpawner {
    pub(crate) fn new(port: RecordingPort, script: Vec<ScriptStep>) -> Self {
        Self {
            port,
            script,
            hold_open: true,
            held: Mutex::new(Vec::new()),
        }
    }

    /// スクリプト実行後に outbound を drop する（worker の終了を再現）
    pub(crate) fn disconnecting(mut self) -> Self {
        self.hold_open = false;
        self
    }
}

impl WorkerSpawner for ScriptedSpawner {
    fn spawn(
        &self,
        _id: WorkerId,
        _options: &WorkerOptions,
        _main: WorkerMain,
        outbound: OutboundPort,
    ) -> Result<Box<dyn WorkerPort>, SpawnError> {
        for step in &self.script {
            match step {
                ScriptStep::Post(message) => outbound.post_message(message.clone()),
                ScriptStep::Error(error) => outbound.report_error(error.clone()),
            };
        }
        if self.hold_open {
            self.held.lock().unwrap().push(outbound);
        }
        Ok(Box::new(self.port.clone()))
    }
}
