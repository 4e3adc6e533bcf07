use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, sleep};

use bobbin_core::domain::{BoxError, MemoryError};
use bobbin_core::impls::RegistryError;
use bobbin_core::ports::EntryModule;
use bobbin_core::{
    CompiledModule, LauncherConfig, ModuleRegistry, SharedMemory, ThreadSpawner, WorkerLauncher,
    WorkerState,
};

const ENTRY_LOCATOR: &str = "./sum_worker.js";
const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

/// 結果を書き込む位置（先頭 8 bytes: 合計, 次の 1 byte: 完了フラグ）
const RESULT_OFFSET: usize = 0;
const DONE_OFFSET: usize = 8;

#[derive(Debug, Deserialize)]
struct SumJob {
    values: Vec<u64>,
}

/// 共有メモリに合計を書き込むワークロード
struct SumWorker {
    remaining_failures: AtomicU32,
    /// init で受け取った共有メモリ（entry point で使う）
    memory: Mutex<Option<SharedMemory>>,
}

impl SumWorker {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
            memory: Mutex::new(None),
        }
    }
}

#[async_trait]
impl EntryModule for SumWorker {
    async fn init(&self, module: &CompiledModule, memory: &SharedMemory) -> Result<(), BoxError> {
        if !module.bytes().starts_with(&WASM_MAGIC) {
            return Err("module is not a wasm binary".into());
        }

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(format!("intentional init failure (left={left})").into());
        }

        if memory.size_pages() == 0 {
            memory.grow(1)?;
        }
        *self.memory.lock().map_err(|_| "memory slot poisoned")? = Some(memory.clone());
        Ok(())
    }

    fn worker_entry_point(&self, state: WorkerState) -> Result<(), BoxError> {
        let job = state
            .downcast_ref::<SumJob>()
            .ok_or("worker state is not a SumJob")?;
        let values = job.values.clone();
        let memory = self
            .memory
            .lock()
            .map_err(|_| "memory slot poisoned")?
            .clone()
            .ok_or("init did not run")?;

        // entry point は同期的に戻り、実際の計算は worker の LocalSet 上で続く
        tokio::task::spawn_local(async move {
            let sum: u64 = values.iter().sum();
            let result: Result<(), MemoryError> = memory
                .write(RESULT_OFFSET, &sum.to_le_bytes())
                .and_then(|()| memory.write(DONE_OFFSET, &[1]));
            if let Err(e) = result {
                tracing::error!("failed to publish result: {e}");
            }
        });
        Ok(())
    }
}

/// BOBBIN_BUNDLER の有無でどちらの path が import されても同じワークロードになるよう登録
fn sum_registry(worker: Arc<SumWorker>) -> Result<ModuleRegistry, RegistryError> {
    let mut registry = ModuleRegistry::new();
    registry.register(ENTRY_LOCATOR, worker.clone())?;
    registry.register_bundled(worker)?;
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // (A) 設定と entry module を用意
    let config = match LauncherConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("invalid config: {err}");
            return Err(err.into());
        }
    };

    let registry = sum_registry(Arc::new(SumWorker::new(1)))?;
    let launcher = WorkerLauncher::from_config(
        &config,
        Arc::new(registry),
        Arc::new(ThreadSpawner::new()),
    );

    // (B) 共有メモリと payload の材料
    let memory = SharedMemory::new(1, Some(4))?;
    let module = CompiledModule::from_bytes(WASM_MAGIC.to_vec());
    let job: SumJob = serde_json::from_value(serde_json::json!({ "values": [1, 2, 3, 4, 5] }))?;
    let state = WorkerState::new(job);

    // (C) 起動。失敗した worker は使えないので、新しい worker で再挑戦する
    let mut attempt = 1;
    let handle = loop {
        match launcher
            .launch(
                module.clone(),
                memory.clone(),
                state.clone(),
                launcher.default_options().clone(),
                ENTRY_LOCATOR,
            )
            .await
        {
            Ok(handle) => break handle,
            Err(err) if attempt < 3 => {
                println!("launch attempt {attempt} failed: {err}");
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    };
    println!("worker started: {}", handle.id());

    // (D) 完了フラグをポーリングで待つ
    loop {
        let mut done = [0u8; 1];
        memory.read(DONE_OFFSET, &mut done)?;
        if done[0] == 1 {
            let mut sum = [0u8; 8];
            memory.read(RESULT_OFFSET, &mut sum)?;
            println!("sum computed by worker: {}", u64::from_le_bytes(sum));
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }

    println!("{}", serde_json::to_string_pretty(&handle.status())?);

    // (E) サンプルなので worker を止める
    handle.terminate();
    Ok(())
}
