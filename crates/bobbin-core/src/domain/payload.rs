//! StartupPayload - primary から worker へ送る唯一のメッセージ
//!
//! # フィールド（位置順）
//! 1. module: コンパイル済み artifact のハンドル
//! 2. memory: 共有メモリのハンドル
//! 3. state: ワークロードだけが解釈する opaque な値
//! 4. entry_locator: bundler が使えないときの import 先

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::memory::SharedMemory;

/// コンパイル済みモジュールの opaque なハンドル
///
/// clone は参照カウントの増加のみで、バイト列はコピーされません。
#[derive(Clone, PartialEq, Eq)]
pub struct CompiledModule {
    bytes: Arc<[u8]>,
}

impl CompiledModule {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModule")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// primary 側で組み立てられ、ワークロードにだけ意味を持つ状態
///
/// bootstrap はこの値を解釈せず、`worker_entry_point` にそのまま渡します。
#[derive(Clone)]
pub struct WorkerState {
    value: Arc<dyn Any + Send + Sync>,
}

impl WorkerState {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    /// 中身を持たない状態（`{}` 相当）
    pub fn empty() -> Self {
        Self::new(())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WorkerState(..)")
    }
}

/// worker 生成時の設定（spawner にそのまま渡す）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerOptions {
    /// スレッド名など、プラットフォーム側での表示名
    pub name: Option<String>,
    /// worker のスタックサイズ（bytes）
    pub stack_size: Option<usize>,
}

impl WorkerOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// StartupPayload は launcher が一度だけ組み立て、bootstrap が一度だけ消費する
///
/// 送信後に変更されないよう、フィールドは非公開にして `into_parts` で分解します。
#[derive(Debug, Clone)]
pub struct StartupPayload {
    module: CompiledModule,
    memory: SharedMemory,
    state: WorkerState,
    entry_locator: String,
}

impl StartupPayload {
    pub fn new(
        module: CompiledModule,
        memory: SharedMemory,
        state: WorkerState,
        entry_locator: impl Into<String>,
    ) -> Self {
        Self {
            module,
            memory,
            state,
            entry_locator: entry_locator.into(),
        }
    }

    pub fn entry_locator(&self) -> &str {
        &self.entry_locator
    }

    /// `[module, memory, state, entry_locator]` の順に分解
    pub fn into_parts(self) -> (CompiledModule, SharedMemory, WorkerState, String) {
        (self.module, self.memory, self.state, self.entry_locator)
    }
}
