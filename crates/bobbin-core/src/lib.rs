//! bobbin-core
//!
//! Startup handshake for workers that share a linear memory with the primary context.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（payload, shared memory, protocol, state, errors）
//! - **ports**: 抽象化レイヤー（EntryModule, ModuleLoader, WorkerSpawner）
//! - **app**: 起動ハンドシェイク（ModuleLocator, WorkerBootstrap, WorkerLauncher）
//! - **impls**: 実装（ModuleRegistry, ThreadSpawner）
//! - **config**: 環境変数からの設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{
    BundlerSignal, ImportTarget, ModuleLocator, PendingWorker, WorkerBootstrap, WorkerHandle,
    WorkerLauncher, WorkerStatus,
};
pub use config::{ConfigError, LauncherConfig};
pub use domain::{
    BootstrapError, CompiledModule, LaunchError, SharedMemory, SpawnError, WorkerOptions,
    WorkerState,
};
pub use impls::{ModuleRegistry, ThreadSpawner};
