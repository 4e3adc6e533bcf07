//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ModuleRegistry**: in-memory の ModuleLoader（path -> EntryModule）
//! - **ThreadSpawner**: OS スレッド + current-thread runtime による WorkerSpawner

pub mod module_registry;
pub mod thread_spawner;

// 主要な型を再エクスポート
pub use self::module_registry::{ModuleRegistry, RegistryError};
pub use self::thread_spawner::ThreadSpawner;
