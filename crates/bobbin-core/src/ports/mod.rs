//! Ports - 抽象化レイヤー
//!
//! bootstrap が外部に求めるインターフェースを定義します。
//!
//! - **EntryModule**: `init` と `worker_entry_point` を持つ import 先
//! - **ModuleLoader**: dynamic import
//! - **WorkerSpawner / WorkerPort**: worker context の生成と primary → worker の送信
//! - **OutboundPort**: worker → primary の message / error channel

pub mod entry_module;
pub mod module_loader;
pub mod spawner;

pub use self::entry_module::EntryModule;
pub use self::module_loader::ModuleLoader;
pub use self::spawner::{
    Inbox, OutboundPort, WorkerFuture, WorkerMain, WorkerPort, WorkerSpawner,
};
