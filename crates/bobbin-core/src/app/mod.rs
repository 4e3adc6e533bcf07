//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて起動ハンドシェイクを実装します。
//!
//! # 主要コンポーネント
//! - **ModuleLocator**: import 先の決定（純粋関数）
//! - **WorkerBootstrap**: worker 内の状態機械（import → init → entry point → started）
//! - **WorkerLauncher**: primary 側。worker を作り、payload を送り、readiness を追跡
//! - **Status**: worker の状態スナップショット

pub mod bootstrap;
pub mod launcher;
pub mod locator;
pub mod readiness;
pub mod status;

// 主要な型を再エクスポート
pub use self::bootstrap::{Disposition, WorkerBootstrap};
pub use self::launcher::{EVENT_BUFFER, PendingWorker, WorkerHandle, WorkerLauncher};
pub use self::locator::{BUNDLED_ENTRY_PATH, BundlerSignal, ImportTarget, ModuleLocator};
pub use self::readiness::ReadinessSnapshot;
pub use self::status::WorkerStatus;
