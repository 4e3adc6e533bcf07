//! EntryModule port - dynamic import で得られるモジュール
//!
//! import 先のコードは `init` と `worker_entry_point` を公開している必要があります。

use async_trait::async_trait;

use crate::domain::{BoxError, CompiledModule, SharedMemory, WorkerState};

/// EntryModule は worker が import するコードの表面
///
/// # 呼び出し順序（bootstrap が保証）
/// 1. `init(module, memory)` を一度だけ await
/// 2. 成功したら `worker_entry_point(state)` を一度だけ呼ぶ
///
/// # Thread Safety
/// - primary 側で登録され worker スレッドから呼ばれるので `Send + Sync`
#[async_trait]
pub trait EntryModule: Send + Sync {
    /// コンパイル済みモジュールを共有メモリ上にインスタンス化する
    async fn init(&self, module: &CompiledModule, memory: &SharedMemory) -> Result<(), BoxError>;

    /// ワークロードを開始する
    ///
    /// 同期的に戻ること。追加の非同期処理は `tokio::task::spawn_local` で起動できるが、
    /// その完了はハンドシェイクの対象外。
    fn worker_entry_point(&self, state: WorkerState) -> Result<(), BoxError>;
}
