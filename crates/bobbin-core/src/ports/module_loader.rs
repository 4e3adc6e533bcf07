//! ModuleLoader port - dynamic import の抽象化

use std::sync::Arc;

use async_trait::async_trait;

use super::entry_module::EntryModule;
use crate::domain::BoxError;

/// ModuleLoader は import path から EntryModule を解決する
///
/// # 実装
/// - **ModuleRegistry**: path -> module の in-memory 登録表
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn import(&self, path: &str) -> Result<Arc<dyn EntryModule>, BoxError>;
}
