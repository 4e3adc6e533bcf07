//! ModuleRegistry - in-memory の ModuleLoader
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Arc による共有所有権（primary で登録、worker スレッドで import）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::app::locator::BUNDLED_ENTRY_PATH;
use crate::domain::BoxError;
use crate::ports::{EntryModule, ModuleLoader};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("entry module already registered at `{0}`")]
    DuplicatePath(String),

    #[error("no entry module at `{0}`")]
    NotFound(String),
}

/// Registry of entry modules (import path -> module).
///
/// Design:
/// - Built during initialization (mutable).
/// - Shared with workers afterwards (immutable, behind `Arc`).
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn EntryModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Register a module under an import path.
    pub fn register(
        &mut self,
        path: impl Into<String>,
        module: Arc<dyn EntryModule>,
    ) -> Result<(), RegistryError> {
        let path = path.into();
        if self.modules.contains_key(&path) {
            return Err(RegistryError::DuplicatePath(path));
        }
        self.modules.insert(path, module);
        Ok(())
    }

    /// bundler 環境で import される固定パスに登録
    pub fn register_bundled(&mut self, module: Arc<dyn EntryModule>) -> Result<(), RegistryError> {
        self.register(BUNDLED_ENTRY_PATH, module)
    }

    pub fn get(&self, path: &str) -> Option<&Arc<dyn EntryModule>> {
        self.modules.get(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn import(&self, path: &str) -> Result<Arc<dyn EntryModule>, BoxError> {
        self.get(path)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(path.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingModule;

    #[tokio::test]
    async fn import_returns_registered_module() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("./entry.js", Arc::new(RecordingModule::ok()))
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.import("./entry.js").await.is_ok());
    }

    #[tokio::test]
    async fn import_of_unknown_path_fails() {
        let registry = ModuleRegistry::new();
        let err = registry.import("./missing.js").await.err().unwrap();
        assert_eq!(err.to_string(), "no entry module at `./missing.js`");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ModuleRegistry::new();
        registry
            .register_bundled(Arc::new(RecordingModule::ok()))
            .unwrap();
        let err = registry
            .register(BUNDLED_ENTRY_PATH, Arc::new(RecordingModule::ok()))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicatePath(BUNDLED_ENTRY_PATH.into()));
    }
}
