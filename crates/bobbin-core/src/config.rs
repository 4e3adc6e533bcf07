//! LauncherConfig - 環境変数からの設定
//!
//! | 変数 | 意味 |
//! |---|---|
//! | `BOBBIN_BUNDLER` | bundler シグナル（`1`/`true` で bundler の固定パスを import） |
//! | `BOBBIN_WORKER_NAME` | worker のスレッド名 |
//! | `BOBBIN_WORKER_STACK_SIZE` | worker のスタックサイズ（bytes） |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::locator::BundlerSignal;
use crate::domain::WorkerOptions;

pub const ENV_BUNDLER: &str = "BOBBIN_BUNDLER";
pub const ENV_WORKER_NAME: &str = "BOBBIN_WORKER_NAME";
pub const ENV_WORKER_STACK_SIZE: &str = "BOBBIN_WORKER_STACK_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got `{value}`")]
    InvalidStackSize { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub bundler: BundlerSignal,
    pub worker_name: Option<String>,
    pub stack_size: Option<usize>,
}

impl LauncherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の lookup から読む（テストで環境変数を汚さないため）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bundler = BundlerSignal::from_env_value(lookup(ENV_BUNDLER).as_deref());
        let worker_name = lookup(ENV_WORKER_NAME).filter(|name| !name.trim().is_empty());
        let stack_size = match lookup(ENV_WORKER_STACK_SIZE) {
            None => None,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => Some(size),
                _ => {
                    return Err(ConfigError::InvalidStackSize {
                        var: ENV_WORKER_STACK_SIZE,
                        value: raw,
                    });
                }
            },
        };
        Ok(Self {
            bundler,
            worker_name,
            stack_size,
        })
    }

    /// launch 時に使う既定の WorkerOptions
    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            name: self.worker_name.clone(),
            stack_size: self.stack_size,
        }
    }
}
