//! Status - worker の状態スナップショット

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ReadinessState, WorkerId};

/// WorkerStatus は launch した worker の現在の状態
///
/// # 使用例
/// ```ignore
/// let status = handle.status();
/// println!("{}", serde_json::to_string_pretty(&status)?);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub id: WorkerId,
    pub readiness: ReadinessState,
    pub spawned_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    pub protocol_violations: usize,
}
