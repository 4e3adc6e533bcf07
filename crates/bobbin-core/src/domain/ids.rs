//! WorkerId - ワーカーの識別子
//!
//! ULID ベースの ID を使用します。
//! 時刻でソート可能なので、ログ上で起動順に並べられます。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// 起動した worker context を識別する ID
///
/// Display では `worker-` プレフィックスを付けます（ログ・スレッド名に使う）。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(Ulid);

impl WorkerId {
    /// 新しい WorkerId を生成
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// ULID から WorkerId を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for WorkerId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_worker_prefix() {
        let ulid = Ulid::new();
        let id = WorkerId::from_ulid(ulid);
        assert_eq!(id.to_string(), format!("worker-{ulid}"));
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn generated_ids_are_unique_and_sortable() {
        let id1 = WorkerId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2)); // 時刻が進むのを待つ
        let id2 = WorkerId::generate();

        assert_ne!(id1, id2);
        assert!(id1 < id2);
    }

    #[test]
    fn worker_id_serializes_as_ulid_string() {
        let id = WorkerId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
    }
}
