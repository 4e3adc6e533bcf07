//! SharedMemory - primary と worker が共有する線形メモリ
//!
//! # 学習ポイント
//! - `Arc` による共有所有権（clone してもメモリはコピーされない）
//! - `RwLock` による読み書きの排他
//! - ページ単位（64 KiB）での grow

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

/// 1 ページのサイズ（64 KiB）
pub const PAGE_SIZE: usize = 64 * 1024;

/// 線形メモリの上限ページ数（4 GiB）。`maximum_pages` が None のときもこれで打ち止め。
pub const MAX_PAGES: u32 = 65536;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("initial size {initial} pages exceeds maximum {maximum} pages")]
    InitialExceedsMaximum { initial: u32, maximum: u32 },

    #[error("cannot grow from {current} by {delta} pages (maximum {maximum})")]
    GrowBeyondMaximum { current: u32, delta: u32, maximum: u32 },

    #[error("access of {len} bytes at offset {offset} is out of bounds (size {size})")]
    OutOfBounds { offset: usize, len: usize, size: usize },
}

struct Inner {
    bytes: RwLock<Vec<u8>>,
    maximum_pages: Option<u32>,
}

/// SharedMemory は worker 境界を越えて共有される growable なメモリブロック
///
/// # 設計原則
/// - clone はハンドルの複製のみ（同じブロックを指す）
/// - アクセスの調停はワークロード側の責務（ここではロックで壊れないことだけ保証）
#[derive(Clone)]
pub struct SharedMemory {
    inner: Arc<Inner>,
}

impl SharedMemory {
    /// `initial_pages` ページで確保する。`maximum_pages` が None なら上限なし。
    pub fn new(initial_pages: u32, maximum_pages: Option<u32>) -> Result<Self, MemoryError> {
        let maximum = effective_maximum(maximum_pages);
        if initial_pages > maximum {
            return Err(MemoryError::InitialExceedsMaximum {
                initial: initial_pages,
                maximum,
            });
        }
        Ok(Self {
            inner: Arc::new(Inner {
                bytes: RwLock::new(vec![0; initial_pages as usize * PAGE_SIZE]),
                maximum_pages,
            }),
        })
    }

    pub fn size_pages(&self) -> u32 {
        (self.size_bytes() / PAGE_SIZE) as u32
    }

    pub fn size_bytes(&self) -> usize {
        self.inner
            .bytes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn maximum_pages(&self) -> Option<u32> {
        self.inner.maximum_pages
    }

    /// `delta` ページ拡張し、拡張前のページ数を返す
    pub fn grow(&self, delta: u32) -> Result<u32, MemoryError> {
        let mut bytes = self
            .inner
            .bytes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let current = (bytes.len() / PAGE_SIZE) as u32;
        let maximum = effective_maximum(self.inner.maximum_pages);
        match current.checked_add(delta) {
            Some(next) if next <= maximum => {}
            _ => {
                return Err(MemoryError::GrowBeyondMaximum {
                    current,
                    delta,
                    maximum,
                });
            }
        }
        let new_len = bytes.len() + delta as usize * PAGE_SIZE;
        bytes.resize(new_len, 0);
        Ok(current)
    }

    /// `offset` から `buf.len()` バイト読み出す
    pub fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
        let bytes = self
            .inner
            .bytes
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let range = checked_range(offset, buf.len(), bytes.len())?;
        buf.copy_from_slice(&bytes[range]);
        Ok(())
    }

    /// `offset` に `data` を書き込む
    pub fn write(&self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        let mut bytes = self
            .inner
            .bytes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let range = checked_range(offset, data.len(), bytes.len())?;
        bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// 2 つのハンドルが同じブロックを指しているか
    pub fn ptr_eq(&self, other: &SharedMemory) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn effective_maximum(maximum_pages: Option<u32>) -> u32 {
    maximum_pages.map_or(MAX_PAGES, |maximum| maximum.min(MAX_PAGES))
}

fn checked_range(
    offset: usize,
    len: usize,
    size: usize,
) -> Result<std::ops::Range<usize>, MemoryError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(MemoryError::OutOfBounds { offset, len, size }),
    }
}

impl fmt::Debug for SharedMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMemory")
            .field("pages", &self.size_pages())
            .field("maximum_pages", &self.inner.maximum_pages)
            .finish()
    }
}
