//! Book Locks - 按书互斥
//!
//! 两种占用：
//! - 写锁：读取-修改-保存一本书或其章节时短暂持有，其他写入排队等待
//! - 运行占用：同一本书同一时间只有一个编排器运行，第二个运行得到 `Busy`
//!
//! 生成调用期间不持有写锁，评审、恢复、编译不会被长时间的生成阻塞。

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::application::error::ApplicationError;
use crate::domain::book::BookId;

/// 持有期间该书的写入被独占
pub type BookGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct BookLocks {
    writes: DashMap<BookId, Arc<Mutex<()>>>,
    runs: DashSet<BookId>,
}

impl BookLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取书籍写锁，被持有时等待
    pub async fn write(&self, book_id: BookId) -> BookGuard {
        let lock = self
            .writes
            .entry(book_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// 占用书籍的运行权，已有运行时返回 `Busy`
    pub fn try_claim_run(self: &Arc<Self>, book_id: BookId) -> Result<RunClaim, ApplicationError> {
        if !self.runs.insert(book_id) {
            return Err(ApplicationError::Busy(format!(
                "book {} is being processed",
                book_id
            )));
        }
        Ok(RunClaim {
            locks: self.clone(),
            book_id,
        })
    }

    pub fn is_running(&self, book_id: BookId) -> bool {
        self.runs.contains(&book_id)
    }

    /// 删除书籍后释放条目
    pub fn remove(&self, book_id: BookId) {
        self.writes.remove(&book_id);
    }
}

/// 运行占用，drop 时释放
pub struct RunClaim {
    locks: Arc<BookLocks>,
    book_id: BookId,
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        self.locks.runs.remove(&self.book_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_second_run_is_busy() {
        let locks = Arc::new(BookLocks::new());
        let book_id = BookId::new();

        let claim = locks.try_claim_run(book_id).unwrap();
        assert!(locks.is_running(book_id));
        assert!(matches!(
            locks.try_claim_run(book_id),
            Err(ApplicationError::Busy(_))
        ));

        // 其他书不受影响
        assert!(locks.try_claim_run(BookId::new()).is_ok());

        drop(claim);
        assert!(!locks.is_running(book_id));
        assert!(locks.try_claim_run(book_id).is_ok());
    }

    #[tokio::test]
    async fn test_run_claim_does_not_block_writes() {
        let locks = Arc::new(BookLocks::new());
        let book_id = BookId::new();

        let _claim = locks.try_claim_run(book_id).unwrap();
        let guard = tokio::time::timeout(Duration::from_millis(100), locks.write(book_id)).await;
        assert!(guard.is_ok());
    }

    #[tokio::test]
    async fn test_writes_wait_for_each_other() {
        let locks = Arc::new(BookLocks::new());
        let book_id = BookId::new();

        let first = locks.write(book_id).await;
        let waiting = tokio::time::timeout(Duration::from_millis(50), locks.write(book_id)).await;
        assert!(waiting.is_err());

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(100), locks.write(book_id)).await;
        assert!(second.is_ok());
    }
}
