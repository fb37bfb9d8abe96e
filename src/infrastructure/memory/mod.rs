//! Memory Layer - In-Memory State Management
//!
//! 流水线任务队列，以及测试/fake 模式使用的内存仓库

mod book_repository;
mod job_queue;

pub use book_repository::{InMemoryBookRepository, InMemoryNotificationLog};
pub use job_queue::InMemoryJobQueue;
