//! SQLite Persistence - SQLite 数据库持久化实现

mod book_repo;
mod database;
mod notification_repo;

pub use book_repo::*;
pub use database::*;
pub use notification_repo::*;
