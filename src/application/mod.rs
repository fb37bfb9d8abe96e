//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（Repository、Generation、Notifier、Compiler、JobQueue）
//! - pipeline: 大纲/章节阶段与流水线编排器
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    CompileBook, CreateBook, DeleteBook, ImportBooks, ImportRow, ResumeBook, ReviewChapter,
    ReviewFinal, ReviewOutline, RunBook,
    // Handlers
    handlers::{
        BookCreated, CompileBookHandler, CreateBookHandler, DeleteBookHandler,
        ImportBooksHandler, ImportReport, ResumeBookHandler, ResumeResponse, ReviewChapterHandler,
        ReviewFinalHandler, ReviewOutlineHandler, ReviewResponse, RunBookHandler, RunSubmitted,
    },
};

pub use error::ApplicationError;

pub use pipeline::{
    BookLocks, CompileOutcome, PipelineOrchestrator, ResumeOutcome, ReviewOutcome, RunOptions,
    RunOutcome,
};

pub use ports::{
    BookRepositoryPort, ChapterRequest, CompilationError, CompilerPort, DeliveryResult,
    DeliveryStatus, GeneratedChapter, GenerationError, GenerationPort, JobQueuePort, JobState,
    NotificationLogPort, NotificationRecord, NotifierPort, OutlineRequest, PipelineJob,
    QueueError, RepositoryError,
};

pub use queries::{
    GetBook, GetProgress, ListBooks, ListNotifications,
    // Handlers
    handlers::{
        BookResponse, BookSummaryResponse, GetBookHandler, GetProgressHandler, ListBooksHandler,
        ListNotificationsHandler, NotificationResponse, ProgressResponse,
    },
};
