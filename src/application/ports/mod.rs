//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod compiler;
mod generation;
mod job_queue;
mod notifier;
mod repositories;

pub use compiler::{CompilationError, CompilerPort};
pub use generation::{
    ChapterRequest, GeneratedChapter, GenerationError, GenerationPort, OutlineRequest,
};
pub use job_queue::{JobQueuePort, JobState, PipelineJob, QueueError};
pub use notifier::{
    DeliveryResult, DeliveryStatus, NotificationLogPort, NotificationRecord, NotifierPort,
};
pub use repositories::{BookRepositoryPort, RepositoryError};
