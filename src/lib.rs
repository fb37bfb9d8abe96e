//! Bookforge - AI 辅助的书籍生成流水线
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Book Context: 书籍聚合、章节实体、评审状态
//! - GateEvaluator / ContextAccumulator / CompilationGate: 纯规则
//!
//! 应用层 (application/):
//! - Ports: Repository, Generation, Notifier, Compiler, JobQueue
//! - Pipeline: OutlineStage, ChapterStage, PipelineOrchestrator
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Persistence: SQLite；Memory: 测试与任务队列
//! - Adapters: LLM Client, Manuscript Compiler, Webhook Notifier
//! - Worker: PipelineWorker 后台运行
//! - Events: WebSocket 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
