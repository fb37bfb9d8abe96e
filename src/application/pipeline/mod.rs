//! Pipeline - 生成/评审状态机
//!
//! - OutlineStage: 大纲生成与评审
//! - ChapterStage: 顺序章节生成与评审
//! - PipelineOrchestrator: 组合各阶段，唯一写入书籍输出状态
//! - BookLocks: 按书互斥

mod chapter_stage;
mod locks;
mod orchestrator;
mod outline_stage;

pub use chapter_stage::{AdvanceOutcome, ChapterReview, ChapterStage};
pub use locks::{BookGuard, BookLocks, RunClaim};
pub use orchestrator::{
    CompileOutcome, PipelineOrchestrator, ResumeOutcome, ReviewOutcome, RunOptions, RunOutcome,
};
pub use outline_stage::{ChapterPlan, OutlineRunOutcome, OutlineStage};
