//! Worker Layer - Background Task Processing
//!
//! 实现 PipelineWorker，在后台推进书籍流水线

mod pipeline_worker;

pub use pipeline_worker::{PipelineWorker, PipelineWorkerConfig};
