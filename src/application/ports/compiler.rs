//! Compiler Port - 书稿编译

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::book::{ArtifactLocation, Book, Chapter};

/// 编译错误
#[derive(Debug, Error)]
pub enum CompilationError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Render error: {0}")]
    RenderError(String),
}

impl From<std::io::Error> for CompilationError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Compiler Port
///
/// 只在编译闸门放行后调用；chapters 已按 sequence 排序且全部已批准。
#[async_trait]
pub trait CompilerPort: Send + Sync {
    async fn compile(
        &self,
        book: &Book,
        chapters: &[Chapter],
    ) -> Result<Vec<ArtifactLocation>, CompilationError>;
}
