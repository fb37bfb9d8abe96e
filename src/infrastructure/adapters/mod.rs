//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod compiler;
pub mod llm;
pub mod notifier;

pub use compiler::*;
pub use llm::*;
pub use notifier::*;
