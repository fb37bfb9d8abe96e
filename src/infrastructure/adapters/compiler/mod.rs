//! Compiler Adapter - 书稿输出

mod manuscript_compiler;

pub use manuscript_compiler::{CompilerConfig, ManuscriptCompiler, ManuscriptFormat};
