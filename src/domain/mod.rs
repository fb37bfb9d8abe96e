//! Domain Layer - 领域层
//!
//! - Book Context: 书籍、章节、评审状态
//! - 评审闸门、上下文链、编译闸门（纯函数，无 I/O）

pub mod book;
pub mod compilation;
pub mod context;
pub mod events;
pub mod outline_parser;
pub mod review;

pub use compilation::{authorize, CompilationVerdict, DenyReason};
pub use context::{build_context, ContextEntry, ContextPayload};
pub use events::{EventType, NotificationEvent};
pub use outline_parser::{parse_outline, OutlineEntry};
pub use review::{evaluate, evaluate_raw, Decision};
