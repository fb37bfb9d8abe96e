//! LLM Adapter - 文本生成客户端实现

mod fake_llm_client;
mod gemini_client;
mod prompts;

pub use fake_llm_client::{FakeLlmClient, FakeLlmConfig};
pub use gemini_client::{GeminiClient, GeminiClientConfig};
