//! Fake LLM Client - 确定性的生成客户端
//!
//! 不调用任何外部服务；用于测试和 `llm.provider = "fake"` 的本地运行

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::application::ports::{
    ChapterRequest, GeneratedChapter, GenerationError, GenerationPort, OutlineRequest,
};

/// Fake LLM 配置
#[derive(Debug, Clone)]
pub struct FakeLlmConfig {
    /// 生成的大纲包含的章节数
    pub chapters: u32,
    /// 大纲生成失败
    pub fail_outline: bool,
    /// 指定章节生成失败
    pub fail_on_chapter: Option<u32>,
    /// 模拟生成延迟（毫秒）
    pub latency_ms: u64,
}

impl Default for FakeLlmConfig {
    fn default() -> Self {
        Self {
            chapters: 3,
            fail_outline: false,
            fail_on_chapter: None,
            latency_ms: 0,
        }
    }
}

impl FakeLlmConfig {
    pub fn with_chapters(chapters: u32) -> Self {
        Self {
            chapters,
            ..Default::default()
        }
    }

    pub fn fail_outline(mut self) -> Self {
        self.fail_outline = true;
        self
    }

    pub fn fail_on_chapter(mut self, sequence: u32) -> Self {
        self.fail_on_chapter = Some(sequence);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

#[derive(Default)]
struct CallLog {
    outline_calls: usize,
    chapter_requests: Vec<ChapterRequest>,
}

/// Fake LLM Client
pub struct FakeLlmClient {
    config: Mutex<FakeLlmConfig>,
    calls: Mutex<CallLog>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeLlmClient {
    pub fn new(config: FakeLlmConfig) -> Self {
        tracing::info!(
            chapters = config.chapters,
            latency_ms = config.latency_ms,
            "FakeLlmClient initialized"
        );
        Self {
            config: Mutex::new(config),
            calls: Mutex::new(CallLog::default()),
        }
    }

    /// 修改失败的章节（None 表示不再失败）
    pub fn set_fail_on_chapter(&self, sequence: Option<u32>) {
        lock(&self.config).fail_on_chapter = sequence;
    }

    pub fn outline_calls(&self) -> usize {
        lock(&self.calls).outline_calls
    }

    /// 每次章节调用的序号，包括失败的调用
    pub fn chapter_calls(&self) -> Vec<u32> {
        lock(&self.calls)
            .chapter_requests
            .iter()
            .map(|r| r.sequence)
            .collect()
    }

    pub fn chapter_requests(&self) -> Vec<ChapterRequest> {
        lock(&self.calls).chapter_requests.clone()
    }

    fn snapshot(&self) -> FakeLlmConfig {
        lock(&self.config).clone()
    }

    async fn simulate_latency(&self, latency_ms: u64) {
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
    }
}

#[async_trait]
impl GenerationPort for FakeLlmClient {
    async fn generate_outline(&self, request: OutlineRequest) -> Result<String, GenerationError> {
        let config = self.snapshot();
        lock(&self.calls).outline_calls += 1;
        self.simulate_latency(config.latency_ms).await;

        if config.fail_outline {
            return Err(GenerationError::ServiceError("fake outline failure".to_string()));
        }

        let mut outline = format!("# {}\n", request.title);
        if let Some(notes) = &request.revision_notes {
            outline.push_str(&format!("\n_Revised: {}_\n", notes));
        }
        for n in 1..=config.chapters {
            outline.push_str(&format!(
                "\n## Chapter {}: Part {}\n\nWhat happens in part {} of {}.\n",
                n, n, n, request.title
            ));
        }

        tracing::debug!(title = %request.title, chapters = config.chapters, "Fake outline generated");
        Ok(outline)
    }

    async fn generate_chapter(
        &self,
        request: ChapterRequest,
    ) -> Result<GeneratedChapter, GenerationError> {
        let config = self.snapshot();
        let sequence = request.sequence;
        let title = request.chapter_title.clone();
        let context_len = request.context.len();
        let revision = request.is_revision();
        lock(&self.calls).chapter_requests.push(request);
        self.simulate_latency(config.latency_ms).await;

        if config.fail_on_chapter == Some(sequence) {
            return Err(GenerationError::ServiceError(format!(
                "fake failure on chapter {}",
                sequence
            )));
        }

        tracing::debug!(sequence = sequence, revision = revision, "Fake chapter generated");
        let kind = if revision { "revised" } else { "first" };
        Ok(GeneratedChapter {
            content: format!(
                "Chapter {}: {}\n\nThis {} draft builds on {} earlier chapter(s).",
                sequence, title, kind, context_len
            ),
            summary: format!("Summary of chapter {} ({}).", sequence, title),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_outline;

    #[tokio::test]
    async fn test_outline_is_parseable() {
        let client = FakeLlmClient::new(FakeLlmConfig::with_chapters(4));
        let outline = client
            .generate_outline(OutlineRequest {
                title: "Paper Moons".into(),
                notes: None,
                previous_outline: None,
                revision_notes: None,
            })
            .await
            .unwrap();

        let entries = parse_outline(&outline);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3].title, "Part 4");
        assert_eq!(client.outline_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_chapter_is_recorded() {
        let client = FakeLlmClient::new(FakeLlmConfig::with_chapters(2).fail_on_chapter(1));
        let request = ChapterRequest {
            book_title: "Paper Moons".into(),
            outline: String::new(),
            sequence: 1,
            chapter_title: "Part 1".into(),
            outline_entry: String::new(),
            context: Default::default(),
            book_notes: None,
            previous_chapter_notes: None,
            chapter_notes: None,
            previous_content: None,
        };

        assert!(client.generate_chapter(request.clone()).await.is_err());
        client.set_fail_on_chapter(None);
        let generated = client.generate_chapter(request).await.unwrap();
        assert!(!generated.summary.is_empty());
        assert_eq!(client.chapter_calls(), vec![1, 1]);
    }
}
