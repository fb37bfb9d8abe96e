//! Context Accumulator - 章节上下文链
//!
//! 只把之前章节的摘要（不是全文）传给下一章的生成请求，
//! 使上下文大小随章节数线性增长。

use serde::{Deserialize, Serialize};

use super::book::Chapter;

/// 缺失章节的占位标记
pub const GAP_MARKER: &str = "[summary unavailable]";

/// 上下文条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextEntry {
    Summary {
        sequence: u32,
        title: String,
        summary: String,
    },
    /// 跳过或出错的章节，保留位置而不是静默省略
    Gap { sequence: u32 },
}

impl ContextEntry {
    pub fn sequence(&self) -> u32 {
        match self {
            ContextEntry::Summary { sequence, .. } | ContextEntry::Gap { sequence } => *sequence,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, ContextEntry::Gap { .. })
    }
}

/// 有序上下文载荷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPayload {
    pub entries: Vec<ContextEntry>,
}

impl ContextPayload {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// (sequence, summary) 视图，占位条目的摘要为 None
    pub fn summaries(&self) -> Vec<(u32, Option<&str>)> {
        self.entries
            .iter()
            .map(|e| match e {
                ContextEntry::Summary { sequence, summary, .. } => (*sequence, Some(summary.as_str())),
                ContextEntry::Gap { sequence } => (*sequence, None),
            })
            .collect()
    }

    /// 渲染为提示词文本
    ///
    /// 每条为 "Chapter N: Title\nsummary"，条目之间空一行。
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| match e {
                ContextEntry::Summary {
                    sequence,
                    title,
                    summary,
                } => format!("Chapter {}: {}\n{}", sequence, title, summary),
                ContextEntry::Gap { sequence } => format!("Chapter {}: {}", sequence, GAP_MARKER),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// 构建 sequence < up_to_sequence 的章节上下文
///
/// 按 sequence 升序；状态未达到 generated 或摘要为空的位置用 Gap 占位。
/// 幂等：章节状态不变时两次调用结果相同。
pub fn build_context(chapters: &[Chapter], up_to_sequence: u32) -> ContextPayload {
    let entries = (1..up_to_sequence)
        .map(|sequence| {
            let summary = chapters
                .iter()
                .find(|c| c.sequence == sequence)
                .filter(|c| c.status.is_generated())
                .and_then(|c| {
                    c.summary
                        .as_deref()
                        .filter(|s| !s.trim().is_empty())
                        .map(|s| (c.title.clone(), s.to_string()))
                });

            match summary {
                Some((title, summary)) => ContextEntry::Summary {
                    sequence,
                    title,
                    summary,
                },
                None => ContextEntry::Gap { sequence },
            }
        })
        .collect();

    ContextPayload { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::book::{BookId, ChapterStatus};

    fn chapter(book_id: BookId, sequence: u32, status: ChapterStatus) -> Chapter {
        let mut ch = Chapter::new(book_id, sequence, format!("Part {}", sequence), "");
        if status.is_generated() {
            ch.content = Some(format!("content {}", sequence));
            ch.summary = Some(format!("summary {}", sequence));
        }
        ch.status = status;
        ch
    }

    #[test]
    fn test_first_chapter_has_empty_context() {
        let book_id = BookId::new();
        let chapters = vec![chapter(book_id, 1, ChapterStatus::Pending)];
        assert!(build_context(&chapters, 1).is_empty());
        assert!(build_context(&[], 1).is_empty());
        assert_eq!(build_context(&[], 1).render(), "");
    }

    #[test]
    fn test_only_generated_chapters_contribute_summaries() {
        let book_id = BookId::new();
        let chapters = vec![
            chapter(book_id, 3, ChapterStatus::Approved),
            chapter(book_id, 1, ChapterStatus::Generated),
            chapter(book_id, 2, ChapterStatus::Error),
            chapter(book_id, 4, ChapterStatus::Pending),
            chapter(book_id, 5, ChapterStatus::Reviewed),
        ];

        let payload = build_context(&chapters, 6);
        let sequences: Vec<u32> = payload.entries.iter().map(|e| e.sequence()).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);

        let summaries = payload.summaries();
        assert_eq!(summaries[0], (1, Some("summary 1")));
        assert_eq!(summaries[1], (2, None));
        assert_eq!(summaries[2], (3, Some("summary 3")));
        assert_eq!(summaries[3], (4, None));
        assert_eq!(summaries[4], (5, Some("summary 5")));
    }

    #[test]
    fn test_render_format_and_idempotence() {
        let book_id = BookId::new();
        let chapters = vec![
            chapter(book_id, 1, ChapterStatus::Approved),
            chapter(book_id, 2, ChapterStatus::Error),
        ];

        let first = build_context(&chapters, 3);
        let second = build_context(&chapters, 3);
        assert_eq!(first, second);
        assert_eq!(
            first.render(),
            format!("Chapter 1: Part 1\nsummary 1\n\nChapter 2: {}", GAP_MARKER)
        );
    }

    #[test]
    fn test_chapters_at_or_after_cutoff_excluded() {
        let book_id = BookId::new();
        let chapters = vec![
            chapter(book_id, 1, ChapterStatus::Approved),
            chapter(book_id, 2, ChapterStatus::Approved),
        ];
        let payload = build_context(&chapters, 2);
        assert_eq!(payload.len(), 1);
        assert!(!payload.entries[0].is_gap());
    }
}
