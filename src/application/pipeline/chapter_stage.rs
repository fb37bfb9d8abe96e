//! Chapter Stage - 章节阶段
//!
//! 按顺序逐章生成：第 n 章只有在第 n-1 章至少为 generated 时才能开始。
//! 同一本书从不并行生成；生成调用期间不持有书籍写锁。

use std::sync::Arc;

use super::locks::BookLocks;
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, ChapterRequest, GenerationPort, NotifierPort};
use crate::domain::book::{
    Book, BookId, Chapter, ChapterId, ChapterStatus, OutputStatus, ReviewStatus,
};
use crate::domain::{build_context, Decision, EventType, NotificationEvent};

/// 单次推进的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Generated { chapter_id: ChapterId, sequence: u32 },
    /// 生成失败，章节已置为 error，本书停止推进
    Failed {
        chapter_id: ChapterId,
        sequence: u32,
        reason: String,
    },
    /// 没有待生成的章节
    NothingPending,
    /// 书籍处于 paused / error，未发起生成
    Blocked(OutputStatus),
}

/// 章节评审结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterReview {
    pub chapter_id: ChapterId,
    pub sequence: u32,
    pub decision: Decision,
}

/// 写锁内选出的下一章
enum Claim {
    Claimed {
        book: Book,
        chapter: Chapter,
        request: Box<ChapterRequest>,
    },
    Idle(AdvanceOutcome),
}

pub struct ChapterStage {
    book_repo: Arc<dyn BookRepositoryPort>,
    generator: Arc<dyn GenerationPort>,
    notifier: Arc<dyn NotifierPort>,
    locks: Arc<BookLocks>,
}

impl ChapterStage {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        generator: Arc<dyn GenerationPort>,
        notifier: Arc<dyn NotifierPort>,
        locks: Arc<BookLocks>,
    ) -> Self {
        Self {
            book_repo,
            generator,
            notifier,
            locks,
        }
    }

    /// 生成下一个待生成的章节
    ///
    /// 选章并置为 generating、保存结果这两步各自在写锁内完成。
    pub async fn advance(&self, book_id: BookId) -> Result<AdvanceOutcome, ApplicationError> {
        let (book, claimed, request) = match self.claim_next(book_id).await? {
            Claim::Claimed {
                book,
                chapter,
                request,
            } => (book, chapter, request),
            Claim::Idle(outcome) => return Ok(outcome),
        };

        tracing::info!(
            book_id = %book_id,
            chapter_id = %claimed.id,
            sequence = claimed.sequence,
            context_entries = request.context.len(),
            revision = request.is_revision(),
            "Generating chapter"
        );

        let result = match self.generator.generate_chapter(*request).await {
            Ok(generated) if generated.content.trim().is_empty() => {
                Err("generator returned empty chapter content".to_string())
            }
            Ok(generated) => Ok(generated),
            Err(e) => Err(e.to_string()),
        };

        let guard = self.locks.write(book_id).await;
        // 生成期间书籍可能已被删除
        let mut chapter = self
            .book_repo
            .find_chapter(claimed.id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", *claimed.id.as_uuid()))?;

        match result {
            Ok(generated) => {
                chapter.mark_generated(generated.content, generated.summary)?;
                self.book_repo.save_chapter(&chapter).await?;
                drop(guard);

                tracing::info!(
                    book_id = %book_id,
                    chapter_id = %chapter.id,
                    sequence = chapter.sequence,
                    "Chapter generated"
                );
                self.notifier
                    .emit(NotificationEvent::for_chapter(
                        book_id,
                        chapter.id,
                        EventType::ChapterReady,
                        format!(
                            "Chapter {} \"{}\" of \"{}\" is ready for review",
                            chapter.sequence, chapter.title, book.title
                        ),
                    ))
                    .await;

                Ok(AdvanceOutcome::Generated {
                    chapter_id: chapter.id,
                    sequence: chapter.sequence,
                })
            }
            Err(reason) => {
                chapter.mark_error(reason.clone())?;
                self.book_repo.save_chapter(&chapter).await?;
                drop(guard);

                tracing::error!(
                    book_id = %book_id,
                    chapter_id = %chapter.id,
                    sequence = chapter.sequence,
                    error = %reason,
                    "Chapter generation failed"
                );
                self.notifier
                    .emit(NotificationEvent::for_chapter(
                        book_id,
                        chapter.id,
                        EventType::ErrorPause,
                        format!(
                            "Chapter {} of \"{}\" failed: {}",
                            chapter.sequence, book.title, reason
                        ),
                    ))
                    .await;

                Ok(AdvanceOutcome::Failed {
                    chapter_id: chapter.id,
                    sequence: chapter.sequence,
                    reason,
                })
            }
        }
    }

    async fn claim_next(&self, book_id: BookId) -> Result<Claim, ApplicationError> {
        let _guard = self.locks.write(book_id).await;

        let book = self
            .book_repo
            .find_book(book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", *book_id.as_uuid()))?;
        if book.output_status.blocks_generation() {
            return Ok(Claim::Idle(AdvanceOutcome::Blocked(book.output_status)));
        }

        let chapters = self.book_repo.find_chapters(book_id).await?;
        let Some(next) = chapters
            .iter()
            .filter(|c| c.status == ChapterStatus::Pending)
            .min_by_key(|c| c.sequence)
        else {
            return Ok(Claim::Idle(AdvanceOutcome::NothingPending));
        };

        let previous = if next.sequence > 1 {
            let previous = chapters
                .iter()
                .find(|c| c.sequence == next.sequence - 1)
                .filter(|c| c.status.is_generated())
                .ok_or_else(|| {
                    ApplicationError::sequence(format!(
                        "chapter {} cannot start before chapter {} is generated",
                        next.sequence,
                        next.sequence - 1
                    ))
                })?;
            Some(previous)
        } else {
            None
        };

        let request = ChapterRequest {
            book_title: book.title.to_string(),
            outline: book.outline.clone().unwrap_or_default(),
            sequence: next.sequence,
            chapter_title: next.title.clone(),
            outline_entry: next.outline_entry.clone(),
            context: build_context(&chapters, next.sequence),
            book_notes: book.generation_notes(),
            previous_chapter_notes: previous
                .filter(|p| p.review == ReviewStatus::Yes)
                .and_then(|p| p.notes.clone()),
            chapter_notes: next.notes.clone().filter(|_| next.has_notes()),
            previous_content: next.revision_source().map(str::to_string),
        };

        let mut chapter = next.clone();
        chapter.start_generation()?;
        self.book_repo.save_chapter(&chapter).await?;

        Ok(Claim::Claimed {
            book,
            chapter,
            request: Box::new(request),
        })
    }

    /// 应用外部评审决定
    ///
    /// 调用方持有该书写锁。批准第 n 章要求第 n-1 章已批准；Hold 时发出 waiting_on_notes。
    pub async fn apply_review(
        &self,
        book: &Book,
        chapter_id: ChapterId,
        status: ReviewStatus,
        notes: Option<String>,
    ) -> Result<ChapterReview, ApplicationError> {
        let mut chapter = self
            .book_repo
            .find_chapter(chapter_id)
            .await?
            .filter(|c| c.book_id == book.id)
            .ok_or_else(|| ApplicationError::not_found("Chapter", *chapter_id.as_uuid()))?;

        if crate::domain::evaluate(Some(status)).advances() && chapter.sequence > 1 {
            self.ensure_predecessor_approved(&chapter).await?;
        }

        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            chapter.notes = Some(notes);
        }
        let decision = chapter.apply_review(status)?;
        self.book_repo.save_chapter(&chapter).await?;

        tracing::info!(
            book_id = %book.id,
            chapter_id = %chapter.id,
            sequence = chapter.sequence,
            review = %status,
            decision = %decision,
            "Chapter review applied"
        );

        if decision == Decision::Hold {
            self.notifier
                .emit(NotificationEvent::for_chapter(
                    book.id,
                    chapter.id,
                    EventType::WaitingOnNotes,
                    format!(
                        "Chapter {} of \"{}\" is waiting on review notes",
                        chapter.sequence, book.title
                    ),
                ))
                .await;
        }

        Ok(ChapterReview {
            chapter_id: chapter.id,
            sequence: chapter.sequence,
            decision,
        })
    }

    async fn ensure_predecessor_approved(&self, chapter: &Chapter) -> Result<(), ApplicationError> {
        let chapters = self.book_repo.find_chapters(chapter.book_id).await?;
        let approved = chapters
            .iter()
            .find(|c| c.sequence == chapter.sequence - 1)
            .map_or(false, |c| c.is_approved());
        if !approved {
            return Err(ApplicationError::sequence(format!(
                "chapter {} cannot be approved before chapter {}",
                chapter.sequence,
                chapter.sequence - 1
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::book::Title;
    use crate::infrastructure::adapters::llm::{FakeLlmClient, FakeLlmConfig};
    use crate::infrastructure::events::EventPublisher;
    use crate::infrastructure::memory::InMemoryBookRepository;

    struct Fixture {
        repo: Arc<InMemoryBookRepository>,
        llm: Arc<FakeLlmClient>,
        stage: ChapterStage,
        book_id: BookId,
    }

    fn chapter_in(book_id: BookId, sequence: u32, status: ChapterStatus) -> Chapter {
        let mut ch = Chapter::new(book_id, sequence, format!("Part {}", sequence), "");
        if status.is_generated() {
            ch.content = Some(format!("content {}", sequence));
            ch.summary = Some(format!("summary {}", sequence));
        }
        ch.status = status;
        ch
    }

    async fn fixture_with(config: FakeLlmConfig, chapters: &[(u32, ChapterStatus)]) -> Fixture {
        let repo = Arc::new(InMemoryBookRepository::new());
        let llm = Arc::new(FakeLlmClient::new(config));
        let stage = ChapterStage::new(
            repo.clone(),
            llm.clone(),
            Arc::new(EventPublisher::new()),
            Arc::new(BookLocks::new()),
        );

        let mut book = Book::new(Title::new("Lantern Years").unwrap(), None);
        book.set_outline("## Chapter 1: One\n## Chapter 2: Two\n## Chapter 3: Three".into());
        book.apply_outline_review(ReviewStatus::Yes).unwrap();
        book.transition(OutputStatus::InProgress, None).unwrap();
        repo.save_book(&book).await.unwrap();

        let rows: Vec<Chapter> = chapters
            .iter()
            .map(|(sequence, status)| chapter_in(book.id, *sequence, *status))
            .collect();
        repo.insert_chapters(&rows).await.unwrap();

        Fixture {
            repo,
            llm,
            stage,
            book_id: book.id,
        }
    }

    async fn fixture(chapters: &[(u32, ChapterStatus)]) -> Fixture {
        fixture_with(FakeLlmConfig::with_chapters(3), chapters).await
    }

    impl Fixture {
        async fn statuses(&self) -> Vec<ChapterStatus> {
            self.repo
                .find_chapters(self.book_id)
                .await
                .unwrap()
                .iter()
                .map(|c| c.status)
                .collect()
        }
    }

    #[tokio::test]
    async fn test_gapped_books_never_reach_the_generator() {
        use ChapterStatus::*;
        let shapes: &[&[(u32, ChapterStatus)]] = &[
            &[(1, Error), (2, Pending)],
            &[(1, Generating), (2, Pending)],
            &[(2, Pending), (3, Pending)],
            &[(1, Approved), (2, Error), (3, Pending)],
        ];

        for shape in shapes {
            let f = fixture(shape).await;
            let before = f.statuses().await;

            let err = f.stage.advance(f.book_id).await.unwrap_err();
            assert!(
                matches!(err, ApplicationError::SequenceViolation(_)),
                "shape {:?} gave {:?}",
                shape,
                err
            );
            assert!(f.llm.chapter_calls().is_empty());
            assert_eq!(f.statuses().await, before);
        }
    }

    #[tokio::test]
    async fn test_generates_lowest_pending_with_prior_summaries() {
        use ChapterStatus::*;
        let f = fixture(&[(1, Approved), (2, Generated), (3, Pending)]).await;

        let outcome = f.stage.advance(f.book_id).await.unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Generated { sequence: 3, .. }));

        let requests = f.llm.chapter_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].context.len(), 2);
        assert!(requests[0].previous_content.is_none());
        assert_eq!(f.statuses().await, vec![Approved, Generated, Generated]);
    }

    #[tokio::test]
    async fn test_nothing_pending_is_a_no_op() {
        use ChapterStatus::*;
        let f = fixture(&[(1, Approved), (2, Generated)]).await;

        assert_eq!(
            f.stage.advance(f.book_id).await.unwrap(),
            AdvanceOutcome::NothingPending
        );
        assert!(f.llm.chapter_calls().is_empty());
    }

    #[tokio::test]
    async fn test_paused_book_is_not_advanced() {
        let f = fixture(&[(1, ChapterStatus::Pending)]).await;
        let mut book = f.repo.find_book(f.book_id).await.unwrap().unwrap();
        book.transition(OutputStatus::Paused, Some("held".into())).unwrap();
        f.repo.save_book(&book).await.unwrap();

        assert_eq!(
            f.stage.advance(f.book_id).await.unwrap(),
            AdvanceOutcome::Blocked(OutputStatus::Paused)
        );
        assert!(f.llm.chapter_calls().is_empty());
        assert_eq!(f.statuses().await, vec![ChapterStatus::Pending]);
    }

    #[tokio::test]
    async fn test_failure_halts_following_chapters() {
        use ChapterStatus::*;
        let f = fixture_with(
            FakeLlmConfig::with_chapters(2).fail_on_chapter(1),
            &[(1, Pending), (2, Pending)],
        )
        .await;

        let outcome = f.stage.advance(f.book_id).await.unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Failed { sequence: 1, .. }));
        assert_eq!(f.statuses().await, vec![Error, Pending]);

        let err = f.stage.advance(f.book_id).await.unwrap_err();
        assert!(matches!(err, ApplicationError::SequenceViolation(_)));
        assert_eq!(f.llm.chapter_calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_rejected_chapter_is_revised_and_notes_consumed() {
        let f = fixture(&[(1, ChapterStatus::Pending)]).await;
        let mut chapter = f.repo.find_chapters(f.book_id).await.unwrap().remove(0);
        chapter.content = Some("old draft".into());
        chapter.notes = Some("more dialogue".into());
        f.repo.save_chapter(&chapter).await.unwrap();

        f.stage.advance(f.book_id).await.unwrap();

        let request = f.llm.chapter_requests().remove(0);
        assert_eq!(request.previous_content.as_deref(), Some("old draft"));
        assert_eq!(request.chapter_notes.as_deref(), Some("more dialogue"));

        let stored = f.repo.find_chapter(chapter.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ChapterStatus::Generated);
        assert!(stored.notes.is_none());
        assert!(stored.content.unwrap().contains("revised"));
    }
}
