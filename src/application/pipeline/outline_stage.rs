//! Outline Stage - 大纲阶段
//!
//! 把一本书从"没有大纲"推进到"大纲已生成，等待或跳过评审"。
//! 不写书籍输出状态；失败以结果返回，由编排器决定状态。

use std::sync::Arc;

use super::locks::BookLocks;
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, GenerationPort, NotifierPort, OutlineRequest};
use crate::domain::book::{Book, BookId, Chapter, ReviewStatus};
use crate::domain::{parse_outline, Decision, EventType, NotificationEvent};

/// 大纲生成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineRunOutcome {
    Generated,
    /// 生成期间大纲已被接受或解析，结果丢弃
    Discarded,
    /// 生成失败，未写入任何大纲
    Failed(String),
}

/// 大纲解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterPlan {
    /// 章节已存在（本次解析或之前已解析）
    Ready(usize),
    /// 大纲中找不到任何章节
    Unparseable,
}

pub struct OutlineStage {
    book_repo: Arc<dyn BookRepositoryPort>,
    generator: Arc<dyn GenerationPort>,
    notifier: Arc<dyn NotifierPort>,
    locks: Arc<BookLocks>,
}

impl OutlineStage {
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

    /// 生成（或按修改备注重新生成）大纲
    ///
    /// 读取请求和写入结果各自在写锁内完成，生成调用期间不持锁。
    pub async fn run(&self, book_id: BookId) -> Result<OutlineRunOutcome, ApplicationError> {
        let (title, request) = {
            let _guard = self.locks.write(book_id).await;
            let book = self.load(book_id).await?;
            self.ensure_can_generate(&book).await?;

            let request = OutlineRequest {
                title: book.title.to_string(),
                notes: book.outline_notes_before.clone(),
                previous_outline: book.outline.clone(),
                revision_notes: book.outline_notes_after.clone(),
            };
            (book.title, request)
        };

        tracing::info!(
            book_id = %book_id,
            title = %title,
            revision = request.is_revision(),
            "Generating outline"
        );

        let result = match self.generator.generate_outline(request).await {
            Ok(text) if text.trim().is_empty() => Err("generator returned an empty outline".to_string()),
            Ok(text) => Ok(text),
            Err(e) => Err(e.to_string()),
        };

        let outline = match result {
            Ok(outline) => outline,
            Err(reason) => {
                tracing::error!(book_id = %book_id, error = %reason, "Outline generation failed");
                self.notifier
                    .emit(NotificationEvent::new(
                        book_id,
                        EventType::ErrorPause,
                        format!("Outline generation failed for \"{}\": {}", title, reason),
                    ))
                    .await;
                return Ok(OutlineRunOutcome::Failed(reason));
            }
        };

        {
            let _guard = self.locks.write(book_id).await;
            let mut book = self.load(book_id).await?;
            match self.ensure_can_generate(&book).await {
                Ok(()) => {}
                Err(ApplicationError::SequenceViolation(_)) => {
                    tracing::warn!(book_id = %book_id, "Outline changed during generation, result discarded");
                    return Ok(OutlineRunOutcome::Discarded);
                }
                Err(e) => return Err(e),
            }
            book.set_outline(outline);
            self.book_repo.save_book(&book).await?;
        }

        tracing::info!(book_id = %book_id, "Outline ready for review");
        self.notifier
            .emit(NotificationEvent::new(
                book_id,
                EventType::OutlineReady,
                format!("Outline for \"{}\" is ready for review", title),
            ))
            .await;
        Ok(OutlineRunOutcome::Generated)
    }

    async fn ensure_can_generate(&self, book: &Book) -> Result<(), ApplicationError> {
        if !book.can_generate_outline() {
            return Err(ApplicationError::sequence(
                "outline exists and is not awaiting regeneration",
            ));
        }
        if self.book_repo.count_chapters(book.id).await? > 0 {
            return Err(ApplicationError::sequence(
                "chapters already parsed from the accepted outline",
            ));
        }
        Ok(())
    }

    async fn load(&self, book_id: BookId) -> Result<Book, ApplicationError> {
        self.book_repo
            .find_book(book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", *book_id.as_uuid()))
    }

    /// 应用外部评审决定
    ///
    /// 调用方持有该书写锁。Hold 时书籍保持不变且不发事件；通过时解析章节（只解析一次）。
    pub async fn apply_review(
        &self,
        book: &mut Book,
        status: ReviewStatus,
        notes: Option<String>,
    ) -> Result<(Decision, Option<ChapterPlan>), ApplicationError> {
        if self.book_repo.count_chapters(book.id).await? > 0 {
            return Err(ApplicationError::sequence(
                "outline was already accepted and parsed into chapters",
            ));
        }

        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            book.outline_notes_after = Some(notes);
        }
        let decision = book.apply_outline_review(status)?;
        self.book_repo.save_book(book).await?;

        tracing::info!(
            book_id = %book.id,
            review = %status,
            decision = %decision,
            "Outline review applied"
        );

        if !decision.advances() {
            return Ok((decision, None));
        }

        let plan = self.ensure_chapters(book).await?;
        Ok((decision, Some(plan)))
    }

    /// 把已接受的大纲解析为章节
    ///
    /// 调用方持有该书写锁。已有章节时不再解析，只补齐缺失的章节数。
    pub async fn ensure_chapters(&self, book: &mut Book) -> Result<ChapterPlan, ApplicationError> {
        let existing = self.book_repo.count_chapters(book.id).await?;
        if existing > 0 {
            if book.declared_chapter_count.is_none() {
                tracing::warn!(
                    book_id = %book.id,
                    chapters = existing,
                    "Chapter count missing, backfilling"
                );
                book.set_declared_chapter_count(existing as u32);
                self.book_repo.save_book(book).await?;
            }
            return Ok(ChapterPlan::Ready(existing));
        }

        let outline = book
            .outline
            .as_deref()
            .ok_or_else(|| ApplicationError::sequence("outline must exist before parsing"))?;

        let entries = parse_outline(outline);
        if entries.is_empty() {
            tracing::warn!(book_id = %book.id, "Outline contains no chapters");
            self.notifier
                .emit(NotificationEvent::new(
                    book.id,
                    EventType::ErrorPause,
                    format!("Outline for \"{}\" contains no recognizable chapters", book.title),
                ))
                .await;
            return Ok(ChapterPlan::Unparseable);
        }

        let chapters: Vec<Chapter> = entries
            .into_iter()
            .map(|e| Chapter::new(book.id, e.sequence, e.title, e.entry))
            .collect();
        let count = chapters.len();

        self.book_repo.insert_chapters(&chapters).await?;
        book.set_declared_chapter_count(count as u32);
        self.book_repo.save_book(book).await?;

        tracing::info!(book_id = %book.id, chapters = count, "Outline parsed into chapters");
        Ok(ChapterPlan::Ready(count))
    }
}
