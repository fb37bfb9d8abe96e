//! Pipeline Orchestrator - 流水线编排
//!
//! 按 ingest -> outline -> chapters -> compile 推进一本书。
//! 可重入：每次调用在当前闸门允许的范围内尽量推进。
//! 书籍输出状态只在这里写入。

use std::sync::Arc;

use serde::Serialize;

use super::chapter_stage::{AdvanceOutcome, ChapterStage};
use super::locks::BookLocks;
use super::outline_stage::{ChapterPlan, OutlineRunOutcome, OutlineStage};
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, CompilerPort, GenerationPort, NotifierPort};
use crate::domain::book::{
    ArtifactLocation, Book, BookId, Chapter, ChapterId, ChapterStatus, OutputStatus, ReviewStatus,
};
use crate::domain::{
    authorize, evaluate, CompilationVerdict, Decision, DenyReason, EventType, NotificationEvent,
};

/// 运行选项
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// 大纲和章节自动给出 no_notes_needed
    pub auto_approve: bool,
}

/// 一次运行停在哪里
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// 大纲已生成，等待评审
    OutlineGenerated,
    /// 大纲评审未通过，书籍暂停
    AwaitingOutlineReview,
    /// 章节已全部生成，但有章节未批准
    AwaitingChapterReview { generated: usize, awaiting: usize },
    Completed { artifacts: Vec<ArtifactLocation> },
    CompilationDenied { reason: DenyReason },
    /// 生成或编译失败，书籍进入 error
    Failed { reason: String },
    /// 书籍处于 paused / error，需要外部清除
    Blocked {
        status: OutputStatus,
        reason: Option<String>,
    },
    AlreadyCompleted,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::OutlineGenerated => "outline_generated",
            RunOutcome::AwaitingOutlineReview => "awaiting_outline_review",
            RunOutcome::AwaitingChapterReview { .. } => "awaiting_chapter_review",
            RunOutcome::Completed { .. } => "completed",
            RunOutcome::CompilationDenied { .. } => "compilation_denied",
            RunOutcome::Failed { .. } => "failed",
            RunOutcome::Blocked { .. } => "blocked",
            RunOutcome::AlreadyCompleted => "already_completed",
        }
    }
}

/// 编译结果；拒绝是正常结果，不是错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompileOutcome {
    Compiled { artifacts: Vec<ArtifactLocation> },
    Denied { reason: DenyReason },
    Failed { reason: String },
}

/// 评审结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewOutcome {
    pub decision: Decision,
    pub status: OutputStatus,
    /// 是否应当重新排队运行
    pub should_run: bool,
}

/// 外部清除结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeOutcome {
    pub status: OutputStatus,
    pub reset_chapters: usize,
}

pub struct PipelineOrchestrator {
    book_repo: Arc<dyn BookRepositoryPort>,
    notifier: Arc<dyn NotifierPort>,
    compiler: Arc<dyn CompilerPort>,
    outline_stage: OutlineStage,
    chapter_stage: ChapterStage,
    locks: Arc<BookLocks>,
}

impl PipelineOrchestrator {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        generator: Arc<dyn GenerationPort>,
        notifier: Arc<dyn NotifierPort>,
        compiler: Arc<dyn CompilerPort>,
        locks: Arc<BookLocks>,
    ) -> Self {
        Self {
            outline_stage: OutlineStage::new(
                book_repo.clone(),
                generator.clone(),
                notifier.clone(),
                locks.clone(),
            ),
            chapter_stage: ChapterStage::new(
                book_repo.clone(),
                generator,
                notifier.clone(),
                locks.clone(),
            ),
            book_repo,
            notifier,
            compiler,
            locks,
        }
    }

    pub fn locks(&self) -> Arc<BookLocks> {
        self.locks.clone()
    }

    // ========================================================================
    // Run
    // ========================================================================

    /// 推进一本书直到遇到闸门、失败或完成
    ///
    /// 同一本书同时只有一个运行；每一步在写锁内重新读取书籍，
    /// 运行期间到达的评审在下一步生效。
    pub async fn run(&self, book_id: BookId, options: RunOptions) -> Result<RunOutcome, ApplicationError> {
        let _claim = self.locks.try_claim_run(book_id)?;

        // 大纲
        let generate_outline = {
            let _guard = self.locks.write(book_id).await;
            let mut book = self.load(book_id).await?;
            if let Some(outcome) = Self::stopped(&book) {
                return Ok(outcome);
            }
            let generate = book.can_generate_outline();
            if generate {
                self.set_status(&mut book, OutputStatus::InProgress, None).await?;
            }
            generate
        };

        if generate_outline {
            match self.outline_stage.run(book_id).await? {
                OutlineRunOutcome::Generated if !options.auto_approve => {
                    return Ok(RunOutcome::OutlineGenerated);
                }
                OutlineRunOutcome::Generated | OutlineRunOutcome::Discarded => {}
                OutlineRunOutcome::Failed(reason) => {
                    let _guard = self.locks.write(book_id).await;
                    let mut book = self.load(book_id).await?;
                    self.fail(&mut book, format!("outline generation failed: {}", reason))
                        .await?;
                    return Ok(RunOutcome::Failed { reason });
                }
            }
        }

        // 大纲闸门
        {
            let _guard = self.locks.write(book_id).await;
            let mut book = self.load(book_id).await?;

            let mut plan = None;
            if options.auto_approve && book.outline_review == ReviewStatus::Pending {
                let (_, accepted) = self
                    .outline_stage
                    .apply_review(&mut book, ReviewStatus::NoNotesNeeded, None)
                    .await?;
                plan = accepted;
            }
            if !book.outline_decision().advances() {
                let reason = format!("outline review is {}", book.outline_review);
                self.pause(&mut book, reason).await?;
                return Ok(RunOutcome::AwaitingOutlineReview);
            }

            let plan = match plan {
                Some(plan) => plan,
                None => self.outline_stage.ensure_chapters(&mut book).await?,
            };
            if plan == ChapterPlan::Unparseable {
                let reason = "outline contains no recognizable chapters".to_string();
                self.fail(&mut book, reason.clone()).await?;
                return Ok(RunOutcome::Failed { reason });
            }

            if let Some(outcome) = Self::stopped(&book) {
                return Ok(outcome);
            }
            self.set_status(&mut book, OutputStatus::InProgress, None).await?;
        }

        // 章节
        let mut generated = 0;
        loop {
            match self.chapter_stage.advance(book_id).await? {
                AdvanceOutcome::Generated { chapter_id, .. } => {
                    generated += 1;
                    if options.auto_approve {
                        let _guard = self.locks.write(book_id).await;
                        let book = self.load(book_id).await?;
                        self.chapter_stage
                            .apply_review(&book, chapter_id, ReviewStatus::NoNotesNeeded, None)
                            .await?;
                    }
                }
                AdvanceOutcome::Failed {
                    sequence, reason, ..
                } => {
                    let _guard = self.locks.write(book_id).await;
                    let mut book = self.load(book_id).await?;
                    self.fail(&mut book, format!("chapter {} failed: {}", sequence, reason))
                        .await?;
                    return Ok(RunOutcome::Failed { reason });
                }
                AdvanceOutcome::Blocked(_) | AdvanceOutcome::NothingPending => break,
            }
        }

        // 编译闸门
        let _guard = self.locks.write(book_id).await;
        let mut book = self.load(book_id).await?;
        if let Some(outcome) = Self::stopped(&book) {
            return Ok(outcome);
        }

        let chapters = self.book_repo.find_chapters(book_id).await?;
        let awaiting = chapters.iter().filter(|c| !c.is_approved()).count();
        if awaiting > 0 {
            self.pause(&mut book, format!("{} chapter(s) awaiting review", awaiting))
                .await?;
            return Ok(RunOutcome::AwaitingChapterReview {
                generated,
                awaiting,
            });
        }

        Ok(match self.compile_book(&mut book, &chapters).await? {
            CompileOutcome::Compiled { artifacts } => RunOutcome::Completed { artifacts },
            CompileOutcome::Denied { reason } => RunOutcome::CompilationDenied { reason },
            CompileOutcome::Failed { reason } => RunOutcome::Failed { reason },
        })
    }

    /// 已完成或被 paused / error 挡住时的运行结果
    fn stopped(book: &Book) -> Option<RunOutcome> {
        match book.output_status {
            OutputStatus::Completed => Some(RunOutcome::AlreadyCompleted),
            OutputStatus::Paused | OutputStatus::Error => {
                tracing::info!(
                    book_id = %book.id,
                    status = %book.output_status,
                    reason = ?book.status_reason,
                    "Book is blocked, stopping run"
                );
                Some(RunOutcome::Blocked {
                    status: book.output_status,
                    reason: book.status_reason.clone(),
                })
            }
            OutputStatus::Pending | OutputStatus::InProgress => None,
        }
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    pub async fn apply_outline_review(
        &self,
        book_id: BookId,
        status: ReviewStatus,
        notes: Option<String>,
    ) -> Result<ReviewOutcome, ApplicationError> {
        let _guard = self.locks.write(book_id).await;
        let mut book = self.load(book_id).await?;
        if book.output_status == OutputStatus::Completed {
            return Err(ApplicationError::invalid_state("book is already completed"));
        }

        let (decision, plan) = self.outline_stage.apply_review(&mut book, status, notes).await?;

        if !decision.advances() {
            if matches!(book.output_status, OutputStatus::Pending | OutputStatus::InProgress) {
                self.pause(&mut book, format!("outline review is {}", status))
                    .await?;
            }
            return Ok(self.review_outcome(&book, decision));
        }

        if plan == Some(ChapterPlan::Unparseable) {
            self.fail(&mut book, "outline contains no recognizable chapters".to_string())
                .await?;
            return Ok(self.review_outcome(&book, decision));
        }

        if book.output_status == OutputStatus::Paused {
            self.set_status(&mut book, OutputStatus::InProgress, None).await?;
        }
        Ok(self.review_outcome(&book, decision))
    }

    pub async fn apply_chapter_review(
        &self,
        book_id: BookId,
        chapter_id: ChapterId,
        status: ReviewStatus,
        notes: Option<String>,
    ) -> Result<ReviewOutcome, ApplicationError> {
        let _guard = self.locks.write(book_id).await;
        let mut book = self.load(book_id).await?;
        if book.output_status == OutputStatus::Completed {
            return Err(ApplicationError::invalid_state("book is already completed"));
        }

        let review = self
            .chapter_stage
            .apply_review(&book, chapter_id, status, notes)
            .await?;

        if review.decision.advances() {
            if book.output_status == OutputStatus::Paused {
                self.set_status(&mut book, OutputStatus::InProgress, None).await?;
            }
        } else if matches!(book.output_status, OutputStatus::Pending | OutputStatus::InProgress) {
            self.pause(
                &mut book,
                format!("chapter {} review is {}", review.sequence, status),
            )
            .await?;
        }

        Ok(self.review_outcome(&book, review.decision))
    }

    /// 终审只记录，不影响编译闸门
    pub async fn apply_final_review(
        &self,
        book_id: BookId,
        status: ReviewStatus,
        notes: Option<String>,
    ) -> Result<Decision, ApplicationError> {
        let _guard = self.locks.write(book_id).await;
        let mut book = self.load(book_id).await?;

        book.apply_final_review(status, notes.filter(|n| !n.trim().is_empty()));
        self.book_repo.save_book(&book).await?;

        let decision = evaluate(Some(status));
        tracing::info!(
            book_id = %book_id,
            review = %status,
            decision = %decision,
            "Final review recorded"
        );
        Ok(decision)
    }

    fn review_outcome(&self, book: &Book, decision: Decision) -> ReviewOutcome {
        ReviewOutcome {
            decision,
            status: book.output_status,
            should_run: decision.advances() && book.output_status == OutputStatus::InProgress,
        }
    }

    // ========================================================================
    // External clear
    // ========================================================================

    /// 清除 paused / error
    ///
    /// 出错和残留 generating 的章节回到 pending；被拒绝且带备注的章节回到 pending 以便修订。
    /// 运行中的书，正在生成的章节保持不动。
    pub async fn resume(&self, book_id: BookId) -> Result<ResumeOutcome, ApplicationError> {
        let _guard = self.locks.write(book_id).await;
        let mut book = self.load(book_id).await?;
        if book.output_status == OutputStatus::Completed {
            return Err(ApplicationError::invalid_state("book is already completed"));
        }

        let running = self.locks.is_running(book_id);
        let mut reset_chapters = 0;
        for mut chapter in self.book_repo.find_chapters(book_id).await? {
            if running && chapter.status == ChapterStatus::Generating {
                continue;
            }
            if chapter.reset_for_retry() {
                self.book_repo.save_chapter(&chapter).await?;
                reset_chapters += 1;
                tracing::info!(
                    book_id = %book_id,
                    chapter_id = %chapter.id,
                    sequence = chapter.sequence,
                    "Chapter reset for retry"
                );
            }
        }

        match book.output_status {
            OutputStatus::Error if book.outline.is_none() => {
                self.set_status(&mut book, OutputStatus::Pending, None).await?;
            }
            OutputStatus::Error | OutputStatus::Paused => {
                self.set_status(&mut book, OutputStatus::InProgress, None).await?;
            }
            _ => {}
        }

        tracing::info!(
            book_id = %book_id,
            status = %book.output_status,
            reset_chapters = reset_chapters,
            running = running,
            "Book resumed"
        );
        Ok(ResumeOutcome {
            status: book.output_status,
            reset_chapters,
        })
    }

    // ========================================================================
    // Compile
    // ========================================================================

    /// 重新判定编译闸门，放行则编译
    pub async fn compile(&self, book_id: BookId) -> Result<CompileOutcome, ApplicationError> {
        let _guard = self.locks.write(book_id).await;
        let mut book = self.load(book_id).await?;
        let chapters = self.book_repo.find_chapters(book_id).await?;
        self.compile_book(&mut book, &chapters).await
    }

    async fn compile_book(
        &self,
        book: &mut Book,
        chapters: &[Chapter],
    ) -> Result<CompileOutcome, ApplicationError> {
        if let CompilationVerdict::Deny(reason) = authorize(book, chapters) {
            tracing::info!(book_id = %book.id, reason = %reason, "Compilation denied");
            return Ok(CompileOutcome::Denied { reason });
        }

        if matches!(book.output_status, OutputStatus::Pending | OutputStatus::Paused) {
            self.set_status(book, OutputStatus::InProgress, None).await?;
        }

        tracing::info!(book_id = %book.id, chapters = chapters.len(), "Compiling book");
        let artifacts = match self.compiler.compile(book, chapters).await {
            Ok(artifacts) if artifacts.is_empty() => {
                Err("compiler produced no artifacts".to_string())
            }
            Ok(artifacts) => Ok(artifacts),
            Err(e) => Err(e.to_string()),
        };

        let artifacts = match artifacts {
            Ok(artifacts) => artifacts,
            Err(reason) => {
                self.notifier
                    .emit(NotificationEvent::new(
                        book.id,
                        EventType::ErrorPause,
                        format!("Compilation of \"{}\" failed: {}", book.title, reason),
                    ))
                    .await;
                self.fail(book, format!("compilation failed: {}", reason)).await?;
                return Ok(CompileOutcome::Failed { reason });
            }
        };

        self.notifier
            .emit(NotificationEvent::new(
                book.id,
                EventType::FinalDraftReady,
                format!("Final draft of \"{}\" is ready", book.title),
            ))
            .await;

        book.complete(artifacts.clone())?;
        self.book_repo.save_book(book).await?;

        tracing::info!(
            book_id = %book.id,
            artifacts = artifacts.len(),
            "Book completed"
        );
        self.notifier
            .emit(NotificationEvent::new(
                book.id,
                EventType::BookCompleted,
                format!("\"{}\" is complete", book.title),
            ))
            .await;

        Ok(CompileOutcome::Compiled { artifacts })
    }

    // ========================================================================
    // Status writes
    // ========================================================================

    async fn load(&self, book_id: BookId) -> Result<Book, ApplicationError> {
        self.book_repo
            .find_book(book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", *book_id.as_uuid()))
    }

    async fn set_status(
        &self,
        book: &mut Book,
        status: OutputStatus,
        reason: Option<String>,
    ) -> Result<(), ApplicationError> {
        if book.output_status == status && book.status_reason == reason {
            return Ok(());
        }
        let from = book.output_status;
        book.transition(status, reason)?;
        self.book_repo.save_book(book).await?;
        tracing::info!(book_id = %book.id, from = %from, to = %status, "Book status changed");
        Ok(())
    }

    async fn pause(&self, book: &mut Book, reason: String) -> Result<(), ApplicationError> {
        tracing::info!(book_id = %book.id, reason = %reason, "Book paused");
        self.set_status(book, OutputStatus::Paused, Some(reason)).await
    }

    /// 生成或编译失败：书籍进入 error，并发出 error_pause
    async fn fail(&self, book: &mut Book, reason: String) -> Result<(), ApplicationError> {
        tracing::error!(book_id = %book.id, reason = %reason, "Book failed");
        self.set_status(book, OutputStatus::Error, Some(reason)).await
    }
}
