//! Book HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{
    BookCreated, BookResponse, BookSummaryResponse, CompileBook, CompileOutcome, CreateBook,
    DeleteBook, GetBook, GetProgress, ImportBooks, ImportReport, ImportRow, ListBooks,
    ListNotifications, NotificationResponse, ProgressResponse, ResumeBook, ResumeResponse,
    RunBook, RunSubmitted,
};
use crate::infrastructure::http::dto::{
    ApiResponse, BookIdRequest, CreateBookRequest, Empty, ImportBooksRequest, RunBookRequest,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 创建书籍
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookRequest>,
) -> Result<Json<ApiResponse<BookCreated>>, ApiError> {
    let created = state
        .create_book_handler
        .handle(CreateBook {
            title: req.title,
            notes: req.notes,
        })
        .await?;
    Ok(Json(ApiResponse::success(created)))
}

/// 批量导入，已存在的标题跳过
pub async fn import_books(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportBooksRequest>,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let rows = req
        .rows
        .into_iter()
        .map(|row| ImportRow {
            title: row.title,
            notes: row.notes,
        })
        .collect();

    let report = state
        .import_books_handler
        .handle(ImportBooks { rows })
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookIdRequest>,
) -> Result<Json<ApiResponse<BookResponse>>, ApiError> {
    let book = state
        .get_book_handler
        .handle(GetBook {
            book_id: req.book_id(),
        })
        .await?;
    Ok(Json(ApiResponse::success(book)))
}

pub async fn list_books(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<BookSummaryResponse>>>, ApiError> {
    let books = state.list_books_handler.handle(ListBooks).await?;
    Ok(Json(ApiResponse::success(books)))
}

/// 删除书籍，成功后广播 BookDeleted
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookIdRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    let book_id = req.book_id();
    state
        .delete_book_handler
        .handle(DeleteBook { book_id })
        .await?;
    state.event_publisher.publish_book_deleted(book_id);
    Ok(Json(ApiResponse::ok()))
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookIdRequest>,
) -> Result<Json<ApiResponse<ProgressResponse>>, ApiError> {
    let progress = state
        .get_progress_handler
        .handle(GetProgress {
            book_id: req.book_id(),
        })
        .await?;
    Ok(Json(ApiResponse::success(progress)))
}

/// 提交后台运行，立即返回任务 ID；进度通过 /ws/events 推送
pub async fn run_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunBookRequest>,
) -> Result<Json<ApiResponse<RunSubmitted>>, ApiError> {
    let submitted = state
        .run_book_handler
        .handle(RunBook {
            book_id: req.book_id(),
            auto_approve: req.auto_approve,
        })
        .await?;
    Ok(Json(ApiResponse::success(submitted)))
}

pub async fn resume_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunBookRequest>,
) -> Result<Json<ApiResponse<ResumeResponse>>, ApiError> {
    let resumed = state
        .resume_book_handler
        .handle(ResumeBook {
            book_id: req.book_id(),
            auto_approve: req.auto_approve,
        })
        .await?;
    Ok(Json(ApiResponse::success(resumed)))
}

/// 编译；拒绝以 `outcome = denied` 正常返回
pub async fn compile_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookIdRequest>,
) -> Result<Json<ApiResponse<CompileOutcome>>, ApiError> {
    let outcome = state
        .compile_book_handler
        .handle(CompileBook {
            book_id: req.book_id(),
        })
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookIdRequest>,
) -> Result<Json<ApiResponse<Vec<NotificationResponse>>>, ApiError> {
    let records = state
        .list_notifications_handler
        .handle(ListNotifications {
            book_id: req.book_id(),
        })
        .await?;
    Ok(Json(ApiResponse::success(records)))
}
