//! Review HTTP Handlers
//!
//! `status` 原样交给应用层解析，取值域外的值返回 errno 400。

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::application::{ReviewChapter, ReviewFinal, ReviewOutline, ReviewResponse};
use crate::domain::book::BookId;
use crate::domain::Decision;
use crate::infrastructure::http::dto::{ApiResponse, BookReviewRequest, ChapterReviewRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 终审响应
#[derive(Debug, Serialize)]
pub struct FinalReviewResponse {
    pub book_id: BookId,
    pub decision: Decision,
}

pub async fn review_outline(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    let response = state
        .review_outline_handler
        .handle(ReviewOutline {
            book_id: req.book_id(),
            status: req.status,
            notes: req.notes,
        })
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn review_chapter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChapterReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    let response = state
        .review_chapter_handler
        .handle(ReviewChapter {
            book_id: req.book_id(),
            chapter_id: req.chapter_id(),
            status: req.status,
            notes: req.notes,
        })
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn review_final(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookReviewRequest>,
) -> Result<Json<ApiResponse<FinalReviewResponse>>, ApiError> {
    let book_id = req.book_id();
    let decision = state
        .review_final_handler
        .handle(ReviewFinal {
            book_id,
            status: req.status,
            notes: req.notes,
        })
        .await?;
    Ok(Json(ApiResponse::success(FinalReviewResponse {
        book_id,
        decision,
    })))
}
