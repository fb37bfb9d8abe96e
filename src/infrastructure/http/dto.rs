//! Data Transfer Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::book::{BookId, ChapterId};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

// ============================================================================
// Book DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRowRequest {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportBooksRequest {
    pub rows: Vec<ImportRowRequest>,
}

/// 只携带书籍 ID 的请求（get / delete / progress / compile / notifications）
#[derive(Debug, Deserialize)]
pub struct BookIdRequest {
    #[serde(alias = "id")]
    pub book_id: Uuid,
}

impl BookIdRequest {
    pub fn book_id(&self) -> BookId {
        BookId::from_uuid(self.book_id)
    }
}

/// run / resume 请求
#[derive(Debug, Deserialize)]
pub struct RunBookRequest {
    #[serde(alias = "id")]
    pub book_id: Uuid,
    /// 未指定时使用 `pipeline.auto_approve`
    #[serde(default)]
    pub auto_approve: Option<bool>,
}

impl RunBookRequest {
    pub fn book_id(&self) -> BookId {
        BookId::from_uuid(self.book_id)
    }
}

// ============================================================================
// Review DTOs
// ============================================================================

/// 大纲评审与终审请求
#[derive(Debug, Deserialize)]
pub struct BookReviewRequest {
    pub book_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookReviewRequest {
    pub fn book_id(&self) -> BookId {
        BookId::from_uuid(self.book_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct ChapterReviewRequest {
    pub book_id: Uuid,
    pub chapter_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ChapterReviewRequest {
    pub fn book_id(&self) -> BookId {
        BookId::from_uuid(self.book_id)
    }

    pub fn chapter_id(&self) -> ChapterId {
        ChapterId::from_uuid(self.chapter_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_id_request_accepts_id_alias() {
        let id = Uuid::new_v4();
        let req: BookIdRequest =
            serde_json::from_value(serde_json::json!({ "id": id.to_string() })).unwrap();
        assert_eq!(req.book_id(), BookId::from_uuid(id));
    }

    #[test]
    fn test_run_request_auto_approve_is_optional() {
        let req: RunBookRequest = serde_json::from_value(serde_json::json!({
            "book_id": Uuid::new_v4().to_string()
        }))
        .unwrap();
        assert!(req.auto_approve.is_none());
    }

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(json["errno"], 0);
        assert_eq!(json["error"], "");
        assert!(json["data"].is_object());
    }
}
