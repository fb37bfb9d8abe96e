//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                   GET   健康检查
//! - /api/book/create            POST  创建书籍
//! - /api/book/import            POST  批量导入（已存在标题跳过）
//! - /api/book/get               POST  书籍详情（含章节）
//! - /api/book/list              GET   列出所有书籍
//! - /api/book/delete            POST  删除书籍及章节
//! - /api/book/progress          POST  生成与评审进度
//! - /api/book/run               POST  提交后台运行
//! - /api/book/resume            POST  清除 paused / error 并重新排队
//! - /api/book/compile           POST  评估编译门并编译
//! - /api/book/notifications     POST  通知投递日志
//! - /api/review/outline         POST  大纲评审
//! - /api/review/chapter         POST  章节评审
//! - /api/review/final           POST  终审记录
//! - /ws/events                  WS    流水线事件推送

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/events", get(handlers::events_websocket_handler))
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/book", book_routes())
        .nest("/review", review_routes())
}

fn book_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_book))
        .route("/import", post(handlers::import_books))
        .route("/get", post(handlers::get_book))
        .route("/list", get(handlers::list_books))
        .route("/delete", post(handlers::delete_book))
        .route("/progress", post(handlers::get_progress))
        .route("/run", post(handlers::run_book))
        .route("/resume", post(handlers::resume_book))
        .route("/compile", post(handlers::compile_book))
        .route("/notifications", post(handlers::list_notifications))
}

fn review_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/outline", post(handlers::review_outline))
        .route("/chapter", post(handlers::review_chapter))
        .route("/final", post(handlers::review_final))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;

    use crate::application::{BookLocks, PipelineOrchestrator};
    use crate::infrastructure::adapters::compiler::{CompilerConfig, ManuscriptCompiler};
    use crate::infrastructure::adapters::llm::{FakeLlmClient, FakeLlmConfig};
    use crate::infrastructure::events::EventPublisher;
    use crate::infrastructure::memory::{
        InMemoryBookRepository, InMemoryJobQueue, InMemoryNotificationLog,
    };

    struct TestApp {
        router: Router,
        _rx: mpsc::Receiver<String>,
        _dir: tempfile::TempDir,
    }

    fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(InMemoryBookRepository::new());
        let publisher = Arc::new(EventPublisher::new());
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            repo.clone(),
            Arc::new(FakeLlmClient::new(FakeLlmConfig::with_chapters(2))),
            publisher.clone(),
            Arc::new(ManuscriptCompiler::new(CompilerConfig::new(dir.path()))),
            Arc::new(BookLocks::new()),
        ));
        let (tx, rx) = mpsc::channel(16);
        let state = AppState::new(
            repo,
            Arc::new(InMemoryNotificationLog::new()),
            Arc::new(InMemoryJobQueue::new(tx)),
            orchestrator,
            publisher,
            false,
        );

        TestApp {
            router: create_routes().with_state(Arc::new(state)),
            _rx: rx,
            _dir: dir,
        }
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Value {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let app = test_app();
        let json = call(&app.router, "GET", "/api/ping", None).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let app = test_app();

        let created = call(
            &app.router,
            "POST",
            "/api/book/create",
            Some(json!({ "title": "Harbor Lights", "notes": "keep it short" })),
        )
        .await;
        assert_eq!(created["errno"], 0);
        let book_id = created["data"]["id"].as_str().unwrap().to_string();

        let fetched = call(
            &app.router,
            "POST",
            "/api/book/get",
            Some(json!({ "book_id": book_id })),
        )
        .await;
        assert_eq!(fetched["errno"], 0);
        assert_eq!(fetched["data"]["title"], "Harbor Lights");

        let listed = call(&app.router, "GET", "/api/book/list", None).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);

        let duplicate = call(
            &app.router,
            "POST",
            "/api/book/create",
            Some(json!({ "title": "  harbor lights " })),
        )
        .await;
        assert_eq!(duplicate["errno"], 400);
    }

    #[tokio::test]
    async fn test_unknown_book_is_not_found() {
        let app = test_app();
        let json = call(
            &app.router,
            "POST",
            "/api/book/progress",
            Some(json!({ "book_id": uuid::Uuid::new_v4().to_string() })),
        )
        .await;
        assert_eq!(json["errno"], 404);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn test_out_of_domain_review_status_is_rejected() {
        let app = test_app();
        let created = call(
            &app.router,
            "POST",
            "/api/book/create",
            Some(json!({ "title": "Gatekeeper" })),
        )
        .await;
        let book_id = created["data"]["id"].as_str().unwrap().to_string();

        let json = call(
            &app.router,
            "POST",
            "/api/review/outline",
            Some(json!({ "book_id": book_id, "status": "maybe" })),
        )
        .await;
        assert_eq!(json["errno"], 400);
    }

    #[tokio::test]
    async fn test_compile_without_outline_is_denied() {
        let app = test_app();
        let created = call(
            &app.router,
            "POST",
            "/api/book/create",
            Some(json!({ "title": "Unwritten" })),
        )
        .await;
        let book_id = created["data"]["id"].as_str().unwrap().to_string();

        let json = call(
            &app.router,
            "POST",
            "/api/book/compile",
            Some(json!({ "book_id": book_id })),
        )
        .await;
        assert_eq!(json["errno"], 0);
        assert_eq!(json["data"]["outcome"], "denied");
        assert_eq!(json["data"]["reason"], "incomplete");
    }
}
