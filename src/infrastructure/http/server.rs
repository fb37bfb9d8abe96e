//! HTTP Server
//!
//! 路由、中间件层与优雅关闭

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::error_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

const DEFAULT_BODY_LIMIT_MB: usize = 8;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体上限，批量导入受此限制
    pub body_limit_bytes: usize,
    /// 允许跨域的来源，为空时允许任意来源
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", 5070)
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            body_limit_bytes: DEFAULT_BODY_LIMIT_MB * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }

    pub fn with_body_limit_mb(mut self, mb: usize) -> Self {
        self.body_limit_bytes = mb * 1024 * 1024;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// 请求体上限、错误日志、追踪、CORS，由内到外
fn apply_layers(router: Router, config: &ServerConfig) -> Router {
    router
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(middleware::from_fn(error_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    fn build_router(&self) -> Router {
        apply_layers(create_routes().with_state(self.state.clone()), &self.config)
    }

    /// 启动服务器，`shutdown_signal` 完成后优雅关闭
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let addr = self.config.addr();

        info!(
            addr = %addr,
            body_limit_bytes = self.config.body_limit_bytes,
            cors_origins = self.config.cors_origins.len(),
            "Starting HTTP server"
        );

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::{get, post};
    use http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn layered(config: &ServerConfig) -> Router {
        let router = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route("/import", post(|body: String| async move { body.len().to_string() }));
        apply_layers(router, config)
    }

    #[test]
    fn test_server_addr() {
        assert_eq!(ServerConfig::default().addr(), "0.0.0.0:5070");
        assert_eq!(ServerConfig::new("127.0.0.1", 8080).addr(), "127.0.0.1:8080");
        assert_eq!(ServerConfig::default().body_limit_bytes, 8 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let config = ServerConfig::default().with_body_limit_mb(1);
        let app = layered(&config);

        let small = Request::builder()
            .method("POST")
            .uri("/import")
            .body(Body::from("x".repeat(1024)))
            .unwrap();
        let response = app.clone().oneshot(small).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let large = Request::builder()
            .method("POST")
            .uri("/import")
            .body(Body::from("x".repeat(2 * 1024 * 1024)))
            .unwrap();
        let response = app.oneshot(large).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_only_configured_origins_are_allowed() {
        let config = ServerConfig::default()
            .with_cors_origins(vec!["https://editor.example".to_string()]);
        let app = layered(&config);

        let allowed = Request::builder()
            .uri("/ping")
            .header("origin", "https://editor.example")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(allowed).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "https://editor.example"
        );

        let other = Request::builder()
            .uri("/ping")
            .header("origin", "https://elsewhere.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(other).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_any_origin_when_unconfigured() {
        let app = layered(&ServerConfig::default());
        let request = Request::builder()
            .uri("/ping")
            .header("origin", "https://elsewhere.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
