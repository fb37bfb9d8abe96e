//! Bookforge - AI 辅助的书籍生成服务
//!
//! - Domain: book/, review, context, compilation
//! - Application: pipeline, commands, queries, ports
//! - Infrastructure: http, memory, worker, persistence, adapters, events

use std::sync::Arc;

use anyhow::Context;
use bookforge::application::{
    BookLocks, GenerationPort, NotificationLogPort, NotifierPort, PipelineOrchestrator,
};
use bookforge::config::{load_config, print_config, AppConfig, LlmProvider};
use bookforge::infrastructure::adapters::compiler::{CompilerConfig, ManuscriptCompiler};
use bookforge::infrastructure::adapters::llm::{
    FakeLlmClient, FakeLlmConfig, GeminiClient, GeminiClientConfig,
};
use bookforge::infrastructure::adapters::notifier::{
    NotificationDispatcher, WebhookConfig, WebhookNotifier,
};
use bookforge::infrastructure::events::EventPublisher;
use bookforge::infrastructure::http::{AppState, HttpServer, ServerConfig};
use bookforge::infrastructure::memory::InMemoryJobQueue;
use bookforge::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteBookRepository, SqliteNotificationLog,
};
use bookforge::infrastructure::worker::{PipelineWorker, PipelineWorkerConfig};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},bookforge={},tower_http=debug,sqlx=warn",
        config.log.level, config.log.level
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn GenerationPort>> {
    let llm = &config.llm;
    match llm.provider {
        LlmProvider::Gemini => {
            let client = GeminiClient::new(GeminiClientConfig {
                base_url: llm.base_url.clone(),
                api_key: llm.api_key.clone(),
                model: llm.model.clone(),
                timeout_secs: llm.timeout_secs,
                temperature: llm.temperature,
                max_outline_tokens: llm.max_outline_tokens,
                max_chapter_tokens: llm.max_chapter_tokens,
                max_summary_tokens: llm.max_summary_tokens,
            })
            .context("Failed to build LLM client")?;
            Ok(Arc::new(client))
        }
        LlmProvider::Fake => {
            tracing::warn!("Using fake LLM provider, no text will be requested from a model");
            Ok(Arc::new(FakeLlmClient::new(FakeLlmConfig::with_chapters(
                llm.fake_chapters,
            ))))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().context("Failed to load config")?;

    init_tracing(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Bookforge starting");
    print_config(&config);

    // 确保数据目录存在
    tokio::fs::create_dir_all(&config.storage.output_dir).await?;
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    let book_repo = Arc::new(SqliteBookRepository::new(pool.clone()));
    let notification_log: Arc<dyn NotificationLogPort> =
        Arc::new(SqliteNotificationLog::new(pool.clone()));

    // 通知：WebSocket 广播 + 可选 webhook，结果写入通知日志
    let event_publisher = Arc::new(EventPublisher::new());
    let webhook: Option<Arc<dyn NotifierPort>> = match config.notification.webhook() {
        Some(url) => {
            let notifier = WebhookNotifier::new(
                WebhookConfig::new(url).with_timeout(config.notification.timeout_secs),
            )
            .context("Failed to build webhook client")?;
            Some(Arc::new(notifier))
        }
        None => None,
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(
        event_publisher.clone(),
        webhook,
        notification_log.clone(),
    ));

    let compiler_config = CompilerConfig::new(&config.storage.output_dir)
        .with_formats(config.storage.formats.as_slice())?;
    let compiler = Arc::new(ManuscriptCompiler::new(compiler_config));

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        book_repo.clone(),
        build_generator(&config)?,
        dispatcher,
        compiler,
        Arc::new(BookLocks::new()),
    ));

    // 任务队列与后台 Worker
    let (job_tx, job_rx) = mpsc::channel(config.pipeline.queue_capacity);
    let job_queue = Arc::new(InMemoryJobQueue::new(job_tx));
    let worker = PipelineWorker::new(
        PipelineWorkerConfig {
            max_concurrent_books: config.pipeline.max_concurrent_books,
        },
        job_rx,
        job_queue.clone(),
        orchestrator.clone(),
    );
    tokio::spawn(worker.run());

    let state = AppState::new(
        book_repo,
        notification_log,
        job_queue,
        orchestrator,
        event_publisher,
        config.pipeline.auto_approve,
    );
    let server = HttpServer::new(
        ServerConfig::new(&config.server.host, config.server.port)
            .with_body_limit_mb(config.server.body_limit_mb)
            .with_cors_origins(config.server.cors_origins.clone()),
        state,
    );

    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    pool.close().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}
