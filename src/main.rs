use std::sync::Arc;
use tax_ledger_rust::{
    api, create_pool, AppConfig, LedgerService, NotificationCenter, PgTransactionSource,
};
use tracing::info;
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式, 默认 info 级别 (可用 RUST_LOG 覆盖)
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    // 服务在此构造一次, 通过状态注入到处理器
    let ledger = Arc::new(LedgerService::new(Arc::new(PgTransactionSource::new(pool))));
    let notifications = NotificationCenter::new(config.notifications.default_ttl());

    let app = api::router(api::AppState { ledger, notifications });

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET    /api/transactions            - filtered transaction list");
    info!("  GET    /api/transactions/summary    - summary rollup");
    info!("  GET    /api/transactions/export     - CSV export");
    info!("  POST   /api/transactions/refresh    - refetch a scope");
    info!("  POST   /api/transactions/summarize  - summarize a posted array");
    info!("  GET    /api/notifications           - current notifications");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
