//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    BroadcastHub, ChannelService, ChannelServiceDependencies, MessageService,
    MessageServiceDependencies, SystemClock,
};
use config::AppConfig;
use infrastructure::{create_pg_pool, PgChannelRepository, PgMessageRepository, PgUserDirectory};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    if let Err(err) = config.validate() {
        // 开发默认值过不了生产校验，只告警不中断
        tracing::warn!(error = %err, "配置校验未通过");
    }

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').last().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    let channel_repository = Arc::new(PgChannelRepository::new(pg_pool.clone()));
    let message_repository = Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let user_directory = Arc::new(PgUserDirectory::new(pg_pool));

    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock::default());
    let hub = BroadcastHub::new(config.broadcast.capacity);

    let channel_service = ChannelService::new(ChannelServiceDependencies {
        channel_repository: channel_repository.clone(),
        user_directory: user_directory.clone(),
        clock: clock.clone(),
    });

    let message_service = MessageService::new(MessageServiceDependencies {
        channel_repository,
        message_repository,
        user_directory,
        clock,
        publisher: Arc::new(hub.clone()),
    });

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let state = AppState::new(
        Arc::new(channel_service),
        Arc::new(message_service),
        hub,
        jwt_service,
    );

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("频道服务器启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
