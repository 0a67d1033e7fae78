use anyhow::Context;
use eshop_catalog::{
    app::catalog::CatalogService,
    config::AppConfig,
    create_app,
    infrastructure::{connect_storage, init_logging},
    AppState,
};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, sources) = AppConfig::load().context("加载配置失败")?;
    let _guard = init_logging(&config.logging).context("初始化日志失败")?;

    info!("启动 Eshop 商品目录服务...");
    match &sources.file {
        Some(path) => info!("从配置文件加载: {}", path.display()),
        None => info!("未找到配置文件，使用默认配置"),
    }
    if let Some(path) = &sources.dotenv {
        info!("已读取环境变量文件: {}", path.display());
    }
    if config.database.connection_uri().is_none() {
        warn!("MONGO_URI 未设置，数据接口将返回 500");
    }

    let storage = connect_storage(&config.database).await;
    if !storage.is_available() {
        info!("数据库不可用，仅提供页面服务");
    }

    let state = AppState::new(CatalogService::new(storage));
    let app = create_app(state, &config);

    let address = config.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("无法绑定到 {}", address))?;

    info!("🚀 服务运行在 http://{}", listener.local_addr()?);
    info!("   GET    /                  - 首页");
    info!("   GET    /products          - 商品页");
    info!("   GET    /search?query=     - 按名称前缀搜索");
    info!("   POST   /like              - 点赞");
    info!("   GET    /popular-products  - 热门商品");
    info!("   GET    /health            - 健康检查");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("服务已关闭");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("收到 Ctrl+C，正在关闭");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("收到 SIGTERM，正在关闭");
            }
            Err(e) => {
                tracing::error!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
