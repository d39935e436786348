use booknest_app::{
    router::app_router,
    state::{AppConfig, AppState},
};
use booknest_store::CoverStore;
use futures::FutureExt as _;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::Result;

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let app = app_router(state);

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let covers_dir = config.covers_dir();
    if !covers_dir.is_dir() {
        tokio::fs::create_dir_all(&covers_dir).await?;
        info!("Created directory for cover images");
    }

    let pool = booknest_dal::new_pool(&config.database_url()).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let app_config = AppConfig {
        upload_limit_mb: config.upload_limit_mb,
    };
    Ok(AppState::new(
        app_config,
        pool,
        CoverStore::new(covers_dir),
    ))
}
