use std::net::SocketAddr;

use tracing::info;

use crate::cli::{GlobalArgs, ServeArgs, effective_config};
use crate::routes;
use crate::services::loader;
use crate::state::AppState;

pub async fn execute(global: GlobalArgs, serve_args: ServeArgs) -> anyhow::Result<()> {
    //  Config
    let cfg = effective_config(&global, &serve_args.pipeline)?;

    //  Model: loaded eagerly; any failure aborts before the listener binds
    let load_cfg = cfg.clone();
    let predictor = tokio::task::spawn_blocking(move || loader::load_predictor(&load_cfg)).await??;

    //  Shared state + router
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    let state = AppState::new(predictor);
    let app = routes::app(state);

    info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
