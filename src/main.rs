use dotenv::dotenv;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use like_her::config::Config;
use like_her::routes;
use like_her::services::tasks::LoggingHandler;
use like_her::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = Config::from_env()?;
    info!(
        "Using PORT {}, DATA_DIR {}, mock mode {}",
        config.port,
        config.data_dir.display(),
        config.mock_mode
    );

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();

    let (state, worker) = AppState::from_config(config)?;
    tokio::spawn(worker.run(Arc::new(LoggingHandler)));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST"]);

    let api = routes::routes(state).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
