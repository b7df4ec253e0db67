// src/routes.rs
use std::convert::Infallible;
use std::sync::Arc;

use log::{info, warn};
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::error::ApiError;
use crate::handlers::{chat, health, news, status, stocks, tasks};
use crate::services::tasks::BackgroundTask;
use crate::state::AppState;

const MAX_BODY_BYTES: u64 = 64 * 1024;

// Converts rejections into `{"error", "kind"}` bodies.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, kind, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "Not Found".to_string())
    } else if let Some(api_error) = err.find::<ApiError>() {
        (api_error.status(), api_error.kind(), api_error.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "validation", e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, "validation", e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "validation",
            "Payload Too Large".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "Method Not Allowed".to_string(),
        )
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "Internal Server Error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
            "kind": kind,
        })),
        code,
    ))
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let state_filter = warp::any().map(move || state.clone());
    let json_body = warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json());

    let root_route = warp::path::end()
        .and(warp::get())
        .and_then(status::get_status);

    let chat_route = warp::path!("chat")
        .and(warp::post())
        .and(json_body.clone())
        .and(state_filter.clone())
        .and_then(chat::post_chat);

    let chat_stream_route = warp::path!("chat" / "stream")
        .and(warp::post())
        .and(json_body)
        .and(state_filter.clone())
        .and_then(chat::post_chat_stream);

    let news_route = warp::path!("news")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(news::get_news);

    let health_route = warp::path!("health")
        .and(warp::get())
        .and(warp::query::<health::HealthQuery>())
        .and(state_filter.clone())
        .and_then(health::get_health);

    let stocks_route = warp::path!("stocks")
        .and(warp::get())
        .and(warp::query::<stocks::StockQuery>())
        .and(state_filter.clone())
        .and_then(stocks::get_stocks);

    let fetch_news_route = warp::path!("tasks" / "fetch-news")
        .and(warp::post())
        .map(|| BackgroundTask::FetchNews)
        .and(state_filter.clone())
        .and_then(tasks::trigger_task);

    let fetch_papers_route = warp::path!("tasks" / "fetch-papers")
        .and(warp::post())
        .map(|| BackgroundTask::FetchPapers)
        .and(state_filter)
        .and_then(tasks::trigger_task);

    info!("All routes configured successfully.");

    root_route
        .or(chat_route)
        .or(chat_stream_route)
        .or(news_route)
        .or(health_route)
        .or(stocks_route)
        .or(fetch_news_route)
        .or(fetch_papers_route)
        .recover(handle_rejection)
        .with(warp::log("like_her::api"))
}
