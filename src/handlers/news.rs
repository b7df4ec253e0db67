// src/handlers/news.rs
use log::{error, info};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::state::AppState;

pub async fn get_news(state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request to get news");

    let items = state.news.load().map_err(|e| {
        error!("Failed to load news: {:#}", e);
        warp::reject::custom(ApiError::internal(format!("Failed to load news: {:#}", e)))
    })?;

    Ok(warp::reply::json(&items))
}
