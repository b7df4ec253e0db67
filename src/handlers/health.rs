// src/handlers/health.rs
use log::{error, info};
use serde::Deserialize;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    pub user_id: Option<String>,
}

pub async fn get_health(query: HealthQuery, state: Arc<AppState>) -> Result<Json, Rejection> {
    let user_id = query.user_id.unwrap_or_else(|| "default_user".to_string());
    info!("Handling request to get health data for {}", user_id);

    let sample = state.health.sample(&user_id).map_err(|e| {
        error!("Failed to read health data: {:#}", e);
        warp::reject::custom(ApiError::internal(format!("Failed to read health data: {:#}", e)))
    })?;

    Ok(warp::reply::json(&sample))
}
