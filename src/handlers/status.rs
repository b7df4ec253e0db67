// src/handlers/status.rs
use warp::reply::Json;
use warp::Rejection;

use crate::models::ServiceStatus;

pub async fn get_status() -> Result<Json, Rejection> {
    Ok(warp::reply::json(&ServiceStatus {
        message: "Welcome to the Like Her API".to_string(),
        status: "operational".to_string(),
    }))
}
