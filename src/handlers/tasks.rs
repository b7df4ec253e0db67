// src/handlers/tasks.rs
use log::{error, info};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::models::TaskAck;
use crate::services::tasks::BackgroundTask;
use crate::state::AppState;

/// Queues `task` and acknowledges without waiting for it to run.
pub async fn trigger_task(task: BackgroundTask, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling trigger for {}", task);

    let task_id = state.tasks.enqueue(task).map_err(|e| {
        error!("Could not queue {}: {}", task, e);
        warp::reject::custom(ApiError::internal(e.to_string()))
    })?;

    Ok(warp::reply::json(&TaskAck {
        status: "scheduled".to_string(),
        task: task.slug().to_string(),
        task_id,
    }))
}
