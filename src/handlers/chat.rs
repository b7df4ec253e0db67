// src/handlers/chat.rs
use chrono::Local;
use futures_util::stream::{self, StreamExt};
use log::{error, info};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use warp::reply::Json;
use warp::sse::Event;
use warp::{Rejection, Reply};

use super::error::ApiError;
use crate::models::{ChatRequest, ChatResponse};
use crate::state::AppState;

/// Final SSE data line of a streamed reply.
pub const STREAM_SENTINEL: &str = "[DONE]";

async fn compute_reply(request: &ChatRequest, state: &AppState) -> Result<String, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::validation("message must not be empty"));
    }

    info!("Received message from {}: {}", request.user_id, request.message);
    let reply = state
        .responder
        .respond(&request.message, &request.user_id, &request.history)
        .await
        .map_err(|e| {
            error!("Error in chat endpoint: {:#}", e);
            ApiError::upstream(format!("Chat backend failed: {:#}", e))
        })?;
    info!("Response for {}: {}", request.user_id, reply);
    Ok(reply)
}

pub async fn post_chat(request: ChatRequest, state: Arc<AppState>) -> Result<Json, Rejection> {
    let response = compute_reply(&request, &state)
        .await
        .map_err(warp::reject::custom)?;

    Ok(warp::reply::json(&ChatResponse {
        response,
        timestamp: Local::now().to_rfc3339(),
    }))
}

/// One event per character of an already complete reply, then the sentinel.
/// Each character is sent as a JSON string so spaces and newlines survive
/// SSE line framing.
pub fn reply_events(
    reply: String,
    delay: Duration,
) -> impl futures_util::Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let chars: Vec<String> = reply.chars().map(String::from).collect();
    stream::iter(chars)
        .then(move |ch| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, Infallible>(Event::default().data(serde_json::Value::String(ch).to_string()))
        })
        .chain(stream::once(async {
            Ok::<_, Infallible>(Event::default().data(STREAM_SENTINEL))
        }))
}

pub async fn post_chat_stream(
    request: ChatRequest,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let reply = compute_reply(&request, &state)
        .await
        .map_err(warp::reject::custom)?;

    let events = reply_events(reply, state.config.stream_delay);
    Ok(warp::sse::reply(warp::sse::keep_alive().stream(events)))
}
