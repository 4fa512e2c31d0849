use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::service::PlayService;

const INVALID_INDEX: &str = "Invalid play index";
const INVALID_INDICES: &str = "Invalid play indices";

type Shared = State<Arc<PlayService>>;

pub fn router(service: Arc<PlayService>) -> Router {
    Router::new()
        .route("/api/plays", get(list_plays))
        .route("/api/play/:index", get(play))
        .route("/api/compare/:play1/:play2", get(compare))
        .route("/api/character_words/:index/:character", get(character_words))
        .route("/api/cache", get(cache_status))
        .with_state(service)
}

pub async fn serve(service: Arc<PlayService>, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(service))
        .await
        .context("Server error")
}

fn error(msg: impl Into<String>) -> Json<Value> {
    let msg: String = msg.into();
    Json(json!({ "error": msg }))
}

fn to_json<T: Serialize>(value: &T) -> Json<Value> {
    match serde_json::to_value(value) {
        Ok(v) => Json(v),
        Err(e) => {
            warn!("Failed to serialize response: {}", e);
            error(e.to_string())
        }
    }
}

fn parse_index(raw: &str) -> Option<usize> {
    raw.trim().parse().ok()
}

async fn list_plays(State(svc): Shared) -> Json<Value> {
    let plays = svc.plays().await;
    let rows: Vec<Value> = plays
        .iter()
        .enumerate()
        .map(|(index, p)| json!({ "index": index, "location": p.location, "title": p.title }))
        .collect();
    Json(Value::Array(rows))
}

async fn play(State(svc): Shared, Path(index): Path<String>) -> Json<Value> {
    let Some(index) = parse_index(&index) else {
        return error(INVALID_INDEX);
    };
    match svc.play(index).await {
        Ok((_, cached)) => to_json(&cached.entry),
        Err(_) => error(INVALID_INDEX),
    }
}

async fn compare(State(svc): Shared, Path((first, second)): Path<(String, String)>) -> Json<Value> {
    let (Some(first), Some(second)) = (parse_index(&first), parse_index(&second)) else {
        return error(INVALID_INDICES);
    };
    match svc.compare(first, second).await {
        Ok(cmp) => to_json(&cmp),
        Err(_) => error(INVALID_INDICES),
    }
}

async fn character_words(
    State(svc): Shared,
    Path((index, character)): Path<(String, String)>,
) -> Json<Value> {
    let Some(index) = parse_index(&index) else {
        return error(INVALID_INDEX);
    };
    match svc.character_words(index, &character).await {
        Ok(words) => to_json(&words),
        Err(AnalysisError::InvalidIndex { .. }) => error(INVALID_INDEX),
        Err(e) => error(e.to_string()),
    }
}

async fn cache_status(State(svc): Shared) -> Json<Value> {
    let mut rows = Vec::new();
    for (location, cached) in svc.cached() {
        rows.push(json!({
            "name": svc.play_name(&location).await,
            "location": location,
            "stored_at": cached.stored_at,
            "error": cached.entry.error(),
        }));
    }
    Json(Value::Array(rows))
}
