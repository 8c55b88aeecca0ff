use crate::agent::CalcAgent;
use crate::models::chat::Conversation;
use crate::view::SidebarEntry;
use super::api_key_from;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;
use axum::{
    routing::get,
    Json,
    Router,
    extract::{ Path, Request, State },
    http::StatusCode,
    middleware::{ self, Next },
    response::Response,
};
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

#[derive(Clone)]
struct ApiState {
    agent: Arc<Mutex<CalcAgent>>,
    api_key: Option<String>,
}

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/{id}", get(get_conversation))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(cors)
        .with_state(state)
}

/// Serves the read-only history API in the background. Guarded by the same
/// key as the WebSocket server.
pub async fn start_http_server(
    addr: String,
    agent: Arc<Mutex<CalcAgent>>,
    api_key: Option<String>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("Starting HTTP API server on: http://{}", addr);

    let app = router(ApiState { agent, api_key });

    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    error!("HTTP server error: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            }
        }
    });

    Ok(())
}

async fn require_api_key(
    State(state): State<ApiState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(required) = state.api_key.as_deref() {
        let header = req.headers().get("X-API-Key").and_then(|v| v.to_str().ok());
        if api_key_from(header, req.uri().query()).as_deref() != Some(required) {
            warn!("HTTP API: bad or missing API key for {}", req.uri().path());
            return Err(StatusCode::UNAUTHORIZED);
        }
    }
    Ok(next.run(req).await)
}

async fn list_conversations(State(state): State<ApiState>) -> Json<Vec<SidebarEntry>> {
    Json(state.agent.lock().await.sidebar().entries)
}

async fn get_conversation(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<Conversation>, StatusCode> {
    state.agent
        .lock().await
        .conversation(id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
