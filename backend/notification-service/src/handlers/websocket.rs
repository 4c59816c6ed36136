//! WebSocket plane: connection upgrade, push entrypoints and accounting.
//!
//! Identity arrives pre-verified from the auth layer in front of this
//! service; routes only propagate the user id they are given.

use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::push::PushChannel;
use crate::websocket::{ConnectionRegistry, EventPayload, WsSession};

/// Upgrade a transport link and register it for the user.
///
/// Endpoint: GET /api/v1/ws/{user_id}
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<Uuid>,
    registry: web::Data<ConnectionRegistry>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();

    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = registry.connect(user_id, tx).await;

    let session = WsSession::new(user_id, connection_id, registry.get_ref().clone(), rx);
    ws::start(session, &req, stream)
}

/// Push an event to every live link of one user.
///
/// Endpoint: POST /api/v1/ws/notify/{user_id}
pub async fn notify_user(
    path: web::Path<Uuid>,
    push: web::Data<PushChannel>,
    body: web::Json<EventPayload>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let delivered = push.push(user_id, body.into_inner()).await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user_id": user_id.to_string(),
        "delivered": delivered
    })))
}

/// Push an event to every connected user.
///
/// Endpoint: POST /api/v1/ws/broadcast
pub async fn broadcast(
    push: web::Data<PushChannel>,
    body: web::Json<EventPayload>,
) -> ActixResult<HttpResponse> {
    let delivered = push.broadcast(body.into_inner()).await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "delivered": delivered
    })))
}

/// Connection accounting for one user.
///
/// Endpoint: GET /api/v1/ws/status/{user_id}
pub async fn ws_status(
    path: web::Path<Uuid>,
    registry: web::Data<ConnectionRegistry>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let connection_count = registry.user_connection_count(user_id).await;

    Ok(HttpResponse::Ok().json(json!({
        "user_id": user_id.to_string(),
        "connected": connection_count > 0,
        "connection_count": connection_count
    })))
}

/// Global connection accounting.
///
/// Endpoint: GET /api/v1/ws/stats
pub async fn ws_stats(registry: web::Data<ConnectionRegistry>) -> ActixResult<HttpResponse> {
    let total_connections = registry.connection_count().await;
    let connected_users = registry.connected_user_count().await;

    Ok(HttpResponse::Ok().json(json!({
        "total_connections": total_connections,
        "connected_users": connected_users
    })))
}

/// Register WebSocket routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/ws")
            .route("/stats", web::get().to(ws_stats))
            .route("/status/{user_id}", web::get().to(ws_status))
            .route("/notify/{user_id}", web::post().to(notify_user))
            .route("/broadcast", web::post().to(broadcast))
            // Catch-all path segment goes last.
            .route("/{user_id}", web::get().to(ws_connect)),
    );
}
