use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::services::{CreateChannelRequest, SendMessageRequest, DEFAULT_PAGE_LIMIT};
use application::ChannelSummaryView;

use crate::{error::ApiError, state::AppState, ws_connection};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChannelPayload {
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    is_private: bool,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    #[serde(default)]
    text: String,
    #[serde(default)]
    attachments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ReactionPayload {
    emoji: String,
}

#[derive(Debug, Deserialize)]
struct EditPayload {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ReplyPayload {
    text: String,
}

#[derive(Debug, Deserialize)]
struct PinPayload {
    #[serde(default = "default_pinned")]
    pinned: bool,
}

fn default_pinned() -> bool {
    true
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket_upgrade))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/channels", get(list_channels).post(create_channel))
        .route("/channels/{channel_id}", get(get_channel))
        .route("/channels/{channel_id}/join", post(join_channel))
        .route("/channels/{channel_id}/leave", post(leave_channel))
        .route(
            "/channels/{channel_id}/messages",
            post(send_message).get(list_messages),
        )
        .route(
            "/messages/{message_id}",
            delete(delete_message).patch(edit_message),
        )
        .route("/messages/{message_id}/reactions", post(toggle_reaction))
        .route("/messages/{message_id}/soft-delete", post(soft_delete_message))
        .route("/messages/{message_id}/replies", post(add_reply))
        .route("/messages/{message_id}/pin", post(pin_message))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// 公开频道列表。无需认证。
async fn list_channels(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let channels = state.channel_service.list_public().await?;
    Ok(Json(json!({ "success": true, "channels": channels })))
}

/// 频道详情。读取不做成员校验，私有频道也一样。
async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let channel = state.channel_service.get_detail(channel_id).await?;
    Ok(Json(json!({ "success": true, "channel": channel })))
}

async fn create_channel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateChannelPayload>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    let channel = state
        .channel_service
        .create_channel(CreateChannelRequest {
            name: payload.name,
            title: payload.title,
            description: payload.description,
            is_private: payload.is_private,
            created_by: Uuid::from(user_id),
        })
        .await?;

    // 刚创建只有创建者一个成员
    let view = ChannelSummaryView::from_channel(&channel, 1);
    Ok(Json(json!({ "success": true, "channel": view })))
}

async fn join_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    state
        .channel_service
        .join(channel_id, Uuid::from(user_id))
        .await?;
    Ok(Json(json!({ "success": true })))
}

async fn leave_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    state
        .channel_service
        .leave(channel_id, Uuid::from(user_id))
        .await?;
    Ok(Json(json!({ "success": true })))
}

async fn send_message(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    let message = state
        .message_service
        .send(SendMessageRequest {
            channel_id,
            author_id: Uuid::from(user_id),
            text: payload.text,
            attachments: payload.attachments,
        })
        .await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn list_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Value>, ApiError> {
    // limit 不设上限，沿用线上行为
    let page = query.page.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let messages = state.message_service.list(channel_id, page, limit).await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    let msg_id = state.message_service.delete(message_id, user_id).await?;
    Ok(Json(json!({ "success": true, "msgId": msg_id })))
}

async fn edit_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<EditPayload>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    let message = state
        .message_service
        .edit(message_id, user_id, &payload.text)
        .await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn toggle_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ReactionPayload>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    let message = state
        .message_service
        .toggle_reaction(message_id, user_id, &payload.emoji)
        .await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn soft_delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    let message = state.message_service.soft_delete(message_id, user_id).await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn add_reply(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ReplyPayload>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    let message = state
        .message_service
        .add_reply(message_id, user_id, &payload.text)
        .await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn pin_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<PinPayload>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state.jwt_service.require_user(&headers)?;
    let message = state
        .message_service
        .set_pinned(message_id, user_id, payload.pinned)
        .await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    ws: axum::extract::ws::WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| ws_connection::handle_socket(socket, state))
}
