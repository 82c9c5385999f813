//! WebSocket 连接任务。
//!
//! 每个连接持有一个事件流，客户端通过 joinRoom / leaveRoom
//! 控制自己订阅哪些频道主题；服务端把命中主题的事件原样推送。

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use domain::ChannelId;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum ClientAction {
    #[serde(rename_all = "camelCase")]
    JoinRoom { channel_id: Uuid },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { channel_id: Uuid },
}

pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut stream = state.hub.subscribe();
    let (mut sender, mut incoming) = socket.split();

    loop {
        tokio::select! {
            event = stream.recv() => {
                // None 表示总线关闭，连接随之结束
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize websocket payload");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            message = incoming.next() => {
                match message {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientAction>(&text) {
                            Ok(ClientAction::JoinRoom { channel_id }) => {
                                stream.join_topic(ChannelId::from(channel_id));
                            }
                            Ok(ClientAction::LeaveRoom { channel_id }) => {
                                stream.leave_topic(ChannelId::from(channel_id));
                            }
                            Err(err) => {
                                tracing::debug!(error = %err, "ignoring malformed client action");
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }
}
