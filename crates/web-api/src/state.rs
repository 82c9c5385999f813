use std::sync::Arc;

use application::{BroadcastHub, ChannelService, MessageService};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub channel_service: Arc<ChannelService>,
    pub message_service: Arc<MessageService>,
    pub hub: BroadcastHub,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        channel_service: Arc<ChannelService>,
        message_service: Arc<MessageService>,
        hub: BroadcastHub,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            channel_service,
            message_service,
            hub,
            jwt_service,
        }
    }
}
