mod channel_service;
mod message_service;

pub use channel_service::{ChannelService, ChannelServiceDependencies, CreateChannelRequest};
pub use message_service::{
    MessageService, MessageServiceDependencies, SendMessageRequest, DEFAULT_PAGE_LIMIT,
};

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod channel_service_tests;
