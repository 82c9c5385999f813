//! 进程内广播枢纽。
//!
//! 一条 `tokio::sync::broadcast` 总线承载所有频道事件，每个连接
//! 持有一个 `EventStream`，按自己加入的主题过滤。投递语义：
//! at-most-once、无持久化、无回放，落后的接收端直接跳过积压。

use std::collections::HashSet;

use async_trait::async_trait;
use domain::ChannelId;
use tokio::sync::broadcast;

use crate::broadcaster::{BroadcastError, ChannelEvent, EventPublisher};

#[derive(Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<ChannelEvent>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 为一个连接建立事件流。初始不订阅任何主题。
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
            topics: HashSet::new(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for BroadcastHub {
    async fn publish(&self, event: ChannelEvent) -> Result<(), BroadcastError> {
        // 没有任何订阅者不算失败
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// 单个连接的事件流。
///
/// 一个连接可以同时加入多个频道主题；流被丢弃时自动退订全部主题。
pub struct EventStream {
    receiver: broadcast::Receiver<ChannelEvent>,
    topics: HashSet<ChannelId>,
}

impl EventStream {
    pub fn join_topic(&mut self, channel_id: ChannelId) {
        self.topics.insert(channel_id);
    }

    pub fn leave_topic(&mut self, channel_id: ChannelId) {
        self.topics.remove(&channel_id);
    }

    pub fn is_subscribed(&self, channel_id: ChannelId) -> bool {
        self.topics.contains(&channel_id)
    }

    /// 下一条属于已加入主题的事件；总线关闭时返回 None。
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.topics.contains(&event.channel_id()) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged, dropping backlog");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::MessageDeletedPayload;
    use domain::MessageId;
    use uuid::Uuid;

    fn deleted_event(channel_id: ChannelId) -> ChannelEvent {
        ChannelEvent::MessageDeleted(MessageDeletedPayload {
            msg_id: MessageId::new(Uuid::new_v4()),
            channel_id,
        })
    }

    #[tokio::test]
    async fn stream_only_sees_joined_topics() {
        let hub = BroadcastHub::new(16);
        let channel_a = ChannelId::new(Uuid::new_v4());
        let channel_b = ChannelId::new(Uuid::new_v4());

        let mut stream = hub.subscribe();
        stream.join_topic(channel_a);

        hub.publish(deleted_event(channel_b)).await.unwrap();
        hub.publish(deleted_event(channel_a)).await.unwrap();

        let received = stream.recv().await.unwrap();
        assert_eq!(received.channel_id(), channel_a);
    }

    #[tokio::test]
    async fn leave_topic_stops_delivery() {
        let hub = BroadcastHub::new(16);
        let channel_a = ChannelId::new(Uuid::new_v4());
        let channel_b = ChannelId::new(Uuid::new_v4());

        let mut stream = hub.subscribe();
        stream.join_topic(channel_a);
        stream.join_topic(channel_b);
        stream.leave_topic(channel_a);

        assert!(!stream.is_subscribed(channel_a));
        assert!(stream.is_subscribed(channel_b));

        hub.publish(deleted_event(channel_a)).await.unwrap();
        hub.publish(deleted_event(channel_b)).await.unwrap();

        let received = stream.recv().await.unwrap();
        assert_eq!(received.channel_id(), channel_b);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let hub = BroadcastHub::new(16);
        let channel = ChannelId::new(Uuid::new_v4());
        assert!(hub.publish(deleted_event(channel)).await.is_ok());
    }

    #[tokio::test]
    async fn multiple_streams_fan_out() {
        let hub = BroadcastHub::new(16);
        let channel = ChannelId::new(Uuid::new_v4());

        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        first.join_topic(channel);
        second.join_topic(channel);

        assert_eq!(hub.subscriber_count(), 2);

        hub.publish(deleted_event(channel)).await.unwrap();

        assert_eq!(first.recv().await.unwrap().channel_id(), channel);
        assert_eq!(second.recv().await.unwrap().channel_id(), channel);

        drop(second);
        assert_eq!(hub.subscriber_count(), 1);
    }
}
