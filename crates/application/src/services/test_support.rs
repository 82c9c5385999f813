//! 服务测试用的内存适配器。
//!
//! 内存仓储在锁内完成条件增删，语义上等价于存储层的原子操作。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::{
    Channel, ChannelId, ChannelMember, Message, MessageId, Reaction, Reply, RepositoryError,
    Timestamp, UserId, UserSummary,
};

use crate::{
    broadcaster::{BroadcastError, ChannelEvent, EventPublisher},
    clock::Clock,
    directory::UserDirectory,
    repository::{ChannelListing, ChannelRepository, MessageRepository},
};

#[derive(Default)]
pub struct InMemoryChannelRepository {
    channels: Mutex<Vec<Channel>>,
    members: Mutex<Vec<ChannelMember>>,
    pub fail_touch: AtomicBool,
}

impl InMemoryChannelRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn member_count(&self, channel_id: ChannelId) -> usize {
        self.members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .count()
    }

    pub fn last_activity(&self, channel_id: ChannelId) -> Option<Timestamp> {
        self.channels
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == channel_id)
            .map(|c| c.last_activity)
    }
}

#[async_trait]
impl ChannelRepository for InMemoryChannelRepository {
    async fn create(
        &self,
        channel: Channel,
        creator: ChannelMember,
    ) -> Result<Channel, RepositoryError> {
        let mut channels = self.channels.lock().unwrap();
        if channels.iter().any(|c| c.slug == channel.slug) {
            return Err(RepositoryError::Conflict);
        }
        channels.push(channel.clone());
        self.members.lock().unwrap().push(creator);
        Ok(channel)
    }

    async fn find_by_id(&self, id: ChannelId) -> Result<Option<Channel>, RepositoryError> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Channel>, RepositoryError> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.slug.as_str() == slug)
            .cloned())
    }

    async fn list_public(&self) -> Result<Vec<ChannelListing>, RepositoryError> {
        let mut rows: Vec<ChannelListing> = self
            .channels
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !c.is_private())
            .map(|c| ChannelListing {
                channel: c.clone(),
                member_count: self.member_count(c.id) as u64,
            })
            .collect();
        rows.sort_by(|a, b| b.channel.last_activity.cmp(&a.channel.last_activity));
        Ok(rows)
    }

    async fn touch_activity(&self, id: ChannelId, at: Timestamp) -> Result<(), RepositoryError> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("touch failed"));
        }
        let mut channels = self.channels.lock().unwrap();
        if let Some(channel) = channels.iter_mut().find(|c| c.id == id) {
            channel.last_activity = at;
        }
        Ok(())
    }

    async fn add_member(&self, member: ChannelMember) -> Result<(), RepositoryError> {
        let mut members = self.members.lock().unwrap();
        if !members
            .iter()
            .any(|m| m.channel_id == member.channel_id && m.user_id == member.user_id)
        {
            members.push(member);
        }
        Ok(())
    }

    async fn remove_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        self.members
            .lock()
            .unwrap()
            .retain(|m| !(m.channel_id == channel_id && m.user_id == user_id));
        Ok(())
    }

    async fn find_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Result<Option<ChannelMember>, RepositoryError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.channel_id == channel_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_members(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<ChannelMember>, RepositoryError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect())
    }
}

/// 按插入顺序保存消息，等价于按单调创建时间排序。
#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: Mutex<Vec<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn with_message<T>(
        &self,
        id: MessageId,
        mutate: impl FnOnce(&mut Message) -> Result<T, RepositoryError>,
    ) -> Result<(T, Message), RepositoryError> {
        let mut messages = self.messages.lock().unwrap();
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RepositoryError::NotFound)?;
        let out = mutate(message)?;
        Ok((out, message.clone()))
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn list_page(
        &self,
        channel_id: ChannelId,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|m| m.channel_id == channel_id)
            .skip((page as usize) * (limit as usize))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| m.id != id);
        if messages.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn toggle_reaction(
        &self,
        id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> Result<Message, RepositoryError> {
        let (_, message) = self.with_message(id, |m| {
            let before = m.reactions.len();
            m.reactions
                .retain(|r| !(r.emoji == emoji && r.user_id == user_id));
            if m.reactions.len() == before {
                m.reactions.push(Reaction {
                    emoji: emoji.to_owned(),
                    user_id,
                });
            }
            Ok(())
        })?;
        Ok(message)
    }

    async fn soft_delete(&self, id: MessageId) -> Result<Message, RepositoryError> {
        let (_, message) = self.with_message(id, |m| {
            m.tombstone();
            Ok(())
        })?;
        Ok(message)
    }

    async fn update_text(&self, id: MessageId, text: &str) -> Result<Message, RepositoryError> {
        let (_, message) = self.with_message(id, |m| {
            m.text = text.to_owned();
            m.edited = true;
            Ok(())
        })?;
        Ok(message)
    }

    async fn add_reply(&self, id: MessageId, reply: Reply) -> Result<Message, RepositoryError> {
        let (_, message) = self.with_message(id, |m| {
            m.replies.push(reply);
            Ok(())
        })?;
        Ok(message)
    }

    async fn set_pinned(&self, id: MessageId, pinned: bool) -> Result<Message, RepositoryError> {
        let (_, message) = self.with_message(id, |m| {
            m.pinned = pinned;
            Ok(())
        })?;
        Ok(message)
    }
}

#[derive(Default)]
pub struct StaticUserDirectory {
    users: Mutex<HashMap<UserId, UserSummary>>,
    pub fail: AtomicBool,
}

impl StaticUserDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, summary: UserSummary) {
        self.users.lock().unwrap().insert(summary.id, summary);
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn get_summary(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("directory down"));
        }
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn get_summaries(&self, ids: &[UserId]) -> Result<Vec<UserSummary>, RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("directory down"));
        }
        let users = self.users.lock().unwrap();
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

/// 记录所有发布事件的广播器，可切换为失败模式。
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<ChannelEvent>>,
    pub fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: ChannelEvent) -> Result<(), BroadcastError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BroadcastError::failed("transport down"));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// 每次读取前进一毫秒，保证单调递增的创建时间。
pub struct TickingClock {
    now: Mutex<Timestamp>,
}

impl TickingClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(chrono::Utc::now()),
        })
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::seconds(secs);
    }
}

impl Clock for TickingClock {
    fn now(&self) -> Timestamp {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::milliseconds(1);
        *now
    }
}
