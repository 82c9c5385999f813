use domain::UserId;

/// 归一化后的请求身份。
///
/// 底层可能是密码会话、OAuth 会话或者什么都没有；核心逻辑
/// 只认这一个标签化结果，不关心具体认证机制。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Authenticated(UserId),
    Unauthenticated,
}

impl Identity {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Identity::Authenticated(id) => Some(*id),
            Identity::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }
}
