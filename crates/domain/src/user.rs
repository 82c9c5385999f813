use crate::value_objects::UserId;

/// 用户展示摘要。
///
/// 账号体系由外部系统负责，这里只消费用于渲染消息和
/// 成员列表的最小字段。查不到用户时退化为占位摘要，
/// 不让整个响应失败。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub photo: Option<String>,
}

impl UserSummary {
    pub fn placeholder(id: UserId) -> Self {
        Self {
            id,
            username: "unknown".to_owned(),
            name: "Unknown User".to_owned(),
            photo: None,
        }
    }
}
