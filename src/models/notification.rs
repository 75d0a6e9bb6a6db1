use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 待发布的通知
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub level: NotificationLevel,
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    /// 自动消失时间 (毫秒); 缺省时使用配置的默认值, 0 表示常驻
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl NewNotification {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            message: None,
            duration_ms: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// 已发布的通知
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub title: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}
