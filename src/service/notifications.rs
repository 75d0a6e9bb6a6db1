use crate::models::{NewNotification, Notification};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// 通知队列服务
///
/// 启动时构造一次, 通过应用状态注入到各处理器; 渲染层通过
/// [`NotificationCenter::subscribe`] 订阅当前通知列表。
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

struct Inner {
    next_id: AtomicU64,
    default_ttl: Option<Duration>,
    sender: watch::Sender<Vec<Notification>>,
}

impl NotificationCenter {
    /// `default_ttl` 为 `None` 时, 未指定时长的通知不会自动消失
    pub fn new(default_ttl: Option<Duration>) -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                default_ttl,
                sender,
            }),
        }
    }

    /// 发布通知, 返回通知ID
    ///
    /// 有有效时长时启动自动消失计时 (需在 tokio 运行时内调用)。
    pub fn publish(&self, new: NewNotification) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let ttl = match new.duration_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => self.inner.default_ttl,
        };

        let notification = Notification {
            id,
            level: new.level,
            title: new.title,
            message: new.message,
            created_at: Utc::now(),
        };
        tracing::debug!(
            "Publishing notification {} ({:?}): {}",
            id,
            notification.level,
            notification.title
        );
        self.inner.sender.send_modify(|list| list.push(notification));

        if let Some(ttl) = ttl {
            self.schedule_dismiss(id, ttl);
        }
        id
    }

    fn schedule_dismiss(&self, id: u64, ttl: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime available, notification {} will not auto-dismiss", id);
            return;
        };
        let center = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            center.dismiss(id);
        });
    }

    /// 移除通知; 不存在时返回 false
    pub fn dismiss(&self, id: u64) -> bool {
        let removed = self.inner.sender.send_if_modified(|list| {
            let before = list.len();
            list.retain(|n| n.id != id);
            list.len() != before
        });
        if removed {
            tracing::debug!("Dismissed notification {}", id);
        }
        removed
    }

    pub fn current(&self) -> Vec<Notification> {
        self.inner.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.inner.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationLevel;

    fn info(title: &str, duration_ms: Option<u64>) -> NewNotification {
        NewNotification {
            level: NotificationLevel::Info,
            title: title.to_string(),
            message: None,
            duration_ms,
        }
    }

    #[tokio::test]
    async fn publish_and_dismiss() {
        let center = NotificationCenter::new(None);
        let first = center.publish(info("first", None));
        let second = center.publish(info("second", None));
        assert_ne!(first, second);
        assert_eq!(center.current().len(), 2);

        assert!(center.dismiss(first));
        assert!(!center.dismiss(first));
        let titles: Vec<_> = center.current().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["second"]);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let center = NotificationCenter::new(None);
        let mut rx = center.subscribe();

        let id = center.publish(NewNotification::success("saved").with_message("3 transactions"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update()[0].id, id);

        center.dismiss(id);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn notifications_auto_dismiss_after_ttl() {
        let center = NotificationCenter::new(Some(Duration::from_millis(20)));
        center.publish(info("short", None));
        center.publish(info("sticky", Some(0)));
        assert_eq!(center.current().len(), 2);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let titles: Vec<_> = center.current().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["sticky"]);
    }
}
