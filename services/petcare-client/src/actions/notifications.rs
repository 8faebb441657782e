use super::PetCare;
use crate::error::Result;
use crate::store::Action;
use crate::types::Notification;

impl PetCare {
    pub async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        self.store.dispatch(Action::NotificationsRequest).await;
        match self.api.notifications().await {
            Ok(notifications) => {
                self.store
                    .dispatch(Action::NotificationsLoaded(notifications.clone()))
                    .await;
                Ok(notifications)
            }
            Err(e) => {
                self.fail(
                    e,
                    "Failed to fetch notifications",
                    Action::NotificationsFailure,
                )
                .await
            }
        }
    }

    /// Mark one notification read; repeating the call leaves the state unchanged
    pub async fn mark_notification_read(&self, id: &str) -> Result<()> {
        self.store.dispatch(Action::NotificationsRequest).await;
        match self.api.mark_notification_read(id).await {
            Ok(()) => {
                self.store
                    .dispatch(Action::NotificationRead(id.to_string()))
                    .await;
                Ok(())
            }
            Err(e) => {
                self.fail(
                    e,
                    "Failed to mark notification as read",
                    Action::NotificationsFailure,
                )
                .await
            }
        }
    }

    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        self.store.dispatch(Action::NotificationsRequest).await;
        match self.api.mark_all_notifications_read().await {
            Ok(()) => {
                self.store.dispatch(Action::AllNotificationsRead).await;
                Ok(())
            }
            Err(e) => {
                self.fail(
                    e,
                    "Failed to mark all notifications as read",
                    Action::NotificationsFailure,
                )
                .await
            }
        }
    }

    pub async fn clear_notifications(&self) -> Result<()> {
        self.store.dispatch(Action::NotificationsRequest).await;
        match self.api.delete_all_notifications().await {
            Ok(()) => {
                self.store.dispatch(Action::NotificationsCleared).await;
                Ok(())
            }
            Err(e) => {
                self.fail(
                    e,
                    "Failed to clear notifications",
                    Action::NotificationsFailure,
                )
                .await
            }
        }
    }
}
