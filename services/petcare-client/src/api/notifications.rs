//! Notification endpoints

use super::{endpoints, resource_path, ApiClient};
use crate::error::Result;
use crate::http::Method;
use crate::types::{DataEnvelope, Notification};

impl ApiClient {
    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        let envelope: DataEnvelope<Vec<Notification>> = self
            .request_json(Method::Get, endpoints::NOTIFICATIONS, &[], None)
            .await?;
        Ok(envelope.data)
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<()> {
        let path = resource_path(endpoints::NOTIFICATIONS, &[id, "read"])?;
        self.request(Method::Patch, &path, &[], None).await?;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        let path = resource_path(endpoints::NOTIFICATIONS, &["read-all"])?;
        self.request(Method::Patch, &path, &[], None).await?;
        Ok(())
    }

    pub async fn delete_all_notifications(&self) -> Result<()> {
        self.request(Method::Delete, endpoints::NOTIFICATIONS, &[], None)
            .await?;
        Ok(())
    }
}
