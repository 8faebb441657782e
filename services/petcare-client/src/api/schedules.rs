//! Schedule endpoints

use super::{endpoints, resource_path, ApiClient};
use crate::error::Result;
use crate::http::Method;
use crate::types::{DataEnvelope, Schedule, ScheduleDraft};

impl ApiClient {
    pub async fn schedules(&self) -> Result<Vec<Schedule>> {
        let envelope: DataEnvelope<Vec<Schedule>> = self
            .request_json(Method::Get, endpoints::SCHEDULES, &[], None)
            .await?;
        Ok(envelope.data)
    }

    pub async fn create_schedule(&self, draft: &ScheduleDraft) -> Result<Schedule> {
        let body = serde_json::to_value(draft)?;
        let envelope: DataEnvelope<Schedule> = self
            .request_json(Method::Post, endpoints::SCHEDULES, &[], Some(body))
            .await?;
        Ok(envelope.data)
    }

    pub async fn update_schedule(&self, id: &str, draft: &ScheduleDraft) -> Result<Schedule> {
        let body = serde_json::to_value(draft)?;
        let path = resource_path(endpoints::SCHEDULES, &[id])?;
        let envelope: DataEnvelope<Schedule> = self
            .request_json(Method::Put, &path, &[], Some(body))
            .await?;
        Ok(envelope.data)
    }

    pub async fn delete_schedule(&self, id: &str) -> Result<()> {
        let path = resource_path(endpoints::SCHEDULES, &[id])?;
        self.request(Method::Delete, &path, &[], None).await?;
        Ok(())
    }

    /// Set the enabled flag and return the schedule as stored by the server
    pub async fn toggle_schedule(&self, id: &str, enabled: bool) -> Result<Schedule> {
        let path = resource_path(endpoints::SCHEDULES, &[id, "toggle"])?;
        let body = serde_json::json!({ "enabled": enabled });
        let envelope: DataEnvelope<Schedule> = self
            .request_json(Method::Patch, &path, &[], Some(body))
            .await?;
        Ok(envelope.data)
    }
}
