//! Sensor endpoints

use super::{endpoints, ApiClient};
use crate::error::Result;
use crate::http::Method;
use crate::types::{DataEnvelope, HistoryPoint, HistoryQuery, SensorUpdate};

impl ApiClient {
    /// Current sensor values; fields the backend omits stay `None`
    pub async fn sensor_data(&self) -> Result<SensorUpdate> {
        let envelope: DataEnvelope<SensorUpdate> = self
            .request_json(Method::Get, endpoints::SENSORS, &[], None)
            .await?;
        Ok(envelope.data)
    }

    pub async fn sensor_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryPoint>> {
        let envelope: DataEnvelope<Vec<HistoryPoint>> = self
            .request_json(
                Method::Get,
                endpoints::SENSOR_HISTORY,
                &query.query_params(),
                None,
            )
            .await?;
        Ok(envelope.data)
    }
}
