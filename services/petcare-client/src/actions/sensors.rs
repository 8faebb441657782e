use super::PetCare;
use crate::error::Result;
use crate::store::Action;
use crate::types::{HistoryPoint, HistoryQuery, SensorReading};

impl PetCare {
    /// Fetch current sensor values and return the merged snapshot
    pub async fn fetch_sensor_data(&self) -> Result<SensorReading> {
        self.store.dispatch(Action::SensorsRequest).await;
        match self.api.sensor_data().await {
            Ok(update) => {
                self.store.dispatch(Action::SensorsSuccess(update)).await;
                Ok(self.store.snapshot().await.sensors.reading)
            }
            Err(e) => {
                self.fail(e, "Failed to fetch sensor data", Action::SensorsFailure)
                    .await
            }
        }
    }

    /// Fetch history for one metric; replaces what was stored for that metric
    pub async fn fetch_sensor_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryPoint>> {
        self.store.dispatch(Action::HistoryRequest).await;
        match self.api.sensor_history(query).await {
            Ok(points) => {
                self.store
                    .dispatch(Action::HistorySuccess {
                        kind: query.kind,
                        points: points.clone(),
                    })
                    .await;
                Ok(points)
            }
            Err(e) => {
                self.fail(e, "Failed to fetch sensor history", Action::HistoryFailure)
                    .await
            }
        }
    }
}
