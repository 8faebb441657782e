//! Manual device control with live-first delivery

use chrono::Utc;
use tracing::debug;

use super::PetCare;
use crate::api::ApiClient;
use crate::error::Result;
use crate::live::CommandChannel;
use crate::store::Action;
use crate::types::{DeviceCommand, LastCommand};

/// Transport that carried a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    Live,
    Rest,
}

impl std::fmt::Display for DeliveryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryPath::Live => write!(f, "live channel"),
            DeliveryPath::Rest => write!(f, "REST"),
        }
    }
}

/// Send over the live channel, falling back to REST only if that send fails
///
/// At most one attempt per path. There is no receipt confirmation and no
/// deduplication.
pub async fn dual_dispatch(
    live: &dyn CommandChannel,
    api: &ApiClient,
    command: &DeviceCommand,
) -> Result<DeliveryPath> {
    if live.try_send(command).await {
        debug!("{} sent over live channel", command.event_name());
        return Ok(DeliveryPath::Live);
    }
    debug!("{} falling back to REST", command.event_name());
    api.send_command(command).await?;
    Ok(DeliveryPath::Rest)
}

impl PetCare {
    pub async fn send_command(&self, command: DeviceCommand) -> Result<DeliveryPath> {
        self.store.dispatch(Action::CommandRequest).await;
        match dual_dispatch(&self.live, &self.api, &command).await {
            Ok(path) => {
                let last = LastCommand {
                    command,
                    timestamp: Utc::now(),
                };
                self.store.dispatch(Action::CommandSuccess(last)).await;
                Ok(path)
            }
            Err(e) => {
                self.fail(e, command.failure_message(), Action::CommandFailure)
                    .await
            }
        }
    }

    pub async fn dispense_food(&self, amount: u8) -> Result<DeliveryPath> {
        self.send_command(DeviceCommand::DispenseFood { amount }).await
    }

    pub async fn dispense_water(&self, amount: u8) -> Result<DeliveryPath> {
        self.send_command(DeviceCommand::DispenseWater { amount })
            .await
    }

    pub async fn set_temperature(&self, temperature: f64) -> Result<DeliveryPath> {
        self.send_command(DeviceCommand::SetTemperature { temperature })
            .await
    }
}
