//! Device control endpoints

use super::ApiClient;
use crate::error::Result;
use crate::http::Method;
use crate::types::DeviceCommand;

impl ApiClient {
    /// Deliver a control command over REST
    pub async fn send_command(&self, command: &DeviceCommand) -> Result<()> {
        self.request(
            Method::Post,
            command.endpoint(),
            &[],
            Some(command.payload()),
        )
        .await?;
        Ok(())
    }
}
