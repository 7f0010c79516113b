//! [`Backend`] implementation over JSON-RPC

use serde::de::DeserializeOwned;
use serde_json::Value;

use proxydeck_core::prelude::*;
use proxydeck_core::{ConfigDocument, ProcessStatus};

use crate::backend::Backend;
use crate::commands::{BackendCommand, CommandSender};

/// Backend reached through a [`CommandSender`]
///
/// The sender is transport-agnostic; [`crate::client::connect`] wires it to a
/// WebSocket, tests wire it to a plain channel.
#[derive(Debug, Clone)]
pub struct RpcBackend {
    sender: CommandSender,
}

impl RpcBackend {
    pub fn new(sender: CommandSender) -> Self {
        Self { sender }
    }

    async fn call(&self, command: BackendCommand) -> Result<Value> {
        self.sender.send(command).await?.into_result()
    }

    async fn call_typed<T: DeserializeOwned>(&self, command: BackendCommand) -> Result<T> {
        let description = command.description();
        let value = self.call(command).await?;
        serde_json::from_value(value).map_err(|e| {
            Error::protocol(format!("unexpected '{}' response: {}", description, e))
        })
    }
}

impl Backend for RpcBackend {
    async fn get_process_status(&self) -> Result<ProcessStatus> {
        self.call_typed(BackendCommand::GetProcessStatus).await
    }

    async fn start_process(&self) -> Result<()> {
        self.call(BackendCommand::StartProcess).await.map(|_| ())
    }

    async fn stop_process(&self) -> Result<()> {
        self.call(BackendCommand::StopProcess).await.map(|_| ())
    }

    async fn get_config_document(&self) -> Result<ConfigDocument> {
        self.call_typed(BackendCommand::GetConfigDocument).await
    }

    async fn set_config_document(&self, document: &ConfigDocument) -> Result<()> {
        let command = BackendCommand::set_config(document)?;
        self.call(command).await.map(|_| ())
    }

    async fn install_certificate(&self) -> Result<bool> {
        match self.call(BackendCommand::InstallCertificate).await? {
            Value::Bool(installed) => Ok(installed),
            Value::Null => Ok(false),
            other => Err(Error::protocol(format!(
                "unexpected 'install certificate' response: {}",
                other
            ))),
        }
    }
}
