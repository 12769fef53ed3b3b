//! Camera stream commands and their delivery.

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamAction {
    Start,
    Stop,
}

/// Tells one camera device to start or stop streaming.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StreamCommand {
    pub serial: String,
    pub action: StreamAction,
}

pub trait CameraSignaler: Send + Sync {
    fn signal(&self, command: StreamCommand);
}

/// Fans commands out to connected device sessions, each of which keeps
/// only the commands addressed to its own serial.
#[derive(Clone, Debug)]
pub struct BroadcastSignaler {
    sender: broadcast::Sender<StreamCommand>,
}

impl BroadcastSignaler {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamCommand> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastSignaler {
    fn default() -> Self {
        Self::new(64)
    }
}

impl CameraSignaler for BroadcastSignaler {
    fn signal(&self, command: StreamCommand) {
        if self.sender.send(command.clone()).is_err() {
            debug!("No device connected for stream command to {}", command.serial);
        }
    }
}
