//! Live video glue.
//!
//! The conferencing service reports who entered or left a table's room.
//! Those reports become start/stop commands for the table's cameras: the
//! dealer camera follows the dealer, each seat camera follows whoever
//! occupies that seat, and a finished room stops every camera.

pub mod errors;
pub mod signaler;
pub mod webhook;

use log::info;
use std::sync::Arc;

pub use errors::{WebhookError, WebhookResult};
pub use signaler::{BroadcastSignaler, CameraSignaler, StreamAction, StreamCommand};
pub use webhook::{
    DEFAULT_WEBHOOK_LEEWAY_SECS, VideoEvent, VideoEventKind, VideoWebhookVerifier, WebhookClaims,
    body_digest, parse_event, room_for_table, table_for_room,
};

use crate::{
    device::{DeviceType, PhysicalDevice},
    game::state_machine::TableSnapshot,
    table::TableManager,
};

/// Which cameras an event should switch, given the table's current rows.
#[must_use]
pub fn plan_commands(
    event: &VideoEvent,
    snapshot: &TableSnapshot,
    devices: &[PhysicalDevice],
) -> Vec<StreamCommand> {
    let action = match event.kind {
        VideoEventKind::ParticipantJoined => StreamAction::Start,
        VideoEventKind::ParticipantLeft | VideoEventKind::RoomFinished => StreamAction::Stop,
    };

    let targets: Vec<&PhysicalDevice> = match (event.kind, event.participant.as_ref()) {
        (VideoEventKind::RoomFinished, _) => devices
            .iter()
            .filter(|d| matches!(d.device_type, DeviceType::Dealer | DeviceType::Card))
            .collect(),
        (_, Some(identity)) if snapshot.table.is_dealer(identity) => devices
            .iter()
            .filter(|d| d.device_type == DeviceType::Dealer)
            .collect(),
        (_, Some(identity)) => match snapshot.seat_of(identity) {
            Some(seat) => devices
                .iter()
                .filter(|d| {
                    d.device_type == DeviceType::Card && d.seat_number == Some(seat.seat_number)
                })
                .collect(),
            None => Vec::new(),
        },
        (_, None) => Vec::new(),
    };

    targets
        .into_iter()
        .map(|device| StreamCommand {
            serial: device.serial.clone(),
            action,
        })
        .collect()
}

/// Verifies conferencing webhooks and dispatches the camera commands they
/// imply.
#[derive(Clone)]
pub struct VideoBridge {
    manager: TableManager,
    verifier: VideoWebhookVerifier,
    signaler: Arc<dyn CameraSignaler>,
}

impl VideoBridge {
    pub fn new(
        manager: TableManager,
        verifier: VideoWebhookVerifier,
        signaler: Arc<dyn CameraSignaler>,
    ) -> Self {
        Self {
            manager,
            verifier,
            signaler,
        }
    }

    /// Returns the commands that were sent.
    pub async fn handle_webhook(
        &self,
        authorization: Option<&str>,
        body: &[u8],
    ) -> WebhookResult<Vec<StreamCommand>> {
        self.verifier.verify(authorization, body)?;
        let Some(event) = parse_event(body)? else {
            return Ok(Vec::new());
        };

        let snapshot = self.manager.store().load(event.table_id).await?;
        let devices = self.manager.table_devices(event.table_id).await?;
        let commands = plan_commands(&event, &snapshot, &devices);

        for command in &commands {
            info!(
                "Table {}: {:?} camera {}",
                event.table_id, command.action, command.serial
            );
            self.signaler.signal(command.clone());
        }
        Ok(commands)
    }
}
