//! Action handler: authenticates callers, runs table transitions inside a
//! store transaction and announces changes.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

use super::{config::TableConfig, messages::TableView};
use crate::{
    bot::{BotRegistry, choose_action},
    db::{Committed, TableStore},
    device::{CardSubmission, DeviceIdentity, DeviceVerifier, PhysicalDevice},
    errors::{DeviceRejection, TableError, TableResult},
    events::{ChangeNotifier, ChangeSignal, EventDelta},
    game::{
        blinds::{BlindState, compute_blind_state},
        entities::{Card, EventId, Identity, Table, TableId},
        evaluator::{HandEvaluator, StandardEvaluator},
        state_machine::{Actor, TableAction, TransitionContext, apply},
    },
};

/// Entry point for every table operation.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct TableManager {
    store: Arc<dyn TableStore>,
    notifier: Arc<dyn ChangeNotifier>,
    evaluator: Arc<dyn HandEvaluator>,
    bots: BotRegistry,
    verifier: DeviceVerifier,
}

impl TableManager {
    /// Create a table manager with the standard evaluator, the default bot
    /// registry and a 30 second device freshness window.
    ///
    /// # Arguments
    ///
    /// * `store` - Table persistence
    /// * `notifier` - Receives a change signal after every committed action
    pub fn new(store: Arc<dyn TableStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            store,
            notifier,
            evaluator: Arc::new(StandardEvaluator),
            bots: BotRegistry::default(),
            verifier: DeviceVerifier::default(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn HandEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_bots(mut self, bots: BotRegistry) -> Self {
        self.bots = bots;
        self
    }

    pub fn with_verifier(mut self, verifier: DeviceVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    pub fn bots(&self) -> &BotRegistry {
        &self.bots
    }

    /// Provision a table with one empty seat per seat number.
    pub async fn create_table(&self, config: &TableConfig) -> TableResult<Table> {
        let table = self.store.create_table(config).await?;
        info!(
            "Created table {} ({}) with {} seats",
            table.id, table.name, table.seat_count
        );
        Ok(table)
    }

    /// Apply a session-authenticated action.
    ///
    /// # Arguments
    ///
    /// * `table_id` - Target table
    /// * `identity` - Verified session subject
    /// * `action` - Requested action
    ///
    /// # Returns
    ///
    /// * `TableResult<TableView>` - The committed state as `identity` sees it
    pub async fn perform_action(
        &self,
        table_id: TableId,
        identity: &Identity,
        action: &TableAction,
    ) -> TableResult<TableView> {
        let now = Utc::now();
        let actor = Actor::User(identity.clone());
        let committed = self.execute(table_id, &actor, action, now).await?;
        Ok(TableView::for_viewer(
            &committed.snapshot,
            Some(identity),
            &self.bots,
            now,
        ))
    }

    /// Authenticate a scanner submission and deal the decoded card.
    pub async fn submit_card(&self, submission: &CardSubmission) -> TableResult<Card> {
        self.submit_card_at(submission, Utc::now()).await
    }

    /// [`submit_card`](Self::submit_card) against an explicit clock.
    ///
    /// Checks run in order and stop at the first failure: barcode,
    /// timestamp freshness, device lookup, signature. The device's own
    /// table is the one dealt to.
    pub async fn submit_card_at(
        &self,
        submission: &CardSubmission,
        now: DateTime<Utc>,
    ) -> TableResult<Card> {
        let result = self.authenticate_scan(submission, now).await?;
        let (card, device) = match result {
            Ok(ok) => ok,
            Err(rejection) => {
                warn!(
                    "Rejected scan from device {}: {}",
                    submission.serial,
                    rejection.code()
                );
                return Err(rejection.into());
            }
        };

        self.store.touch_device(&device.serial, now).await?;

        let actor = Actor::Device(device.serial.clone());
        let action = TableAction::DealCard { card };
        self.execute(device.table_id, &actor, &action, now).await?;
        debug!("Device {} dealt {} at table {}", device.serial, card, device.table_id);
        Ok(card)
    }

    /// Store failures come back as the outer error; the inner one is a
    /// rejection of the submission itself.
    async fn authenticate_scan(
        &self,
        submission: &CardSubmission,
        now: DateTime<Utc>,
    ) -> TableResult<Result<(Card, PhysicalDevice), DeviceRejection>> {
        let card = match self.verifier.precheck(submission, now) {
            Ok(card) => card,
            Err(rejection) => return Ok(Err(rejection)),
        };
        let Some(device) = self.store.find_device(&submission.serial).await? else {
            return Ok(Err(DeviceRejection::UnknownDevice));
        };
        let verified = self
            .verifier
            .scanner_key(Some(&device))
            .and_then(|key| self.verifier.verify_signature(&key, submission));
        Ok(verified.map(|()| (card, device)))
    }

    /// Unauthenticated device bootstrap: who am I and where do I sit.
    /// Doubles as the heartbeat.
    pub async fn identify_device(&self, serial: &str) -> TableResult<DeviceIdentity> {
        let device = self
            .store
            .find_device(serial)
            .await?
            .ok_or_else(|| TableError::NotFound(format!("Device {serial}")))?;
        self.store.touch_device(serial, Utc::now()).await?;
        Ok(DeviceIdentity::from(&device))
    }

    pub async fn register_device(&self, device: &PhysicalDevice) -> TableResult<()> {
        self.store.upsert_device(device).await?;
        info!(
            "Registered {} device {} at table {}",
            device.device_type, device.serial, device.table_id
        );
        Ok(())
    }

    pub async fn table_devices(&self, table_id: TableId) -> TableResult<Vec<PhysicalDevice>> {
        self.store.find_table_devices(table_id).await
    }

    /// Events after `after_id`, oldest first, with the cursor to store next.
    pub async fn fetch_delta(
        &self,
        table_id: TableId,
        after_id: Option<EventId>,
    ) -> TableResult<EventDelta> {
        let events = self.store.fetch_events(table_id, after_id).await?;
        Ok(EventDelta::new(table_id, after_id, events))
    }

    pub async fn blind_state(&self, table_id: TableId) -> TableResult<BlindState> {
        let snapshot = self.store.load(table_id).await?;
        Ok(compute_blind_state(&snapshot.table, Utc::now()))
    }

    pub async fn table_view(
        &self,
        table_id: TableId,
        viewer: Option<&Identity>,
    ) -> TableResult<TableView> {
        let snapshot = self.store.load(table_id).await?;
        Ok(TableView::for_viewer(&snapshot, viewer, &self.bots, Utc::now()))
    }

    /// Plays the turn of the bot holding the assigned seat, if any.
    ///
    /// Returns `None` without writing anything when betting is closed or a
    /// human holds the turn.
    pub async fn run_bot_turn(&self, table_id: TableId) -> TableResult<Option<TableView>> {
        let now = Utc::now();
        let ctx = self.context(now);
        let mut acted: Option<(Identity, &'static str)> = None;

        let committed = self
            .store
            .transact(table_id, now, &mut |snapshot| {
                let Some((identity, action)) = choose_action(snapshot, &self.bots) else {
                    return Ok(Vec::new());
                };
                let events = apply(snapshot, &Actor::User(identity.clone()), &action, &ctx)?;
                acted = Some((identity, action.name()));
                Ok(events)
            })
            .await?;

        if committed.events.is_empty() {
            return Ok(None);
        }
        if let Some((identity, action)) = acted {
            debug!("Bot {identity} played {action} at table {table_id}");
        }
        self.announce(table_id, now);
        Ok(Some(TableView::for_viewer(
            &committed.snapshot,
            None,
            &self.bots,
            now,
        )))
    }

    pub async fn health_check(&self) -> TableResult<()> {
        self.store.health_check().await
    }

    fn context(&self, now: DateTime<Utc>) -> TransitionContext<'_> {
        TransitionContext {
            now,
            evaluator: self.evaluator.as_ref(),
            bots: &self.bots,
        }
    }

    async fn execute(
        &self,
        table_id: TableId,
        actor: &Actor,
        action: &TableAction,
        now: DateTime<Utc>,
    ) -> TableResult<Committed> {
        let ctx = self.context(now);
        let committed = self
            .store
            .transact(table_id, now, &mut |snapshot| {
                apply(snapshot, actor, action, &ctx)
            })
            .await
            .inspect_err(|e| {
                debug!("{} rejected at table {table_id}: {e}", action.name());
            })?;

        info!(
            "Table {table_id}: {} -> {} ({} events)",
            action.name(),
            committed.snapshot.phase(),
            committed.events.len()
        );
        if !committed.events.is_empty() {
            self.announce(table_id, now);
        }
        Ok(committed)
    }

    fn announce(&self, table_id: TableId, timestamp: DateTime<Utc>) {
        self.notifier.notify(ChangeSignal {
            table_id,
            timestamp,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryTableStore,
        device::{DeviceType, encode_barcode, encode_public_key, sign_submission},
        events::EventAction,
        game::entities::Phase,
    };
    use ed25519_dalek::SigningKey;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        signals: Mutex<Vec<ChangeSignal>>,
    }

    impl ChangeNotifier for RecordingNotifier {
        fn notify(&self, signal: ChangeSignal) {
            self.signals.lock().unwrap().push(signal);
        }
    }

    async fn setup() -> (TableManager, Arc<RecordingNotifier>, TableId) {
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = TableManager::new(Arc::new(MemoryTableStore::new()), notifier.clone());
        let table = manager.create_table(&TableConfig::default()).await.unwrap();
        (manager, notifier, table.id)
    }

    #[tokio::test]
    async fn test_rejected_action_writes_and_announces_nothing() {
        let (manager, notifier, table_id) = setup().await;
        let result = manager
            .perform_action(table_id, &Identity::from("alice"), &TableAction::StartGame)
            .await;
        assert!(matches!(result, Err(TableError::Unauthorized(_))));
        assert!(notifier.signals.lock().unwrap().is_empty());
        assert!(manager.fetch_delta(table_id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_action_announces_once() {
        let (manager, notifier, table_id) = setup().await;
        let view = manager
            .perform_action(
                table_id,
                &Identity::from("alice"),
                &TableAction::JoinSeat { seat_number: 2 },
            )
            .await
            .unwrap();
        assert_eq!(view.viewer_seat, Some(2));

        let signals = notifier.signals.lock().unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].table_id, table_id);
    }

    #[tokio::test]
    async fn test_bot_turn_is_noop_without_bot() {
        let (manager, notifier, table_id) = setup().await;
        assert!(manager.run_bot_turn(table_id).await.unwrap().is_none());
        assert!(notifier.signals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identify_unknown_device() {
        let (manager, _, _) = setup().await;
        assert!(matches!(
            manager.identify_device("nope").await,
            Err(TableError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_scan_deals_to_device_table() {
        let (manager, notifier, table_id) = setup().await;
        let dealer = Identity::from("dealer");
        for (n, name) in ["alice", "bob"].into_iter().enumerate() {
            manager
                .perform_action(
                    table_id,
                    &Identity::from(name),
                    &TableAction::JoinSeat {
                        seat_number: n as u8,
                    },
                )
                .await
                .unwrap();
        }
        manager
            .perform_action(table_id, &dealer, &TableAction::StartGame)
            .await
            .unwrap();

        let key = SigningKey::from_bytes(&[3u8; 32]);
        manager
            .register_device(&PhysicalDevice {
                serial: "SCN-1".to_string(),
                device_type: DeviceType::Scanner,
                table_id,
                seat_number: None,
                public_key: Some(encode_public_key(&key.verifying_key())),
                last_seen_at: None,
            })
            .await
            .unwrap();

        let now = Utc::now();
        let card: Card = "Qh".parse().unwrap();
        let barcode = encode_barcode(card);
        let timestamp = now.timestamp().to_string();
        let submission = CardSubmission {
            serial: "SCN-1".to_string(),
            signature: sign_submission(&key, "SCN-1", &barcode, &timestamp),
            barcode,
            timestamp,
        };
        assert_eq!(manager.submit_card_at(&submission, now).await.unwrap(), card);

        let view = manager.table_view(table_id, Some(&dealer)).await.unwrap();
        assert_eq!(view.phase, Phase::DealHoleCards);
        assert_eq!(view.seats.iter().map(|s| s.card_count).sum::<usize>(), 1);

        let delta = manager.fetch_delta(table_id, None).await.unwrap();
        assert!(matches!(
            delta.events.last().unwrap().payload.action,
            EventAction::HoleCardDealt { .. }
        ));
        assert_eq!(notifier.signals.lock().unwrap().len(), 4);

        let device = manager.store().find_device("SCN-1").await.unwrap().unwrap();
        assert_eq!(device.last_seen_at, Some(now));
    }
}
