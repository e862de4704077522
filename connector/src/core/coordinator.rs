//! Reveal coordinator.
//!
//! A single task owns the reveal ledger and the public balance table; poll
//! tasks and in-flight decrypt futures only talk to it through channels, so
//! every state change is applied one event at a time. Decryption itself is
//! spawned off the loop: the coordinator stays responsive while a batch is
//! in flight and a handle change observed in the meantime supersedes the
//! eventual result at the data layer.

use crate::chain::balances::{BalanceEvent, BalanceSource, HandleTracker};
use crate::core::auth::AuthorizationManager;
use crate::core::session::SessionContext;
use crate::error::Result;
use crate::relayer::client::{DecryptClient, DecryptionResults};
use alloy_primitives::{Address, U256};
use shield_protocol::amount::{format_amount, format_units, FormatOptions};
use shield_protocol::{
    build_decryption_request, Plaintext, RevealLedger, RevealState, SlotKey, TrackedContract,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// Shown in place of an encrypted balance until the user reveals it.
pub const ENCRYPTED_PLACEHOLDER: &str = "✶✶✶✶✶✶✶✶";

/// Default channel size for event processing
const DEFAULT_CHANNEL_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub poll_interval: Duration,
    pub channel_size: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }
}

/// Commands the UI (and the coordinator's own spawned decrypt futures) feed
/// into the event loop.
pub enum CoordinatorCommand {
    /// User-triggered reveal. An empty slot list means every tracked slot.
    Reveal { slots: Vec<SlotKey> },
    /// Outcome of a spawned decrypt request.
    RevealSettled {
        requested: Vec<SlotKey>,
        outcome: std::result::Result<DecryptionResults, String>,
    },
    /// The connected wallet or chain changed.
    SessionChanged { session: SessionContext },
}

/// Cheap cloneable handle for driving a running coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    cmd_tx: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    /// Reveal every tracked slot that currently has something to reveal.
    pub async fn reveal_all(&self) -> Result<()> {
        self.cmd_tx
            .send(CoordinatorCommand::Reveal { slots: Vec::new() })
            .await?;
        Ok(())
    }

    pub async fn reveal(&self, slots: Vec<SlotKey>) -> Result<()> {
        self.cmd_tx
            .send(CoordinatorCommand::Reveal { slots })
            .await?;
        Ok(())
    }

    pub async fn set_session(&self, session: SessionContext) -> Result<()> {
        self.cmd_tx
            .send(CoordinatorCommand::SessionChanged { session })
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SlotView {
    pub label: &'static str,
    pub contract: Address,
    pub owner: Address,
    pub state: RevealState,
    /// Masked placeholder, or the formatted plaintext while revealed.
    pub display: String,
    pub can_reveal: bool,
}

#[derive(Debug, Clone)]
pub struct PublicBalanceView {
    pub token: Address,
    pub owner: Address,
    pub display: String,
}

/// What a portfolio view renders; published after every applied event.
#[derive(Debug, Clone, Default)]
pub struct PortfolioSnapshot {
    pub slots: Vec<SlotView>,
    pub public_balances: Vec<PublicBalanceView>,
}

/// Owns all reveal state and serializes every mutation through one loop.
pub struct RevealCoordinator<C: DecryptClient + 'static> {
    targets: Vec<TrackedContract>,
    session: SessionContext,
    source: Arc<dyn BalanceSource>,
    client: Arc<C>,
    auth: AuthorizationManager,
    options: CoordinatorOptions,
    ledger: RevealLedger,
    public_balances: HashMap<(Address, Address), U256>,
    balance_tx: mpsc::Sender<BalanceEvent>,
    balance_rx: Option<mpsc::Receiver<BalanceEvent>>,
    cmd_tx: mpsc::Sender<CoordinatorCommand>,
    cmd_rx: Option<mpsc::Receiver<CoordinatorCommand>>,
    snapshot_tx: watch::Sender<PortfolioSnapshot>,
    shutdown: Option<broadcast::Receiver<()>>,
}

impl<C: DecryptClient + 'static> RevealCoordinator<C> {
    pub fn new(
        targets: Vec<TrackedContract>,
        session: SessionContext,
        source: Arc<dyn BalanceSource>,
        client: Arc<C>,
        auth: AuthorizationManager,
        options: CoordinatorOptions,
        shutdown: broadcast::Receiver<()>,
    ) -> (
        Self,
        CoordinatorHandle,
        watch::Receiver<PortfolioSnapshot>,
    ) {
        let (balance_tx, balance_rx) = mpsc::channel(options.channel_size);
        let (cmd_tx, cmd_rx) = mpsc::channel(options.channel_size);
        let (snapshot_tx, snapshot_rx) = watch::channel(PortfolioSnapshot::default());

        let handle = CoordinatorHandle {
            cmd_tx: cmd_tx.clone(),
        };
        let coordinator = Self {
            targets,
            session,
            source,
            client,
            auth,
            options,
            ledger: RevealLedger::new(),
            public_balances: HashMap::new(),
            balance_tx,
            balance_rx: Some(balance_rx),
            cmd_tx,
            cmd_rx: Some(cmd_rx),
            snapshot_tx,
            shutdown: Some(shutdown),
        };

        // Seed the watch with the populated snapshot so the first observed
        // value already lists the tracked slots (in NoHandle state) instead of
        // the empty default; `run()` republishes the same content on start.
        coordinator.publish_snapshot();

        (coordinator, handle, snapshot_rx)
    }

    /// Run until the shutdown signal fires. Consumes the coordinator.
    pub async fn run(mut self) -> Result<()> {
        info!("Starting reveal coordinator...");

        let mut balance_rx = self
            .balance_rx
            .take()
            .expect("coordinator already started");
        let mut cmd_rx = self.cmd_rx.take().expect("coordinator already started");
        let mut shutdown = self.shutdown.take().expect("coordinator already started");

        let mut tracker = self.start_tracker();
        self.publish_snapshot();

        loop {
            tokio::select! {
                Some(event) = balance_rx.recv() => {
                    self.on_balance_event(event);
                    self.publish_snapshot();
                }
                Some(command) = cmd_rx.recv() => {
                    if let CoordinatorCommand::SessionChanged { session } = command {
                        if session.identity() != self.session.identity() {
                            info!(
                                "Session changed to chain {} owner {}, resetting cached state",
                                session.chain_id, session.owner
                            );
                            tracker.stop();
                            self.session = session;
                            self.ledger.clear();
                            self.public_balances.clear();
                            self.auth.clear();
                            tracker = self.start_tracker();
                        } else {
                            self.session = session;
                        }
                    } else {
                        self.on_command(command);
                    }
                    self.publish_snapshot();
                }
                _ = shutdown.recv() => {
                    info!("Received shutdown signal in reveal coordinator");
                    break;
                }
                else => break,
            }
        }

        tracker.stop();
        info!("Reveal coordinator stopped");
        Ok(())
    }

    fn start_tracker(&self) -> HandleTracker {
        let tracker = HandleTracker::new(
            self.source.clone(),
            self.balance_tx.clone(),
            self.options.poll_interval,
        );
        for target in &self.targets {
            tracker.track_confidential(SlotKey::new(target.contract, self.session.owner));
            if let Some(token) = target.public_token {
                tracker.track_public(token, self.session.owner);
            }
        }
        tracker
    }

    fn on_balance_event(&mut self, event: BalanceEvent) {
        match event {
            BalanceEvent::HandleObserved {
                slot,
                previous,
                current,
            } => {
                if self.ledger.observe(slot, current) && previous.is_some() {
                    debug!(
                        "Handle changed for {}, cached resolution dropped",
                        slot.contract
                    );
                }
            }
            BalanceEvent::PublicBalanceObserved {
                token,
                owner,
                amount,
            } => {
                self.public_balances.insert((token, owner), amount);
            }
        }
    }

    fn on_command(&mut self, command: CoordinatorCommand) {
        match command {
            CoordinatorCommand::Reveal { slots } => self.on_reveal(slots),
            CoordinatorCommand::RevealSettled { requested, outcome } => match outcome {
                Ok(results) => {
                    let resolved = self.ledger.apply_results(results.as_map());
                    self.ledger.settle_reveal(&requested);
                    info!(
                        "Reveal resolved {} of {} requested slots",
                        resolved,
                        requested.len()
                    );
                }
                Err(e) => {
                    warn!("Reveal failed, balances remain encrypted: {}", e);
                    self.ledger.settle_reveal(&requested);
                }
            },
            // handled in run(), where the tracker can be restarted
            CoordinatorCommand::SessionChanged { .. } => {}
        }
    }

    fn on_reveal(&mut self, slots: Vec<SlotKey>) {
        let keys: Vec<SlotKey> = if slots.is_empty() {
            self.targets
                .iter()
                .map(|t| SlotKey::new(t.contract, self.session.owner))
                .collect()
        } else {
            slots
        };

        let started = self.ledger.begin_reveal(&keys);
        if started.is_empty() {
            debug!("Reveal requested but no slot needs decryption");
            return;
        }

        let pairs = build_decryption_request(
            started
                .iter()
                .map(|(key, handle)| (key.contract, Some(*handle))),
        );
        let mut contracts: Vec<Address> = Vec::new();
        for pair in &pairs {
            if !contracts.contains(&pair.contract_address) {
                contracts.push(pair.contract_address);
            }
        }

        let requested: Vec<SlotKey> = started.iter().map(|(key, _)| *key).collect();
        let authorization = match self.auth.authorization_for(&self.session, &contracts) {
            Ok(authorization) => authorization,
            Err(e) => {
                warn!("Reveal authorization failed: {}", e);
                self.ledger.settle_reveal(&requested);
                return;
            }
        };

        info!("Requesting reveal of {} slots", requested.len());
        let client = self.client.clone();
        let cmd_tx = self.cmd_tx.clone();
        let chain_id = self.session.chain_id;
        tokio::spawn(async move {
            let outcome = client
                .user_decrypt(&pairs, &authorization, chain_id)
                .await
                .map_err(|e| e.to_string());
            let _ = cmd_tx
                .send(CoordinatorCommand::RevealSettled { requested, outcome })
                .await;
        });
    }

    fn publish_snapshot(&self) {
        let slots = self
            .targets
            .iter()
            .map(|target| {
                let key = SlotKey::new(target.contract, self.session.owner);
                SlotView {
                    label: target.label,
                    contract: target.contract,
                    owner: self.session.owner,
                    state: self.ledger.state(&key),
                    display: self.slot_display(&key, target.decimals),
                    can_reveal: self.ledger.can_reveal(&key),
                }
            })
            .collect();

        let public_balances = self
            .public_balances
            .iter()
            .map(|(&(token, owner), &amount)| {
                let decimals = self
                    .targets
                    .iter()
                    .find(|t| t.public_token == Some(token))
                    .map(|t| t.decimals)
                    .unwrap_or(6);
                PublicBalanceView {
                    token,
                    owner,
                    display: format_amount(
                        &format_units(amount, decimals),
                        FormatOptions::default(),
                    ),
                }
            })
            .collect();

        let _ = self.snapshot_tx.send(PortfolioSnapshot {
            slots,
            public_balances,
        });
    }

    fn slot_display(&self, key: &SlotKey, decimals: u8) -> String {
        match self.ledger.state(key) {
            RevealState::NoHandle => "-".to_string(),
            RevealState::Encrypted | RevealState::Revealing => ENCRYPTED_PLACEHOLDER.to_string(),
            RevealState::Revealed => match self.ledger.plaintext(key) {
                Some(Plaintext::Uint(value)) => {
                    format_amount(&format_units(*value, decimals), FormatOptions::default())
                }
                Some(Plaintext::Str(s)) => s.clone(),
                None => ENCRYPTED_PLACEHOLDER.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::InMemoryAuthorizationStore;
    use crate::core::session::SessionWallet;
    use crate::error::Result as ConnectorResult;
    use crate::relayer::client::MockDecryptClient;
    use alloy_primitives::B256;
    use async_trait::async_trait;
    use shield_protocol::CiphertextHandle;

    const TEST_CHAIN_ID: u64 = 1337;

    struct StaticSource(CiphertextHandle);

    #[async_trait]
    impl BalanceSource for StaticSource {
        async fn confidential_balance_handle(
            &self,
            _contract: Address,
            _owner: Address,
        ) -> ConnectorResult<CiphertextHandle> {
            Ok(self.0)
        }

        async fn public_balance(
            &self,
            _token: Address,
            _owner: Address,
        ) -> ConnectorResult<U256> {
            Ok(U256::ZERO)
        }
    }

    fn harness(
        client: MockDecryptClient,
    ) -> (
        CoordinatorHandle,
        watch::Receiver<PortfolioSnapshot>,
        broadcast::Sender<()>,
        tokio::task::JoinHandle<crate::error::Result<()>>,
    ) {
        let contract = Address::repeat_byte(0x11);
        let targets = vec![TrackedContract {
            label: "cUSDC",
            contract,
            public_token: None,
            decimals: 6,
        }];
        let wallet = SessionWallet::random(Some(TEST_CHAIN_ID)).unwrap();
        let session = SessionContext::new(TEST_CHAIN_ID, wallet);
        let auth = AuthorizationManager::new(
            Arc::new(InMemoryAuthorizationStore::default()),
            Address::repeat_byte(0xde),
            10,
        );
        let options = CoordinatorOptions {
            poll_interval: Duration::from_secs(1),
            channel_size: 16,
        };
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let source = Arc::new(StaticSource(CiphertextHandle::from(B256::repeat_byte(1))));
        let (coordinator, handle, snapshot_rx) = RevealCoordinator::new(
            targets,
            session,
            source,
            Arc::new(client),
            auth,
            options,
            shutdown_rx,
        );
        let task = tokio::spawn(coordinator.run());
        (handle, snapshot_rx, shutdown_tx, task)
    }

    async fn wait_for_state(
        snapshot_rx: &mut watch::Receiver<PortfolioSnapshot>,
        state: RevealState,
    ) {
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                if snapshot_rx
                    .borrow_and_update()
                    .slots
                    .first()
                    .is_some_and(|slot| slot.state == state)
                {
                    return;
                }
                snapshot_rx.changed().await.expect("snapshot channel closed");
            }
        })
        .await
        .expect("state not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_reveals_issue_a_single_decrypt_request() {
        let mut client = MockDecryptClient::new();
        client
            .expect_user_decrypt()
            .times(1)
            .returning(|pairs, _, _| {
                let results: DecryptionResults = pairs
                    .iter()
                    .map(|p| (p.handle, Plaintext::Uint(U256::from(1_000_000u64))))
                    .collect();
                Ok(results)
            });

        let (handle, mut snapshot_rx, shutdown_tx, task) = harness(client);
        wait_for_state(&mut snapshot_rx, RevealState::Encrypted).await;

        handle.reveal_all().await.unwrap();
        wait_for_state(&mut snapshot_rx, RevealState::Revealed).await;
        assert_eq!(snapshot_rx.borrow().slots[0].display, "1.00");

        // second reveal hits the already-resolved slot and must not call out
        handle.reveal_all().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(snapshot_rx.borrow().slots[0].state, RevealState::Revealed);

        let _ = shutdown_tx.send(());
        task.await.unwrap().unwrap();
    }
}
