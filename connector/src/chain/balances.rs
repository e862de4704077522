//! Balance polling.
//!
//! One poll task per tracked slot, each on its own timer. A fetch failure
//! never surfaces to the user: the last-known value simply stays in place
//! until the next successful tick. Only changes are forwarded, so the
//! coordinator sees one event per first observation and one per handle
//! change.

use crate::chain::contracts::{IConfidentialToken, IERC20};
use crate::error::{Error, Result};
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use async_trait::async_trait;
use shield_protocol::{CiphertextHandle, SlotKey};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// Observations the poll tasks feed into the coordinator.
#[derive(Debug, Clone)]
pub enum BalanceEvent {
    /// The ciphertext handle for a slot was seen for the first time or
    /// changed, i.e. the encrypted balance moved on chain.
    HandleObserved {
        slot: SlotKey,
        previous: Option<CiphertextHandle>,
        current: CiphertextHandle,
    },
    /// A public ERC-20 balance was seen for the first time or changed.
    PublicBalanceObserved {
        token: Address,
        owner: Address,
        amount: U256,
    },
}

/// Read-only chain data the tracker polls.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn confidential_balance_handle(
        &self,
        contract: Address,
        owner: Address,
    ) -> Result<CiphertextHandle>;

    async fn public_balance(&self, token: Address, owner: Address) -> Result<U256>;
}

/// `BalanceSource` backed by contract calls through an RPC provider.
pub struct ChainBalanceSource<P: Provider + Clone> {
    provider: Arc<P>,
}

impl<P: Provider + Clone> ChainBalanceSource<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider + Clone + 'static> BalanceSource for ChainBalanceSource<P> {
    async fn confidential_balance_handle(
        &self,
        contract: Address,
        owner: Address,
    ) -> Result<CiphertextHandle> {
        let token = IConfidentialToken::new(contract, self.provider.clone());
        let handle = token
            .confidentialBalanceOf(owner)
            .call()
            .await
            .map_err(|e| Error::Contract(e.to_string()))?;
        Ok(CiphertextHandle::from(handle))
    }

    async fn public_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let erc20 = IERC20::new(token, self.provider.clone());
        erc20
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| Error::Contract(e.to_string()))
    }
}

/// Spawns and owns the periodic poll tasks.
pub struct HandleTracker {
    source: Arc<dyn BalanceSource>,
    event_tx: mpsc::Sender<BalanceEvent>,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl HandleTracker {
    pub fn new(
        source: Arc<dyn BalanceSource>,
        event_tx: mpsc::Sender<BalanceEvent>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            event_tx,
            poll_interval,
            running: Arc::new(AtomicBool::new(true)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Poll the confidential balance handle of one slot.
    pub fn track_confidential(&self, slot: SlotKey) {
        let source = self.source.clone();
        let event_tx = self.event_tx.clone();
        let poll_interval = self.poll_interval;
        let running = self.running.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            let mut last: Option<CiphertextHandle> = None;

            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                match source
                    .confidential_balance_handle(slot.contract, slot.owner)
                    .await
                {
                    Ok(current) => {
                        if last != Some(current) {
                            let event = BalanceEvent::HandleObserved {
                                slot,
                                previous: last,
                                current,
                            };
                            last = Some(current);
                            if event_tx.send(event).await.is_err() {
                                debug!("Event channel closed, stopping handle poll");
                                break;
                            }
                        }
                    }
                    Err(e) => debug!(
                        "Handle poll failed for {} (keeping last known value): {}",
                        slot.contract, e
                    ),
                }
            }
        });

        self.store_task(handle);
    }

    /// Poll the public ERC-20 balance of one (token, owner) pair.
    pub fn track_public(&self, token: Address, owner: Address) {
        let source = self.source.clone();
        let event_tx = self.event_tx.clone();
        let poll_interval = self.poll_interval;
        let running = self.running.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            let mut last: Option<U256> = None;

            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                match source.public_balance(token, owner).await {
                    Ok(amount) => {
                        if last != Some(amount) {
                            last = Some(amount);
                            let event = BalanceEvent::PublicBalanceObserved {
                                token,
                                owner,
                                amount,
                            };
                            if event_tx.send(event).await.is_err() {
                                debug!("Event channel closed, stopping balance poll");
                                break;
                            }
                        }
                    }
                    Err(e) => debug!(
                        "Balance poll failed for {} (keeping last known value): {}",
                        token, e
                    ),
                }
            }
        });

        self.store_task(handle);
    }

    /// Stop all poll tasks.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let tasks = {
            if let Ok(mut tasks) = self.tasks.lock() {
                tasks.drain(..).collect::<Vec<_>>()
            } else {
                return;
            }
        };

        // Poll tasks only read chain state, aborting mid-await is safe.
        for task in tasks {
            task.abort();
        }
        debug!("Balance poll tasks stopped");
    }

    fn store_task(&self, handle: JoinHandle<()>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(handle);
        }
    }
}

impl Drop for HandleTracker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Ok(tasks) = self.tasks.lock() {
            for task in tasks.iter() {
                task.abort();
            }
        }
    }
}
