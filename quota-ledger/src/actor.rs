//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns the [`QuotaLedger`]; callers never touch it directly
//! - Each request is validated and committed before the next is dequeued
//! - Bounded mailbox gives backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          Callers (any number of tasks)                │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │      sender identity + command → actor mailbox        │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   clock.now() → CallContext → QuotaLedger::execute    │
//! │   metrics.record_command()  → oneshot reply           │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::command::{CommandOutput, LedgerCommand};
use crate::context::{CallContext, Clock};
use crate::error::TxResult;
use crate::journal::LedgerEvent;
use crate::metrics::Metrics;
use crate::state::LedgerState;
use crate::types::{AccountId, MintRequest, QuotaId, QuotaTerms, QuotaUsage};
use crate::{Error, QuotaLedger, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Run a mutating command on behalf of `sender`
    Execute {
        sender: AccountId,
        command: LedgerCommand,
        response: oneshot::Sender<TxResult<CommandOutput>>,
    },

    /// Get owner
    GetOwner {
        quota_id: QuotaId,
        response: oneshot::Sender<Option<AccountId>>,
    },

    /// Get terms
    GetTerms {
        quota_id: QuotaId,
        response: oneshot::Sender<Option<QuotaTerms>>,
    },

    /// Get usage
    GetUsage {
        quota_id: QuotaId,
        response: oneshot::Sender<Option<QuotaUsage>>,
    },

    /// Peek the next id
    PeekNextId {
        response: oneshot::Sender<QuotaId>,
    },

    /// Expiry check at the current clock value
    IsExpired {
        quota_id: QuotaId,
        response: oneshot::Sender<TxResult<bool>>,
    },

    /// Copy of the full state
    Snapshot {
        response: oneshot::Sender<LedgerState>,
    },

    /// Journal events from `from_sequence` (1-based) onwards
    Events {
        from_sequence: u64,
        response: oneshot::Sender<Vec<LedgerEvent>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the ledger
pub struct LedgerActor {
    /// The engine
    ledger: QuotaLedger,

    /// Time source, read once per request
    clock: Arc<dyn Clock>,

    /// Metrics sink
    metrics: Option<Metrics>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        ledger: QuotaLedger,
        clock: Arc<dyn Clock>,
        metrics: Option<Metrics>,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            ledger,
            clock,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop, returning the ledger when it stops
    pub async fn run(mut self) -> QuotaLedger {
        if let Some(metrics) = &self.metrics {
            metrics.observe_state(self.ledger.state());
        }

        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown = msg {
                tracing::info!(
                    events = self.ledger.events().len(),
                    "Ledger actor shutting down"
                );
                break;
            }
            self.handle_message(msg);
        }

        self.ledger
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Execute {
                sender,
                command,
                response,
            } => {
                let ctx = CallContext::capture(&sender, self.clock.as_ref());
                let operation = command.name();
                let result = self.ledger.execute(&ctx, command);

                if let Some(metrics) = &self.metrics {
                    metrics.record_command(operation, &result);
                    metrics.observe_state(self.ledger.state());
                }
                if response.send(result).is_err() {
                    tracing::warn!(operation, "Caller dropped before reply");
                }
            }

            LedgerMessage::GetOwner { quota_id, response } => {
                let _ = response.send(self.ledger.get_owner(quota_id).cloned());
            }

            LedgerMessage::GetTerms { quota_id, response } => {
                let _ = response.send(self.ledger.get_terms(quota_id).cloned());
            }

            LedgerMessage::GetUsage { quota_id, response } => {
                let _ = response.send(self.ledger.get_usage(quota_id).copied());
            }

            LedgerMessage::PeekNextId { response } => {
                let _ = response.send(self.ledger.peek_next_id());
            }

            LedgerMessage::IsExpired { quota_id, response } => {
                let _ = response.send(self.ledger.is_expired(quota_id, self.clock.now()));
            }

            LedgerMessage::Snapshot { response } => {
                let _ = response.send(self.ledger.state().clone());
            }

            LedgerMessage::Events {
                from_sequence,
                response,
            } => {
                let skip = from_sequence.saturating_sub(1) as usize;
                let events = self.ledger.events().iter().skip(skip).cloned().collect();
                let _ = response.send(events);
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Run any command as `sender`
    pub async fn execute(
        &self,
        sender: AccountId,
        command: LedgerCommand,
    ) -> Result<CommandOutput> {
        let result = self
            .request(|response| LedgerMessage::Execute {
                sender,
                command,
                response,
            })
            .await?;
        Ok(result?)
    }

    async fn execute_done(&self, sender: AccountId, command: LedgerCommand) -> Result<()> {
        self.execute(sender, command).await.map(|_| ())
    }

    async fn execute_issue(&self, sender: AccountId, command: LedgerCommand) -> Result<QuotaId> {
        match self.execute(sender, command).await? {
            CommandOutput::Issued(id) => Ok(id),
            CommandOutput::Done => Err(Error::Other("command did not issue a quota".to_string())),
        }
    }

    /// Replace the admin
    pub async fn set_admin(&self, sender: AccountId, new_admin: AccountId) -> Result<()> {
        self.execute_done(sender, LedgerCommand::SetAdmin { new_admin })
            .await
    }

    /// Replace the oracle
    pub async fn set_oracle(&self, sender: AccountId, new_oracle: AccountId) -> Result<()> {
        self.execute_done(sender, LedgerCommand::SetOracle { new_oracle })
            .await
    }

    /// Freeze transfers
    pub async fn freeze_all(&self, sender: AccountId) -> Result<()> {
        self.execute_done(sender, LedgerCommand::FreezeAll).await
    }

    /// Unfreeze transfers
    pub async fn unfreeze_all(&self, sender: AccountId) -> Result<()> {
        self.execute_done(sender, LedgerCommand::UnfreezeAll).await
    }

    /// Mint a quota
    pub async fn mint(&self, sender: AccountId, request: MintRequest) -> Result<QuotaId> {
        self.execute_issue(sender, LedgerCommand::Mint(request)).await
    }

    /// Transfer a quota
    pub async fn transfer(
        &self,
        sender: AccountId,
        quota_id: QuotaId,
        new_owner: AccountId,
    ) -> Result<()> {
        self.execute_done(
            sender,
            LedgerCommand::Transfer {
                quota_id,
                new_owner,
            },
        )
        .await
    }

    /// Burn from a quota
    pub async fn burn(&self, sender: AccountId, quota_id: QuotaId, amount: u64) -> Result<()> {
        self.execute_done(sender, LedgerCommand::Burn { quota_id, amount })
            .await
    }

    /// Report usage against a quota
    pub async fn report_usage(
        &self,
        sender: AccountId,
        quota_id: QuotaId,
        used_delta: u64,
    ) -> Result<()> {
        self.execute_done(
            sender,
            LedgerCommand::ReportUsage {
                quota_id,
                used_delta,
            },
        )
        .await
    }

    /// Lock a quota
    pub async fn lock(&self, sender: AccountId, quota_id: QuotaId) -> Result<()> {
        self.execute_done(sender, LedgerCommand::Lock { quota_id })
            .await
    }

    /// Unlock a quota
    pub async fn unlock(&self, sender: AccountId, quota_id: QuotaId) -> Result<()> {
        self.execute_done(sender, LedgerCommand::Unlock { quota_id })
            .await
    }

    /// Split a quota
    pub async fn split(
        &self,
        sender: AccountId,
        quota_id: QuotaId,
        amount: u64,
        recipient: AccountId,
    ) -> Result<QuotaId> {
        self.execute_issue(
            sender,
            LedgerCommand::Split {
                quota_id,
                amount,
                recipient,
            },
        )
        .await
    }

    /// Get owner
    pub async fn get_owner(&self, quota_id: QuotaId) -> Result<Option<AccountId>> {
        self.request(|response| LedgerMessage::GetOwner { quota_id, response })
            .await
    }

    /// Get terms
    pub async fn get_terms(&self, quota_id: QuotaId) -> Result<Option<QuotaTerms>> {
        self.request(|response| LedgerMessage::GetTerms { quota_id, response })
            .await
    }

    /// Get usage
    pub async fn get_usage(&self, quota_id: QuotaId) -> Result<Option<QuotaUsage>> {
        self.request(|response| LedgerMessage::GetUsage { quota_id, response })
            .await
    }

    /// Peek the next id
    pub async fn peek_next_id(&self) -> Result<QuotaId> {
        self.request(|response| LedgerMessage::PeekNextId { response })
            .await
    }

    /// Whether a quota is expired at the current clock value
    pub async fn is_expired(&self, quota_id: QuotaId) -> Result<bool> {
        let result: TxResult<bool> = self
            .request(|response| LedgerMessage::IsExpired { quota_id, response })
            .await?;
        Ok(result?)
    }

    /// Copy of the full state
    pub async fn snapshot(&self) -> Result<LedgerState> {
        self.request(|response| LedgerMessage::Snapshot { response })
            .await
    }

    /// Journal events from `from_sequence` (1-based) onwards
    pub async fn events(&self, from_sequence: u64) -> Result<Vec<LedgerEvent>> {
        self.request(|response| LedgerMessage::Events {
            from_sequence,
            response,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
///
/// The returned join handle yields the ledger once the actor stops.
pub fn spawn_ledger_actor(
    ledger: QuotaLedger,
    clock: Arc<dyn Clock>,
    metrics: Option<Metrics>,
    mailbox_capacity: usize,
) -> (LedgerHandle, tokio::task::JoinHandle<QuotaLedger>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
    let actor = LedgerActor::new(ledger, clock, metrics, rx);

    let join = tokio::spawn(actor.run());

    (LedgerHandle::new(tx), join)
}
