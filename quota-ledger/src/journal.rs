//! Hash-chained journal of committed transitions
//!
//! Every successful mutation appends exactly one [`LedgerEvent`]; rejected
//! operations append nothing. Each event commits to its predecessor through
//! a SHA-256 hash, so any edit to history breaks [`Journal::verify`].
//!
//! # Hashing
//!
//! ```text
//! hash = SHA256(previous_hash || sequence || height || sender || kind)
//! ```
//!
//! Integers are big-endian, strings are length-prefixed, and the kind is
//! tagged with its [`EventType`] discriminant.

use crate::command::LedgerCommand;
use crate::types::{AccountId, Height, MintRequest, QuotaId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash of the (nonexistent) event before the first one
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

/// Event type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventType {
    /// Admin replaced
    AdminChanged = 1,
    /// Oracle replaced
    OracleChanged = 2,
    /// Freeze switched on
    Frozen = 3,
    /// Freeze switched off
    Unfrozen = 4,
    /// Quota issued
    Minted = 5,
    /// Ownership moved
    Transferred = 6,
    /// Amount burned
    Burned = 7,
    /// Oracle usage recorded
    UsageReported = 8,
    /// Advisory lock set
    Locked = 9,
    /// Advisory lock cleared
    Unlocked = 10,
    /// Quota split
    Split = 11,
}

/// A committed transition, including values the engine assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Admin replaced
    AdminChanged {
        /// New admin
        new_admin: AccountId,
    },
    /// Oracle replaced
    OracleChanged {
        /// New oracle
        new_oracle: AccountId,
    },
    /// Freeze switched on
    Frozen,
    /// Freeze switched off
    Unfrozen,
    /// Quota issued
    Minted {
        /// Assigned id
        quota_id: QuotaId,
        /// Accepted request
        request: MintRequest,
    },
    /// Ownership moved
    Transferred {
        /// Quota moved
        quota_id: QuotaId,
        /// Previous owner
        from: AccountId,
        /// New owner
        to: AccountId,
    },
    /// Amount burned
    Burned {
        /// Quota burned from
        quota_id: QuotaId,
        /// Quantity burned
        amount: u64,
    },
    /// Oracle usage recorded
    UsageReported {
        /// Quota consumed against
        quota_id: QuotaId,
        /// Quantity consumed
        used_delta: u64,
    },
    /// Advisory lock set
    Locked {
        /// Quota locked
        quota_id: QuotaId,
    },
    /// Advisory lock cleared
    Unlocked {
        /// Quota unlocked
        quota_id: QuotaId,
    },
    /// Quota split
    Split {
        /// Source quota
        source: QuotaId,
        /// Assigned id of the new quota
        quota_id: QuotaId,
        /// Quantity moved
        amount: u64,
        /// Owner of the new quota
        recipient: AccountId,
    },
}

impl EventKind {
    /// Type tag
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::AdminChanged { .. } => EventType::AdminChanged,
            EventKind::OracleChanged { .. } => EventType::OracleChanged,
            EventKind::Frozen => EventType::Frozen,
            EventKind::Unfrozen => EventType::Unfrozen,
            EventKind::Minted { .. } => EventType::Minted,
            EventKind::Transferred { .. } => EventType::Transferred,
            EventKind::Burned { .. } => EventType::Burned,
            EventKind::UsageReported { .. } => EventType::UsageReported,
            EventKind::Locked { .. } => EventType::Locked,
            EventKind::Unlocked { .. } => EventType::Unlocked,
            EventKind::Split { .. } => EventType::Split,
        }
    }

    /// Command that reproduces this transition
    pub fn command(&self) -> LedgerCommand {
        match self {
            EventKind::AdminChanged { new_admin } => LedgerCommand::SetAdmin {
                new_admin: new_admin.clone(),
            },
            EventKind::OracleChanged { new_oracle } => LedgerCommand::SetOracle {
                new_oracle: new_oracle.clone(),
            },
            EventKind::Frozen => LedgerCommand::FreezeAll,
            EventKind::Unfrozen => LedgerCommand::UnfreezeAll,
            EventKind::Minted { request, .. } => LedgerCommand::Mint(request.clone()),
            EventKind::Transferred { quota_id, to, .. } => LedgerCommand::Transfer {
                quota_id: *quota_id,
                new_owner: to.clone(),
            },
            EventKind::Burned { quota_id, amount } => LedgerCommand::Burn {
                quota_id: *quota_id,
                amount: *amount,
            },
            EventKind::UsageReported {
                quota_id,
                used_delta,
            } => LedgerCommand::ReportUsage {
                quota_id: *quota_id,
                used_delta: *used_delta,
            },
            EventKind::Locked { quota_id } => LedgerCommand::Lock {
                quota_id: *quota_id,
            },
            EventKind::Unlocked { quota_id } => LedgerCommand::Unlock {
                quota_id: *quota_id,
            },
            EventKind::Split {
                source,
                amount,
                recipient,
                ..
            } => LedgerCommand::Split {
                quota_id: *source,
                amount: *amount,
                recipient: recipient.clone(),
            },
        }
    }

    /// Id the transition created, if any
    pub fn issued(&self) -> Option<QuotaId> {
        match self {
            EventKind::Minted { quota_id, .. } | EventKind::Split { quota_id, .. } => {
                Some(*quota_id)
            }
            _ => None,
        }
    }

    /// Quota the transition touched, if any
    pub fn quota_id(&self) -> Option<QuotaId> {
        match self {
            EventKind::Minted { quota_id, .. }
            | EventKind::Transferred { quota_id, .. }
            | EventKind::Burned { quota_id, .. }
            | EventKind::UsageReported { quota_id, .. }
            | EventKind::Locked { quota_id }
            | EventKind::Unlocked { quota_id } => Some(*quota_id),
            EventKind::Split { source, .. } => Some(*source),
            _ => None,
        }
    }

    fn feed(&self, hasher: &mut Sha256) {
        hasher.update([self.event_type() as u8]);
        match self {
            EventKind::AdminChanged { new_admin } => feed_str(hasher, new_admin.as_str()),
            EventKind::OracleChanged { new_oracle } => feed_str(hasher, new_oracle.as_str()),
            EventKind::Frozen | EventKind::Unfrozen => {}
            EventKind::Minted { quota_id, request } => {
                hasher.update(quota_id.get().to_be_bytes());
                feed_str(hasher, request.recipient.as_str());
                feed_str(hasher, &request.pool_id);
                hasher.update(request.amount.to_be_bytes());
                hasher.update(request.expiration.to_be_bytes());
                hasher.update([
                    request.transferable as u8,
                    request.burnable as u8,
                    request.fractional_allowed as u8,
                ]);
            }
            EventKind::Transferred { quota_id, from, to } => {
                hasher.update(quota_id.get().to_be_bytes());
                feed_str(hasher, from.as_str());
                feed_str(hasher, to.as_str());
            }
            EventKind::Burned { quota_id, amount } => {
                hasher.update(quota_id.get().to_be_bytes());
                hasher.update(amount.to_be_bytes());
            }
            EventKind::UsageReported {
                quota_id,
                used_delta,
            } => {
                hasher.update(quota_id.get().to_be_bytes());
                hasher.update(used_delta.to_be_bytes());
            }
            EventKind::Locked { quota_id } | EventKind::Unlocked { quota_id } => {
                hasher.update(quota_id.get().to_be_bytes());
            }
            EventKind::Split {
                source,
                quota_id,
                amount,
                recipient,
            } => {
                hasher.update(source.get().to_be_bytes());
                hasher.update(quota_id.get().to_be_bytes());
                hasher.update(amount.to_be_bytes());
                feed_str(hasher, recipient.as_str());
            }
        }
    }
}

fn feed_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

/// Journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the journal, starting at 1
    pub sequence: u64,

    /// Clock value of the call
    pub height: Height,

    /// Caller identity
    pub sender: AccountId,

    /// What happened
    pub kind: EventKind,

    /// Hash of the previous event ([`GENESIS_HASH`] for the first)
    pub previous_hash: [u8; 32],

    /// Hash of this event
    pub hash: [u8; 32],
}

impl LedgerEvent {
    /// Recompute this event's hash from its contents
    pub fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.previous_hash);
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(self.height.to_be_bytes());
        feed_str(&mut hasher, self.sender.as_str());
        self.kind.feed(&mut hasher);
        hasher.finalize().into()
    }
}

/// Append-only event log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    events: Vec<LedgerEvent>,
}

impl Journal {
    /// Empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// All events, oldest first
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been committed yet
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Hash of the latest event
    pub fn head_hash(&self) -> [u8; 32] {
        self.events.last().map(|e| e.hash).unwrap_or(GENESIS_HASH)
    }

    /// Append a committed transition
    pub(crate) fn append(&mut self, height: Height, sender: AccountId, kind: EventKind) -> &LedgerEvent {
        let mut event = LedgerEvent {
            sequence: self.events.len() as u64 + 1,
            height,
            sender,
            kind,
            previous_hash: self.head_hash(),
            hash: [0u8; 32], // Computed below
        };
        event.hash = event.compute_hash();
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Check sequence numbers and the hash chain
    pub fn verify(&self) -> Result<()> {
        verify_chain(&self.events)
    }
}

/// Check sequence numbers and the hash chain of a slice of events
pub fn verify_chain(events: &[LedgerEvent]) -> Result<()> {
    let mut previous = GENESIS_HASH;
    for (index, event) in events.iter().enumerate() {
        let expected_sequence = index as u64 + 1;
        if event.sequence != expected_sequence {
            return Err(Error::JournalIntegrity {
                sequence: event.sequence,
                reason: format!("expected sequence {}", expected_sequence),
            });
        }
        if event.previous_hash != previous {
            return Err(Error::JournalIntegrity {
                sequence: event.sequence,
                reason: "previous hash link mismatch".to_string(),
            });
        }
        if event.compute_hash() != event.hash {
            return Err(Error::JournalIntegrity {
                sequence: event.sequence,
                reason: "event hash mismatch".to_string(),
            });
        }
        previous = event.hash;
    }
    Ok(())
}
