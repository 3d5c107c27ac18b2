//! Mutating ledger operations as data

use crate::types::{AccountId, MintRequest, QuotaId};
use serde::{Deserialize, Serialize};

/// A state-changing ledger operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    /// Replace the admin
    SetAdmin {
        /// New admin identity
        new_admin: AccountId,
    },
    /// Replace the oracle
    SetOracle {
        /// New oracle identity
        new_oracle: AccountId,
    },
    /// Block all transfers
    FreezeAll,
    /// Allow transfers again
    UnfreezeAll,
    /// Issue a new quota
    Mint(MintRequest),
    /// Move a quota to a new owner
    Transfer {
        /// Quota to move
        quota_id: QuotaId,
        /// Receiving owner
        new_owner: AccountId,
    },
    /// Retire part of a quota
    Burn {
        /// Quota to burn from
        quota_id: QuotaId,
        /// Quantity to burn
        amount: u64,
    },
    /// Record consumption reported by the oracle
    ReportUsage {
        /// Quota consumed against
        quota_id: QuotaId,
        /// Quantity consumed since the last report
        used_delta: u64,
    },
    /// Set the advisory lock
    Lock {
        /// Quota to lock
        quota_id: QuotaId,
    },
    /// Clear the advisory lock
    Unlock {
        /// Quota to unlock
        quota_id: QuotaId,
    },
    /// Carve a new quota out of an existing one
    Split {
        /// Source quota
        quota_id: QuotaId,
        /// Quantity moved to the new quota
        amount: u64,
        /// Owner of the new quota
        recipient: AccountId,
    },
}

impl LedgerCommand {
    /// Operation name used in logs and metric labels
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCommand::SetAdmin { .. } => "set_admin",
            LedgerCommand::SetOracle { .. } => "set_oracle",
            LedgerCommand::FreezeAll => "freeze_all",
            LedgerCommand::UnfreezeAll => "unfreeze_all",
            LedgerCommand::Mint(_) => "mint",
            LedgerCommand::Transfer { .. } => "transfer",
            LedgerCommand::Burn { .. } => "burn",
            LedgerCommand::ReportUsage { .. } => "report_usage",
            LedgerCommand::Lock { .. } => "lock",
            LedgerCommand::Unlock { .. } => "unlock",
            LedgerCommand::Split { .. } => "split",
        }
    }
}

/// What a successful command produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutput {
    /// Applied; nothing to return
    Done,
    /// A new quota was issued (mint or split)
    Issued(QuotaId),
}

impl CommandOutput {
    /// Issued id, if the command created a quota
    pub fn issued(self) -> Option<QuotaId> {
        match self {
            CommandOutput::Issued(id) => Some(id),
            CommandOutput::Done => None,
        }
    }
}
