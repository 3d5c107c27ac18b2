//! Quota transition engine
//!
//! [`QuotaLedger`] owns the [`LedgerState`] and the [`Journal`] and exposes
//! every transition. Each operation validates all preconditions in a fixed
//! order against current state, then commits in one step; a rejection leaves
//! state and journal untouched.
//!
//! # Example
//!
//! ```
//! use quota_ledger::{AccountId, CallContext, LedgerParams, MintRequest, QuotaLedger};
//!
//! let mut ledger = QuotaLedger::new(AccountId::new("admin"), LedgerParams::default());
//! let admin = CallContext::new("admin", 1000);
//!
//! let id = ledger
//!     .mint(&admin, MintRequest::new("farmer", "Basin1", 5000, 2030))
//!     .unwrap();
//! assert_eq!(ledger.get_owner(id), Some(&AccountId::new("farmer")));
//! ```

use crate::command::{CommandOutput, LedgerCommand};
use crate::config::LedgerParams;
use crate::context::CallContext;
use crate::error::{Rejection, TxResult};
use crate::journal::{verify_chain, EventKind, Journal, LedgerEvent};
use crate::state::LedgerState;
use crate::types::{AccountId, Height, MintRequest, PoolId, QuotaId, QuotaTerms, QuotaUsage};
use crate::{Config, Error, Result};

/// The ledger engine
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    /// Validation parameters
    params: LedgerParams,

    /// Maps and counters
    state: LedgerState,

    /// Committed transitions
    journal: Journal,
}

impl QuotaLedger {
    /// Fresh ledger with `admin` as its initial administrator
    pub fn new(admin: AccountId, params: LedgerParams) -> Self {
        let state = LedgerState::new(admin, params.pool_cap);
        Self {
            params,
            state,
            journal: Journal::new(),
        }
    }

    /// Genesis ledger described by a configuration
    pub fn from_config(config: &Config) -> Self {
        let ledger = Self::new(config.admin.clone(), config.ledger.clone());
        match &config.oracle {
            Some(oracle) => ledger.with_oracle(oracle.clone()),
            None => ledger,
        }
    }

    /// Seed the oracle at genesis (not journaled)
    pub fn with_oracle(mut self, oracle: AccountId) -> Self {
        self.state.oracle = Some(oracle);
        self
    }

    /// Validation parameters
    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    /// Current state
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Committed transitions, oldest first
    pub fn events(&self) -> &[LedgerEvent] {
        self.journal.events()
    }

    /// The journal itself
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    // ===== Authorization =====

    /// Whether `sender` is the admin
    pub fn is_admin(&self, sender: &AccountId) -> bool {
        *sender == self.state.admin
    }

    /// Whether `sender` is the configured oracle
    pub fn is_oracle(&self, sender: &AccountId) -> bool {
        self.state.oracle.as_ref() == Some(sender)
    }

    fn require_admin(&self, ctx: &CallContext) -> TxResult<()> {
        if self.is_admin(&ctx.sender) {
            Ok(())
        } else {
            Err(Rejection::NotAuthorized)
        }
    }

    fn commit(&mut self, ctx: &CallContext, kind: EventKind) {
        let event = self.journal.append(ctx.now, ctx.sender.clone(), kind);
        tracing::debug!(
            sequence = event.sequence,
            event_type = ?event.kind.event_type(),
            quota_id = event.kind.quota_id().map(QuotaId::get),
            sender = %event.sender,
            height = event.height,
            "Committed ledger event"
        );
    }

    // ===== Administrative operations =====

    /// Replace the admin
    pub fn set_admin(&mut self, ctx: &CallContext, new_admin: AccountId) -> TxResult<()> {
        self.require_admin(ctx)?;
        tracing::info!(from = %self.state.admin, to = %new_admin, "Admin reassigned");
        self.state.admin = new_admin.clone();
        self.commit(ctx, EventKind::AdminChanged { new_admin });
        Ok(())
    }

    /// Replace the oracle
    pub fn set_oracle(&mut self, ctx: &CallContext, new_oracle: AccountId) -> TxResult<()> {
        self.require_admin(ctx)?;
        tracing::info!(oracle = %new_oracle, "Oracle set");
        self.state.oracle = Some(new_oracle.clone());
        self.commit(ctx, EventKind::OracleChanged { new_oracle });
        Ok(())
    }

    /// Block transfers ledger-wide
    pub fn freeze_all(&mut self, ctx: &CallContext) -> TxResult<()> {
        self.require_admin(ctx)?;
        tracing::info!(height = ctx.now, "Ledger frozen");
        self.state.frozen = true;
        self.commit(ctx, EventKind::Frozen);
        Ok(())
    }

    /// Allow transfers again
    pub fn unfreeze_all(&mut self, ctx: &CallContext) -> TxResult<()> {
        self.require_admin(ctx)?;
        tracing::info!(height = ctx.now, "Ledger unfrozen");
        self.state.frozen = false;
        self.commit(ctx, EventKind::Unfrozen);
        Ok(())
    }

    // ===== Issuance =====

    /// Issue a new quota to `request.recipient`
    ///
    /// Checks, in order: admin, recipient is not the caller, pool name,
    /// non-zero amount, minimum expiration, pool cap.
    pub fn mint(&mut self, ctx: &CallContext, request: MintRequest) -> TxResult<QuotaId> {
        self.require_admin(ctx)?;
        if request.recipient == ctx.sender {
            return Err(Rejection::InvalidRecipient);
        }
        let pool_id = PoolId::parse(&request.pool_id, self.params.max_pool_id_len)?;
        if request.amount == 0 {
            return Err(Rejection::InvalidAmount);
        }
        if request.expiration < self.params.min_expiration {
            return Err(Rejection::InvalidExpiration);
        }
        let pool_total = self
            .state
            .pool_total(&pool_id)
            .checked_add(request.amount)
            .filter(|total| *total <= self.state.pool_cap)
            .ok_or(Rejection::MaxQuotaReached)?;

        let quota_id = self.state.allocate_id();
        let terms = QuotaTerms {
            pool_id: pool_id.clone(),
            amount: request.amount,
            expiration_height: request.expiration,
            issued_at: ctx.now,
            locked: false,
            transferable: request.transferable,
            burnable: request.burnable,
            fractional_allowed: request.fractional_allowed,
        };
        self.state.insert_quota(
            quota_id,
            request.recipient.clone(),
            terms,
            QuotaUsage::fresh(ctx.now),
        );
        self.state.pool_totals.insert(pool_id, pool_total);

        self.commit(ctx, EventKind::Minted { quota_id, request });
        Ok(quota_id)
    }

    // ===== Ownership =====

    /// Move a quota to `new_owner`
    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        quota_id: QuotaId,
        new_owner: AccountId,
    ) -> TxResult<()> {
        let owner = self
            .state
            .ownership
            .get(&quota_id)
            .ok_or(Rejection::QuotaNotFound)?;
        let terms = self
            .state
            .terms
            .get(&quota_id)
            .ok_or(Rejection::MetadataNotSet)?;
        if self.state.frozen {
            return Err(Rejection::QuotaFrozen);
        }
        if ctx.sender != *owner {
            return Err(Rejection::InvalidOwner);
        }
        if !terms.transferable {
            return Err(Rejection::TransferLocked);
        }
        if terms.is_expired_at(ctx.now) {
            return Err(Rejection::QuotaExpired);
        }

        let from = owner.clone();
        self.state.ownership.insert(quota_id, new_owner.clone());
        self.commit(
            ctx,
            EventKind::Transferred {
                quota_id,
                from,
                to: new_owner,
            },
        );
        Ok(())
    }

    // ===== Consumption =====

    /// Retire `amount` of a quota's remainder
    ///
    /// The exceeds check deliberately runs before the zero check.
    pub fn burn(&mut self, ctx: &CallContext, quota_id: QuotaId, amount: u64) -> TxResult<()> {
        let owner = self
            .state
            .ownership
            .get(&quota_id)
            .ok_or(Rejection::QuotaNotFound)?;
        let terms = self
            .state
            .terms
            .get(&quota_id)
            .ok_or(Rejection::MetadataNotSet)?;
        let usage = self
            .state
            .usage
            .get(&quota_id)
            .ok_or(Rejection::QuotaNotFound)?;
        if ctx.sender != *owner {
            return Err(Rejection::InvalidOwner);
        }
        if !terms.burnable {
            return Err(Rejection::BurnFailed);
        }
        // Signed: usage may exceed the remainder after earlier burns.
        let available = i128::from(terms.amount) - i128::from(usage.used);
        if i128::from(amount) > available {
            return Err(Rejection::BurnAmountExceeds);
        }
        if amount == 0 {
            return Err(Rejection::InvalidAmount);
        }

        // amount <= terms.amount - used, so neither side can wrap.
        let remaining = terms.amount - amount;
        let used = usage.used + amount;

        if let Some(terms) = self.state.terms.get_mut(&quota_id) {
            terms.amount = remaining;
        }
        self.state.usage.insert(
            quota_id,
            QuotaUsage {
                used,
                last_updated: ctx.now,
            },
        );
        self.commit(ctx, EventKind::Burned { quota_id, amount });
        Ok(())
    }

    /// Record consumption reported by the oracle (or admin)
    pub fn report_usage(
        &mut self,
        ctx: &CallContext,
        quota_id: QuotaId,
        used_delta: u64,
    ) -> TxResult<()> {
        if !self.is_oracle(&ctx.sender) && !self.is_admin(&ctx.sender) {
            return Err(Rejection::OracleNotAuthorized);
        }
        let terms = self
            .state
            .terms
            .get(&quota_id)
            .ok_or(Rejection::MetadataNotSet)?;
        let usage = self.state.usage.get(&quota_id).copied().unwrap_or_default();
        let used = usage
            .used
            .checked_add(used_delta)
            .filter(|used| *used <= terms.amount)
            .ok_or(Rejection::InsufficientQuota)?;

        self.state.usage.insert(
            quota_id,
            QuotaUsage {
                used,
                last_updated: ctx.now,
            },
        );
        self.commit(
            ctx,
            EventKind::UsageReported {
                quota_id,
                used_delta,
            },
        );
        Ok(())
    }

    // ===== Advisory lock =====

    /// Set the advisory lock (owner or admin)
    pub fn lock(&mut self, ctx: &CallContext, quota_id: QuotaId) -> TxResult<()> {
        self.set_locked(ctx, quota_id, true)?;
        self.commit(ctx, EventKind::Locked { quota_id });
        Ok(())
    }

    /// Clear the advisory lock (owner or admin)
    pub fn unlock(&mut self, ctx: &CallContext, quota_id: QuotaId) -> TxResult<()> {
        self.set_locked(ctx, quota_id, false)?;
        self.commit(ctx, EventKind::Unlocked { quota_id });
        Ok(())
    }

    fn set_locked(&mut self, ctx: &CallContext, quota_id: QuotaId, locked: bool) -> TxResult<()> {
        let owner = self
            .state
            .ownership
            .get(&quota_id)
            .ok_or(Rejection::QuotaNotFound)?;
        if !self.state.terms.contains_key(&quota_id) {
            return Err(Rejection::MetadataNotSet);
        }
        if !self.is_admin(&ctx.sender) && ctx.sender != *owner {
            return Err(Rejection::NotAuthorized);
        }
        if let Some(terms) = self.state.terms.get_mut(&quota_id) {
            terms.locked = locked;
        }
        Ok(())
    }

    // ===== Subdivision =====

    /// Move `amount` of a quota into a new quota owned by `recipient`
    ///
    /// The source must keep a strictly positive remainder. Pool totals do
    /// not change: capacity is partitioned, not issued.
    pub fn split(
        &mut self,
        ctx: &CallContext,
        quota_id: QuotaId,
        amount: u64,
        recipient: AccountId,
    ) -> TxResult<QuotaId> {
        let owner = self
            .state
            .ownership
            .get(&quota_id)
            .ok_or(Rejection::QuotaNotFound)?;
        let terms = self
            .state
            .terms
            .get(&quota_id)
            .ok_or(Rejection::MetadataNotSet)?;
        if ctx.sender != *owner {
            return Err(Rejection::InvalidOwner);
        }
        if !terms.fractional_allowed {
            return Err(Rejection::InvalidFractional);
        }
        if amount == 0 {
            return Err(Rejection::InvalidAmount);
        }
        if amount >= terms.amount {
            return Err(Rejection::InsufficientQuota);
        }

        let child = terms.split_off(amount, ctx.now);
        if let Some(terms) = self.state.terms.get_mut(&quota_id) {
            terms.amount -= amount;
        }
        let new_id = self.state.allocate_id();
        self.state
            .insert_quota(new_id, recipient.clone(), child, QuotaUsage::fresh(ctx.now));

        self.commit(
            ctx,
            EventKind::Split {
                source: quota_id,
                quota_id: new_id,
                amount,
                recipient,
            },
        );
        Ok(new_id)
    }

    // ===== Read-only accessors =====

    /// Owner of a quota
    pub fn get_owner(&self, quota_id: QuotaId) -> Option<&AccountId> {
        self.state.owner(quota_id)
    }

    /// Terms of a quota
    pub fn get_terms(&self, quota_id: QuotaId) -> Option<&QuotaTerms> {
        self.state.terms(quota_id)
    }

    /// Usage of a quota
    pub fn get_usage(&self, quota_id: QuotaId) -> Option<&QuotaUsage> {
        self.state.usage(quota_id)
    }

    /// Id the next mint or split will receive
    pub fn peek_next_id(&self) -> QuotaId {
        self.state.next_quota_id()
    }

    /// Whether a quota's expiration height is behind `now`
    pub fn is_expired(&self, quota_id: QuotaId, now: Height) -> TxResult<bool> {
        self.state
            .terms(quota_id)
            .map(|terms| terms.is_expired_at(now))
            .ok_or(Rejection::QuotaNotFound)
    }

    /// Current admin
    pub fn admin(&self) -> &AccountId {
        self.state.admin()
    }

    /// Current oracle
    pub fn oracle(&self) -> Option<&AccountId> {
        self.state.oracle()
    }

    /// Whether transfers are frozen
    pub fn is_frozen(&self) -> bool {
        self.state.is_frozen()
    }

    /// Per-pool issuance cap
    pub fn pool_cap(&self) -> u64 {
        self.state.pool_cap()
    }

    /// Cumulative issuance into `pool` (0 for unknown or invalid names)
    pub fn pool_total(&self, pool: &str) -> u64 {
        PoolId::parse(pool, usize::MAX)
            .map(|pool| self.state.pool_total(&pool))
            .unwrap_or(0)
    }

    // ===== Dispatch and replay =====

    /// Run a command
    pub fn execute(&mut self, ctx: &CallContext, command: LedgerCommand) -> TxResult<CommandOutput> {
        let operation = command.name();
        let result = match command {
            LedgerCommand::SetAdmin { new_admin } => {
                self.set_admin(ctx, new_admin).map(|_| CommandOutput::Done)
            }
            LedgerCommand::SetOracle { new_oracle } => {
                self.set_oracle(ctx, new_oracle).map(|_| CommandOutput::Done)
            }
            LedgerCommand::FreezeAll => self.freeze_all(ctx).map(|_| CommandOutput::Done),
            LedgerCommand::UnfreezeAll => self.unfreeze_all(ctx).map(|_| CommandOutput::Done),
            LedgerCommand::Mint(request) => self.mint(ctx, request).map(CommandOutput::Issued),
            LedgerCommand::Transfer {
                quota_id,
                new_owner,
            } => self
                .transfer(ctx, quota_id, new_owner)
                .map(|_| CommandOutput::Done),
            LedgerCommand::Burn { quota_id, amount } => {
                self.burn(ctx, quota_id, amount).map(|_| CommandOutput::Done)
            }
            LedgerCommand::ReportUsage {
                quota_id,
                used_delta,
            } => self
                .report_usage(ctx, quota_id, used_delta)
                .map(|_| CommandOutput::Done),
            LedgerCommand::Lock { quota_id } => {
                self.lock(ctx, quota_id).map(|_| CommandOutput::Done)
            }
            LedgerCommand::Unlock { quota_id } => {
                self.unlock(ctx, quota_id).map(|_| CommandOutput::Done)
            }
            LedgerCommand::Split {
                quota_id,
                amount,
                recipient,
            } => self
                .split(ctx, quota_id, amount, recipient)
                .map(CommandOutput::Issued),
        };

        if let Err(rejection) = &result {
            tracing::debug!(
                operation,
                code = rejection.code(),
                sender = %ctx.sender,
                height = ctx.now,
                "Operation rejected"
            );
        }
        result
    }

    /// Rebuild a ledger by re-executing `events` on top of `genesis`
    ///
    /// `genesis` must have an empty journal and the same admin, oracle and
    /// parameters the original ledger started with.
    pub fn replay(mut genesis: QuotaLedger, events: &[LedgerEvent]) -> Result<QuotaLedger> {
        if !genesis.journal.is_empty() {
            return Err(Error::Other(
                "replay requires a genesis ledger with an empty journal".to_string(),
            ));
        }
        verify_chain(events)?;

        for event in events {
            let ctx = CallContext::new(event.sender.clone(), event.height);
            genesis
                .execute(&ctx, event.kind.command())
                .map_err(|rejection| Error::JournalIntegrity {
                    sequence: event.sequence,
                    reason: format!("replay rejected with code {}", rejection.code()),
                })?;
            // Covers engine-assigned values such as minted ids and previous owners
            if genesis.journal.events().last() != Some(event) {
                return Err(Error::JournalIntegrity {
                    sequence: event.sequence,
                    reason: "replayed event differs from recorded event".to_string(),
                });
            }
        }

        tracing::debug!(events = events.len(), "Replayed journal");
        Ok(genesis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "ST1ADMIN";
    const FARMER: &str = "ST2FARMER";
    const BUYER: &str = "ST3BUYER";
    const HEIGHT: Height = 1000;

    fn create_test_ledger() -> QuotaLedger {
        QuotaLedger::new(AccountId::new(ADMIN), LedgerParams::default())
    }

    fn as_user(sender: &str) -> CallContext {
        CallContext::new(sender, HEIGHT)
    }

    fn mint_default(ledger: &mut QuotaLedger) -> QuotaId {
        ledger
            .mint(&as_user(ADMIN), MintRequest::new(FARMER, "MerinLagoon", 5000, 2030))
            .unwrap()
    }

    #[test]
    fn test_mint_records_terms_and_usage() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        assert_eq!(id, QuotaId::FIRST);

        let terms = ledger.get_terms(id).unwrap();
        assert_eq!(terms.pool_id.as_str(), "MerinLagoon");
        assert_eq!(terms.amount, 5000);
        assert_eq!(terms.expiration_height, 2030);
        assert_eq!(terms.issued_at, HEIGHT);
        assert!(!terms.locked);

        let usage = ledger.get_usage(id).unwrap();
        assert_eq!(usage.used, 0);
        assert_eq!(usage.last_updated, HEIGHT);
        assert_eq!(ledger.pool_total("MerinLagoon"), 5000);
        assert_eq!(ledger.peek_next_id(), QuotaId::new(2));
    }

    #[test]
    fn test_mint_validation_order() {
        let mut ledger = create_test_ledger();

        // Non-admin beats every other failure
        let err = ledger
            .mint(&as_user(FARMER), MintRequest::new(FARMER, "", 0, 0))
            .unwrap_err();
        assert_eq!(err, Rejection::NotAuthorized);

        let err = ledger
            .mint(&as_user(ADMIN), MintRequest::new(ADMIN, "", 0, 0))
            .unwrap_err();
        assert_eq!(err, Rejection::InvalidRecipient);

        let err = ledger
            .mint(&as_user(ADMIN), MintRequest::new(FARMER, "", 0, 0))
            .unwrap_err();
        assert_eq!(err, Rejection::InvalidPool);

        let err = ledger
            .mint(&as_user(ADMIN), MintRequest::new(FARMER, "B", 0, 0))
            .unwrap_err();
        assert_eq!(err, Rejection::InvalidAmount);

        let err = ledger
            .mint(&as_user(ADMIN), MintRequest::new(FARMER, "B", 1, 2024))
            .unwrap_err();
        assert_eq!(err, Rejection::InvalidExpiration);

        let err = ledger
            .mint(
                &as_user(ADMIN),
                MintRequest::new(FARMER, "B", 1_000_000_001, 2025),
            )
            .unwrap_err();
        assert_eq!(err, Rejection::MaxQuotaReached);

        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_mint_pool_cap_accumulates() {
        let mut ledger = QuotaLedger::new(
            AccountId::new(ADMIN),
            LedgerParams {
                pool_cap: 10_000,
                ..LedgerParams::default()
            },
        );
        let admin = as_user(ADMIN);
        ledger
            .mint(&admin, MintRequest::new(FARMER, "B", 6000, 2030))
            .unwrap();
        ledger
            .mint(&admin, MintRequest::new(FARMER, "B", 4000, 2030))
            .unwrap();
        assert_eq!(
            ledger.mint(&admin, MintRequest::new(FARMER, "B", 1, 2030)),
            Err(Rejection::MaxQuotaReached)
        );
        // A different pool has its own cap
        ledger
            .mint(&admin, MintRequest::new(FARMER, "C", 1, 2030))
            .unwrap();
    }

    #[test]
    fn test_mint_pool_total_overflow_is_cap_rejection() {
        let mut ledger = QuotaLedger::new(
            AccountId::new(ADMIN),
            LedgerParams {
                pool_cap: u64::MAX,
                ..LedgerParams::default()
            },
        );
        let admin = as_user(ADMIN);
        ledger
            .mint(&admin, MintRequest::new(FARMER, "B", u64::MAX, 2030))
            .unwrap();
        assert_eq!(
            ledger.mint(&admin, MintRequest::new(FARMER, "B", 1, 2030)),
            Err(Rejection::MaxQuotaReached)
        );
    }

    #[test]
    fn test_transfer_checks() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);

        assert_eq!(
            ledger.transfer(&as_user(FARMER), QuotaId::new(9), BUYER.into()),
            Err(Rejection::QuotaNotFound)
        );
        assert_eq!(
            ledger.transfer(&as_user("ST3HACKER"), id, BUYER.into()),
            Err(Rejection::InvalidOwner)
        );
        assert_eq!(
            ledger.transfer(&CallContext::new(FARMER, 2031), id, BUYER.into()),
            Err(Rejection::QuotaExpired)
        );

        ledger.transfer(&as_user(FARMER), id, BUYER.into()).unwrap();
        assert_eq!(ledger.get_owner(id), Some(&AccountId::new(BUYER)));
    }

    #[test]
    fn test_transfer_at_expiration_height_succeeds() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        ledger
            .transfer(&CallContext::new(FARMER, 2030), id, BUYER.into())
            .unwrap();
    }

    #[test]
    fn test_transfer_frozen_before_owner_check() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        ledger.freeze_all(&as_user(ADMIN)).unwrap();
        assert_eq!(
            ledger.transfer(&as_user("ST3HACKER"), id, BUYER.into()),
            Err(Rejection::QuotaFrozen)
        );
        ledger.unfreeze_all(&as_user(ADMIN)).unwrap();
        ledger.transfer(&as_user(FARMER), id, BUYER.into()).unwrap();
    }

    #[test]
    fn test_transfer_non_transferable() {
        let mut ledger = create_test_ledger();
        let id = ledger
            .mint(
                &as_user(ADMIN),
                MintRequest::new(FARMER, "MerinLagoon", 5000, 2030).transferable(false),
            )
            .unwrap();
        assert_eq!(
            ledger.transfer(&as_user(FARMER), id, BUYER.into()),
            Err(Rejection::TransferLocked)
        );
    }

    #[test]
    fn test_burn_moves_amount_to_usage() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        ledger
            .burn(&CallContext::new(FARMER, 1500), id, 1000)
            .unwrap();

        assert_eq!(ledger.get_terms(id).unwrap().amount, 4000);
        let usage = ledger.get_usage(id).unwrap();
        assert_eq!(usage.used, 1000);
        assert_eq!(usage.last_updated, 1500);
    }

    #[test]
    fn test_burn_exceeds_checked_before_zero() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        let farmer = as_user(FARMER);

        assert_eq!(ledger.burn(&farmer, id, 5001), Err(Rejection::BurnAmountExceeds));
        assert_eq!(ledger.burn(&farmer, id, 0), Err(Rejection::InvalidAmount));

        // Drain the remainder: amount 0, used 5000. Now even zero "exceeds".
        ledger.burn(&farmer, id, 5000).unwrap();
        assert_eq!(ledger.burn(&farmer, id, 0), Err(Rejection::BurnAmountExceeds));
    }

    #[test]
    fn test_burn_permissions() {
        let mut ledger = create_test_ledger();
        let id = ledger
            .mint(
                &as_user(ADMIN),
                MintRequest::new(FARMER, "MerinLagoon", 5000, 2030).burnable(false),
            )
            .unwrap();
        assert_eq!(
            ledger.burn(&as_user(ADMIN), id, 10),
            Err(Rejection::InvalidOwner)
        );
        assert_eq!(ledger.burn(&as_user(FARMER), id, 10), Err(Rejection::BurnFailed));
        assert_eq!(
            ledger.burn(&as_user(FARMER), QuotaId::new(7), 10),
            Err(Rejection::QuotaNotFound)
        );
    }

    #[test]
    fn test_report_usage_authorization() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);

        assert_eq!(
            ledger.report_usage(&as_user("ST3HACKER"), id, 1),
            Err(Rejection::OracleNotAuthorized)
        );
        // Admin may always report
        ledger.report_usage(&as_user(ADMIN), id, 1).unwrap();

        ledger.set_oracle(&as_user(ADMIN), "ST1ORACLE".into()).unwrap();
        ledger.report_usage(&as_user("ST1ORACLE"), id, 2).unwrap();
        assert_eq!(ledger.get_usage(id).unwrap().used, 3);

        assert_eq!(
            ledger.report_usage(&as_user("ST1ORACLE"), QuotaId::new(5), 1),
            Err(Rejection::MetadataNotSet)
        );
    }

    #[test]
    fn test_report_usage_bound() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        let admin = as_user(ADMIN);
        ledger.report_usage(&admin, id, 5000).unwrap();
        assert_eq!(
            ledger.report_usage(&admin, id, 1),
            Err(Rejection::InsufficientQuota)
        );
        assert_eq!(
            ledger.report_usage(&admin, id, u64::MAX),
            Err(Rejection::InsufficientQuota)
        );
    }

    #[test]
    fn test_report_usage_lazily_creates_usage() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        ledger.state.usage.remove(&id);

        ledger
            .report_usage(&CallContext::new(ADMIN, 1200), id, 7)
            .unwrap();
        assert_eq!(
            ledger.get_usage(id),
            Some(&QuotaUsage {
                used: 7,
                last_updated: 1200
            })
        );
    }

    #[test]
    fn test_lock_and_unlock() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);

        ledger.lock(&as_user(FARMER), id).unwrap();
        assert!(ledger.get_terms(id).unwrap().locked);
        ledger.unlock(&as_user(FARMER), id).unwrap();
        assert!(!ledger.get_terms(id).unwrap().locked);

        ledger.lock(&as_user(ADMIN), id).unwrap();
        assert_eq!(
            ledger.unlock(&as_user("ST3HACKER"), id),
            Err(Rejection::NotAuthorized)
        );
        assert_eq!(
            ledger.lock(&as_user(ADMIN), QuotaId::new(3)),
            Err(Rejection::QuotaNotFound)
        );
    }

    #[test]
    fn test_lock_is_advisory() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        let farmer = as_user(FARMER);
        ledger.lock(&farmer, id).unwrap();

        ledger.burn(&farmer, id, 10).unwrap();
        let child = ledger.split(&farmer, id, 10, FARMER.into()).unwrap();
        ledger.transfer(&farmer, id, BUYER.into()).unwrap();
        assert!(ledger.get_terms(id).unwrap().locked);
        assert!(!ledger.get_terms(child).unwrap().locked);
    }

    #[test]
    fn test_split_partitions_amount() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        let new_id = ledger
            .split(&CallContext::new(FARMER, 1100), id, 2000, BUYER.into())
            .unwrap();

        assert_eq!(new_id, QuotaId::new(2));
        assert_eq!(ledger.get_terms(id).unwrap().amount, 3000);
        let child = ledger.get_terms(new_id).unwrap();
        assert_eq!(child.amount, 2000);
        assert_eq!(child.issued_at, 1100);
        assert_eq!(ledger.get_owner(new_id), Some(&AccountId::new(BUYER)));
        assert_eq!(ledger.get_usage(new_id).unwrap().used, 0);
        assert_eq!(ledger.pool_total("MerinLagoon"), 5000);
        ledger.state().check_invariants().unwrap();
    }

    #[test]
    fn test_split_checks() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        let farmer = as_user(FARMER);

        assert_eq!(
            ledger.split(&as_user(BUYER), id, 1, BUYER.into()),
            Err(Rejection::InvalidOwner)
        );
        assert_eq!(
            ledger.split(&farmer, id, 0, BUYER.into()),
            Err(Rejection::InvalidAmount)
        );
        assert_eq!(
            ledger.split(&farmer, id, 5000, BUYER.into()),
            Err(Rejection::InsufficientQuota)
        );

        let fixed = ledger
            .mint(
                &as_user(ADMIN),
                MintRequest::new(FARMER, "MerinLagoon", 10, 2030).fractional_allowed(false),
            )
            .unwrap();
        assert_eq!(
            ledger.split(&farmer, fixed, 0, BUYER.into()),
            Err(Rejection::InvalidFractional)
        );
    }

    #[test]
    fn test_is_expired() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        assert_eq!(ledger.is_expired(id, 2030), Ok(false));
        assert_eq!(ledger.is_expired(id, 2031), Ok(true));
        assert_eq!(
            ledger.is_expired(QuotaId::new(2), 0),
            Err(Rejection::QuotaNotFound)
        );
    }

    #[test]
    fn test_admin_operations_require_admin() {
        let mut ledger = create_test_ledger();
        let user = as_user(FARMER);
        assert_eq!(ledger.set_admin(&user, FARMER.into()), Err(Rejection::NotAuthorized));
        assert_eq!(ledger.set_oracle(&user, FARMER.into()), Err(Rejection::NotAuthorized));
        assert_eq!(ledger.freeze_all(&user), Err(Rejection::NotAuthorized));
        assert_eq!(ledger.unfreeze_all(&user), Err(Rejection::NotAuthorized));

        ledger.set_admin(&as_user(ADMIN), FARMER.into()).unwrap();
        assert!(ledger.is_admin(&AccountId::new(FARMER)));
        assert_eq!(ledger.freeze_all(&as_user(ADMIN)), Err(Rejection::NotAuthorized));
        ledger.freeze_all(&user).unwrap();
        assert!(ledger.is_frozen());
    }

    #[test]
    fn test_execute_dispatch() {
        let mut ledger = create_test_ledger();
        let output = ledger
            .execute(
                &as_user(ADMIN),
                LedgerCommand::Mint(MintRequest::new(FARMER, "B", 10, 2030)),
            )
            .unwrap();
        assert_eq!(output, CommandOutput::Issued(QuotaId::FIRST));

        let output = ledger
            .execute(&as_user(FARMER), LedgerCommand::Lock { quota_id: QuotaId::FIRST })
            .unwrap();
        assert_eq!(output, CommandOutput::Done);
    }

    #[test]
    fn test_journal_records_only_commits() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        let _ = ledger.burn(&as_user(BUYER), id, 1);
        ledger.burn(&as_user(FARMER), id, 1).unwrap();

        let events = ledger.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind.issued(), Some(id));
        assert_eq!(
            events[1].kind,
            EventKind::Burned {
                quota_id: id,
                amount: 1
            }
        );
        ledger.journal().verify().unwrap();
    }

    #[test]
    fn test_replay_reproduces_state() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        ledger.set_oracle(&as_user(ADMIN), "O".into()).unwrap();
        ledger.report_usage(&as_user("O"), id, 100).unwrap();
        ledger.split(&as_user(FARMER), id, 50, BUYER.into()).unwrap();
        ledger.transfer(&as_user(FARMER), id, BUYER.into()).unwrap();

        let replayed = QuotaLedger::replay(create_test_ledger(), ledger.events()).unwrap();
        assert_eq!(replayed.state(), ledger.state());
        assert_eq!(replayed.journal(), ledger.journal());
    }

    #[test]
    fn test_replay_rejects_wrong_genesis() {
        let mut ledger = create_test_ledger();
        mint_default(&mut ledger);

        let other = QuotaLedger::new(AccountId::new("someone-else"), LedgerParams::default());
        let err = QuotaLedger::replay(other, ledger.events()).unwrap_err();
        assert!(matches!(err, Error::JournalIntegrity { sequence: 1, .. }));
    }

    #[test]
    fn test_replay_rejects_forged_engine_values() {
        let mut ledger = create_test_ledger();
        let id = mint_default(&mut ledger);
        ledger.transfer(&as_user(FARMER), id, BUYER.into()).unwrap();

        // Rewrite the recorded previous owner and re-chain so the hashes still verify
        let mut events = ledger.events().to_vec();
        events[1].kind = EventKind::Transferred {
            quota_id: id,
            from: AccountId::new("MALLORY"),
            to: AccountId::new(BUYER),
        };
        events[1].hash = events[1].compute_hash();
        verify_chain(&events).unwrap();

        let err = QuotaLedger::replay(create_test_ledger(), &events).unwrap_err();
        assert!(matches!(err, Error::JournalIntegrity { sequence: 2, .. }));
    }

    #[test]
    fn test_replay_rejects_forged_issued_id() {
        let mut ledger = create_test_ledger();
        mint_default(&mut ledger);

        let mut events = ledger.events().to_vec();
        if let EventKind::Minted { quota_id, .. } = &mut events[0].kind {
            *quota_id = QuotaId::new(7);
        }
        events[0].hash = events[0].compute_hash();

        let err = QuotaLedger::replay(create_test_ledger(), &events).unwrap_err();
        assert!(matches!(err, Error::JournalIntegrity { sequence: 1, .. }));
    }
}
