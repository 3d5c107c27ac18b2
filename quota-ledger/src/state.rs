//! Ledger state
//!
//! Plain data owned by [`crate::QuotaLedger`]. Mutation goes through the
//! engine; this module only holds the maps and checks their structure.
//!
//! # Invariants
//!
//! - `ownership`, `terms` and `usage` share one key set
//! - that key set is exactly `1..next_quota_id` (ids are never skipped or reused)
//! - every pool total is within `pool_cap`

use crate::types::{AccountId, PoolId, QuotaId, QuotaTerms, QuotaUsage};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub(crate) admin: AccountId,
    pub(crate) oracle: Option<AccountId>,
    pub(crate) next_quota_id: QuotaId,
    pub(crate) pool_cap: u64,
    pub(crate) frozen: bool,
    pub(crate) ownership: BTreeMap<QuotaId, AccountId>,
    pub(crate) terms: BTreeMap<QuotaId, QuotaTerms>,
    pub(crate) usage: BTreeMap<QuotaId, QuotaUsage>,
    pub(crate) pool_totals: BTreeMap<PoolId, u64>,
}

impl LedgerState {
    /// Empty state with an initial admin
    pub fn new(admin: AccountId, pool_cap: u64) -> Self {
        Self {
            admin,
            oracle: None,
            next_quota_id: QuotaId::FIRST,
            pool_cap,
            frozen: false,
            ownership: BTreeMap::new(),
            terms: BTreeMap::new(),
            usage: BTreeMap::new(),
            pool_totals: BTreeMap::new(),
        }
    }

    /// Current admin
    pub fn admin(&self) -> &AccountId {
        &self.admin
    }

    /// Current oracle, if one is set
    pub fn oracle(&self) -> Option<&AccountId> {
        self.oracle.as_ref()
    }

    /// Id the next mint or split will receive
    pub fn next_quota_id(&self) -> QuotaId {
        self.next_quota_id
    }

    /// Per-pool issuance cap
    pub fn pool_cap(&self) -> u64 {
        self.pool_cap
    }

    /// Whether transfers are frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Owner of a quota
    pub fn owner(&self, id: QuotaId) -> Option<&AccountId> {
        self.ownership.get(&id)
    }

    /// Terms of a quota
    pub fn terms(&self, id: QuotaId) -> Option<&QuotaTerms> {
        self.terms.get(&id)
    }

    /// Usage of a quota
    pub fn usage(&self, id: QuotaId) -> Option<&QuotaUsage> {
        self.usage.get(&id)
    }

    /// Cumulative issuance into a pool (0 for an unknown pool)
    pub fn pool_total(&self, pool: &PoolId) -> u64 {
        self.pool_totals.get(pool).copied().unwrap_or(0)
    }

    /// All pool totals
    pub fn pool_totals(&self) -> &BTreeMap<PoolId, u64> {
        &self.pool_totals
    }

    /// Number of quota records
    pub fn quota_count(&self) -> usize {
        self.ownership.len()
    }

    /// Ids of quotas owned by `owner`, ascending
    pub fn quotas_owned_by(&self, owner: &AccountId) -> Vec<QuotaId> {
        self.ownership
            .iter()
            .filter(|(_, o)| *o == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Hand out the next id
    pub(crate) fn allocate_id(&mut self) -> QuotaId {
        let id = self.next_quota_id;
        self.next_quota_id = id.next();
        id
    }

    /// Insert all three records for a new quota
    pub(crate) fn insert_quota(
        &mut self,
        id: QuotaId,
        owner: AccountId,
        terms: QuotaTerms,
        usage: QuotaUsage,
    ) {
        self.ownership.insert(id, owner);
        self.terms.insert(id, terms);
        self.usage.insert(id, usage);
    }

    /// Verify structural invariants
    pub fn check_invariants(&self) -> Result<()> {
        let expected = self.next_quota_id.get().saturating_sub(1) as usize;
        for (name, len) in [
            ("ownership", self.ownership.len()),
            ("terms", self.terms.len()),
            ("usage", self.usage.len()),
        ] {
            if len != expected {
                return Err(Error::InvariantViolation(format!(
                    "{} holds {} records, expected {}",
                    name, len, expected
                )));
            }
        }

        for raw in 1..self.next_quota_id.get() {
            let id = QuotaId::new(raw);
            if !self.ownership.contains_key(&id)
                || !self.terms.contains_key(&id)
                || !self.usage.contains_key(&id)
            {
                return Err(Error::InvariantViolation(format!(
                    "quota {} missing from one of ownership/terms/usage",
                    id
                )));
            }
        }

        for (pool, total) in &self.pool_totals {
            if *total > self.pool_cap {
                return Err(Error::InvariantViolation(format!(
                    "pool {} issued {} over cap {}",
                    pool, total, self.pool_cap
                )));
            }
        }

        Ok(())
    }
}
