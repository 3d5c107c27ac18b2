//! Core types for the quota ledger
//!
//! All types are designed for:
//! - Serde derives with transparent newtypes
//! - Fixed shape: terms and usage are plain structs, never open maps
//! - Exact integer arithmetic (quantities are `u64`)

use crate::error::{Rejection, TxResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical clock value (block height)
pub type Height = u64;

/// Caller identity (principal address)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Quota identifier, allocated sequentially from 1
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct QuotaId(u64);

impl QuotaId {
    /// First id handed out by a fresh ledger
    pub const FIRST: QuotaId = QuotaId(1);

    /// Wrap a raw id
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }

    /// The id that follows this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for QuotaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for QuotaId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Validated resource pool name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(String);

impl PoolId {
    /// Default upper bound on pool name length, in characters
    pub const MAX_LEN: usize = 50;

    /// Validate a pool name: non-empty and at most `max_len` characters
    pub fn parse(raw: &str, max_len: usize) -> TxResult<Self> {
        let len = raw.chars().count();
        if len == 0 || len > max_len {
            return Err(Rejection::InvalidPool);
        }
        Ok(Self(raw.to_string()))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terms attached to a quota
///
/// Everything except `amount` and `locked` is fixed at mint (or split) time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaTerms {
    /// Pool the quota draws from
    pub pool_id: PoolId,

    /// Remaining granted quantity
    pub amount: u64,

    /// Height after which the quota is expired
    pub expiration_height: Height,

    /// Height at mint or split
    pub issued_at: Height,

    /// Advisory lock flag
    pub locked: bool,

    /// Owner may transfer
    pub transferable: bool,

    /// Owner may burn
    pub burnable: bool,

    /// Owner may split
    pub fractional_allowed: bool,
}

impl QuotaTerms {
    /// Expired once the clock has passed the expiration height
    pub fn is_expired_at(&self, now: Height) -> bool {
        self.expiration_height < now
    }

    /// Terms for a quota carved out of `self` by a split
    pub(crate) fn split_off(&self, amount: u64, now: Height) -> Self {
        Self {
            pool_id: self.pool_id.clone(),
            amount,
            expiration_height: self.expiration_height,
            issued_at: now,
            locked: false,
            transferable: self.transferable,
            burnable: self.burnable,
            fractional_allowed: self.fractional_allowed,
        }
    }
}

/// Consumption tracked against a quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Cumulative amount consumed
    pub used: u64,

    /// Height of the last mutation
    pub last_updated: Height,
}

impl QuotaUsage {
    /// Zeroed usage stamped at `now`
    pub fn fresh(now: Height) -> Self {
        Self {
            used: 0,
            last_updated: now,
        }
    }
}

/// Arguments to a mint
///
/// Flags default to permissive; use the builder methods to restrict them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    /// Initial owner
    pub recipient: AccountId,

    /// Pool name (validated at mint)
    pub pool_id: String,

    /// Granted quantity
    pub amount: u64,

    /// Expiration height
    pub expiration: Height,

    /// Owner may transfer
    pub transferable: bool,

    /// Owner may burn
    pub burnable: bool,

    /// Owner may split
    pub fractional_allowed: bool,
}

impl MintRequest {
    /// New request with every capability enabled
    pub fn new(
        recipient: impl Into<AccountId>,
        pool_id: impl Into<String>,
        amount: u64,
        expiration: Height,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            pool_id: pool_id.into(),
            amount,
            expiration,
            transferable: true,
            burnable: true,
            fractional_allowed: true,
        }
    }

    /// Set the transferable flag
    pub fn transferable(mut self, transferable: bool) -> Self {
        self.transferable = transferable;
        self
    }

    /// Set the burnable flag
    pub fn burnable(mut self, burnable: bool) -> Self {
        self.burnable = burnable;
        self
    }

    /// Set the fractional flag
    pub fn fractional_allowed(mut self, fractional_allowed: bool) -> Self {
        self.fractional_allowed = fractional_allowed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_id_bounds() {
        assert_eq!(PoolId::parse("", PoolId::MAX_LEN), Err(Rejection::InvalidPool));
        assert!(PoolId::parse(&"a".repeat(50), PoolId::MAX_LEN).is_ok());
        assert_eq!(
            PoolId::parse(&"a".repeat(51), PoolId::MAX_LEN),
            Err(Rejection::InvalidPool)
        );
    }

    #[test]
    fn test_pool_id_counts_characters_not_bytes() {
        // 50 two-byte characters
        let name = "é".repeat(50);
        assert!(PoolId::parse(&name, PoolId::MAX_LEN).is_ok());
    }

    #[test]
    fn test_quota_id_next() {
        assert_eq!(QuotaId::FIRST.next(), QuotaId::new(2));
        assert_eq!(QuotaId::new(41).next().get(), 42);
    }

    #[test]
    fn test_expiry_is_strict() {
        let terms = QuotaTerms {
            pool_id: PoolId::parse("Basin1", PoolId::MAX_LEN).unwrap(),
            amount: 10,
            expiration_height: 2030,
            issued_at: 1000,
            locked: false,
            transferable: true,
            burnable: true,
            fractional_allowed: true,
        };
        assert!(!terms.is_expired_at(2030));
        assert!(terms.is_expired_at(2031));
    }

    #[test]
    fn test_split_off_inherits_flags() {
        let terms = QuotaTerms {
            pool_id: PoolId::parse("Basin1", PoolId::MAX_LEN).unwrap(),
            amount: 10,
            expiration_height: 2030,
            issued_at: 1000,
            locked: true,
            transferable: false,
            burnable: true,
            fractional_allowed: true,
        };
        let child = terms.split_off(4, 1200);
        assert_eq!(child.amount, 4);
        assert_eq!(child.issued_at, 1200);
        assert!(!child.locked);
        assert!(!child.transferable);
        assert_eq!(child.pool_id, terms.pool_id);
    }

    #[test]
    fn test_mint_request_builder() {
        let request = MintRequest::new("R", "Basin1", 5000, 2030).burnable(false);
        assert!(request.transferable);
        assert!(!request.burnable);
        assert!(request.fractional_allowed);
    }
}
