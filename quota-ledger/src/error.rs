//! Error types for the quota ledger
//!
//! Two layers:
//! - [`Rejection`]: an expected, caller-visible refusal of a ledger operation,
//!   carrying a stable numeric code (100-119)
//! - [`Error`]: infrastructure failures around the engine (actor, journal,
//!   configuration, metrics)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for ledger transitions
pub type TxResult<T> = std::result::Result<T, Rejection>;

/// Rejection of a ledger operation
///
/// Discriminants are the stable numeric codes callers assert on.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Rejection {
    /// Caller lacks the administrative right for this action
    #[error("not authorized")]
    NotAuthorized = 100,

    /// Quota id was never minted
    #[error("quota not found")]
    QuotaNotFound = 101,

    /// Recipient is not acceptable (self-mint)
    #[error("invalid recipient")]
    InvalidRecipient = 102,

    /// Amount is zero
    #[error("invalid amount")]
    InvalidAmount = 103,

    /// Pool identifier is empty or too long
    #[error("invalid pool identifier")]
    InvalidPool = 104,

    /// Expiration is below the minimum threshold
    #[error("invalid expiration")]
    InvalidExpiration = 105,

    /// Reserved
    #[error("quota locked")]
    QuotaLocked = 106,

    /// Quota is not burnable
    #[error("burn not permitted")]
    BurnFailed = 107,

    /// Reserved
    #[error("quota already minted")]
    QuotaAlreadyMinted = 108,

    /// Caller is not the current owner
    #[error("caller is not the quota owner")]
    InvalidOwner = 109,

    /// Ledger-wide freeze is active
    #[error("ledger is frozen")]
    QuotaFrozen = 110,

    /// Terms record missing for this id
    #[error("quota terms not set")]
    MetadataNotSet = 111,

    /// Caller is neither the oracle nor the admin
    #[error("oracle not authorized")]
    OracleNotAuthorized = 112,

    /// Usage or split would exceed the granted amount
    #[error("insufficient quota")]
    InsufficientQuota = 113,

    /// Burn amount exceeds the available remainder
    #[error("burn amount exceeds available remainder")]
    BurnAmountExceeds = 114,

    /// Quota is not transferable
    #[error("transfer not permitted")]
    TransferLocked = 115,

    /// Quota is past its expiration height
    #[error("quota expired")]
    QuotaExpired = 116,

    /// Reserved
    #[error("invalid quota id")]
    InvalidQuotaId = 117,

    /// Aggregate pool cap would be exceeded
    #[error("pool cap reached")]
    MaxQuotaReached = 118,

    /// Quota does not allow fractional splits
    #[error("fractional split not permitted")]
    InvalidFractional = 119,
}

impl Rejection {
    /// Every rejection, in code order
    pub const ALL: [Rejection; 20] = [
        Rejection::NotAuthorized,
        Rejection::QuotaNotFound,
        Rejection::InvalidRecipient,
        Rejection::InvalidAmount,
        Rejection::InvalidPool,
        Rejection::InvalidExpiration,
        Rejection::QuotaLocked,
        Rejection::BurnFailed,
        Rejection::QuotaAlreadyMinted,
        Rejection::InvalidOwner,
        Rejection::QuotaFrozen,
        Rejection::MetadataNotSet,
        Rejection::OracleNotAuthorized,
        Rejection::InsufficientQuota,
        Rejection::BurnAmountExceeds,
        Rejection::TransferLocked,
        Rejection::QuotaExpired,
        Rejection::InvalidQuotaId,
        Rejection::MaxQuotaReached,
        Rejection::InvalidFractional,
    ];

    /// Stable numeric code
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a rejection by its numeric code
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }
}

impl From<Rejection> for u16 {
    fn from(rejection: Rejection) -> Self {
        rejection.code()
    }
}

/// Ledger infrastructure errors
#[derive(Error, Debug)]
pub enum Error {
    /// Operation rejected by the engine
    #[error("Rejected with code {}: {}", .0.code(), .0)]
    Rejected(#[from] Rejection),

    /// Invariant violation (key sets, id contiguity, pool caps)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Journal hash chain or replay mismatch
    #[error("Journal integrity violation at sequence {sequence}: {reason}")]
    JournalIntegrity {
        /// Sequence number of the offending event
        sequence: u64,
        /// What went wrong
        reason: String,
    },

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Rejection carried by this error, if any
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Error::Rejected(rejection) => Some(*rejection),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
