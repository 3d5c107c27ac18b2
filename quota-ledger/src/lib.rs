//! Quota Ledger Core
//!
//! Issues, tracks, subdivides and retires numbered allocation records
//! ("quotas") that grant a capped right to consume a resource from a named
//! pool, with consumption reported by an oracle.
//!
//! # Architecture
//!
//! - **Explicit state**: [`QuotaLedger`] owns all maps and counters; nothing is global
//! - **Check-then-commit**: every operation validates fully before mutating
//! - **Injected collaborators**: sender and height arrive as a [`CallContext`]
//! - **Single Writer**: the [`actor`] host serializes concurrent callers
//! - **Journal**: each commit appends a hash-chained [`LedgerEvent`]
//!
//! # Invariants
//!
//! - Ownership, terms and usage share one contiguous key set `1..next_quota_id`
//! - Quota ids strictly increase and are never reused
//! - Pool issuance never exceeds the pool cap
//! - A rejected operation changes nothing
//! - Deterministic replay: same journal → same state

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod state;
pub mod types;

// Re-exports
pub use actor::{spawn_ledger_actor, LedgerHandle};
pub use command::{CommandOutput, LedgerCommand};
pub use config::{ActorConfig, Config, LedgerParams, LoggingConfig};
pub use context::{CallContext, Clock, IdentitySource, ManualClock};
pub use error::{Error, Rejection, Result, TxResult};
pub use journal::{EventKind, EventType, Journal, LedgerEvent};
pub use ledger::QuotaLedger;
pub use logging::init_tracing;
pub use metrics::Metrics;
pub use state::LedgerState;
pub use types::{AccountId, Height, MintRequest, PoolId, QuotaId, QuotaTerms, QuotaUsage};
