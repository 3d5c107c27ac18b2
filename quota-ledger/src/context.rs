//! Call context and the collaborators that supply it
//!
//! The engine never reads ambient time or identity. Hosts capture both once
//! per call into a [`CallContext`] and pass it to the operation.

use crate::types::{AccountId, Height};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current logical time
pub trait Clock: Send + Sync {
    /// Current height; never decreases across calls
    fn now(&self) -> Height;
}

/// Source of the calling identity
pub trait IdentitySource {
    /// Identity invoking the current operation
    fn sender(&self) -> AccountId;
}

/// A fixed identity is its own source
impl IdentitySource for AccountId {
    fn sender(&self) -> AccountId {
        self.clone()
    }
}

/// Sender and height for a single operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Caller identity
    pub sender: AccountId,

    /// Clock value at call time
    pub now: Height,
}

impl CallContext {
    /// Build a context directly
    pub fn new(sender: impl Into<AccountId>, now: Height) -> Self {
        Self {
            sender: sender.into(),
            now,
        }
    }

    /// Read both collaborators once
    pub fn capture(identity: &impl IdentitySource, clock: &(impl Clock + ?Sized)) -> Self {
        Self {
            sender: identity.sender(),
            now: clock.now(),
        }
    }
}

/// Clock driven by the host (tests, simulations, block followers)
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    /// Start at `height`
    pub fn new(height: Height) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    /// Move forward by `delta`, returning the new height
    ///
    /// Saturates at `Height::MAX`.
    pub fn advance(&self, delta: u64) -> Height {
        let previous = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |height| {
                Some(height.saturating_add(delta))
            })
            .unwrap_or_else(|height| height);
        previous.saturating_add(delta)
    }

    /// Move to `height`; ignored if it would go backwards
    pub fn set(&self, height: Height) -> Height {
        self.height.fetch_max(height, Ordering::SeqCst).max(height)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Height {
        self.height.load(Ordering::SeqCst)
    }
}
