//! Error types surfaced by the actor runtime.
//!
//! Every contract violation has a typed error so `try_*` callers can inspect
//! it, but the plain operations treat them as fatal: see [`fatal`].

use std::fmt::Display;

use thiserror::Error;

use crate::types::Address;

/// Failures encountered when starting an actor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// The actor was never given a nonzero address.
    #[error("actor address must be nonzero")]
    InvalidAddress,
    /// Another live actor already owns this address.
    #[error("address {0} is already registered")]
    DuplicateAddress(Address),
    /// The OS refused to create the actor's thread.
    #[error("failed to spawn thread for actor {address}: {reason}")]
    Thread {
        /// Address the actor would have run under.
        address: Address,
        /// Error reported by the OS.
        reason: String,
    },
}

/// Failures encountered while sending a message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The destination address is zero.
    #[error("cannot send to the zero address")]
    InvalidAddress,
    /// The message kind is zero, which is reserved.
    #[error("message kind must be nonzero")]
    InvalidKind,
    /// No live actor is registered under the destination address.
    #[error("no actor registered at address {0}")]
    NoSuchActor(Address),
}

/// Errors reported by the address registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The address already has a live entry.
    #[error("address {0} is already registered")]
    Duplicate(Address),
    /// The address has no entry.
    #[error("address {0} is not registered")]
    Missing(Address),
}

impl From<RegistryError> for SpawnError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::Duplicate(address) => SpawnError::DuplicateAddress(address),
            RegistryError::Missing(_) => SpawnError::InvalidAddress,
        }
    }
}

/// Reports a broken runtime contract and unwinds.
///
/// On an actor thread the unwind is caught at the thread boundary and the
/// process aborts; on a driver thread it propagates like any panic.
#[track_caller]
pub(crate) fn fatal(context: &str, err: impl Display) -> ! {
    #[cfg(feature = "tracing")]
    tracing::error!(error = %err, "{context}");

    panic!("{context}: {err}")
}
