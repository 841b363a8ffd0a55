//! Handle returned when an actor starts.

use std::thread::{self, JoinHandle, Thread};

use crate::types::Address;

/// Owner's view of a started actor: its address and its thread.
///
/// Dropping the handle detaches the thread; the actor keeps running until
/// it exits on its own.
#[derive(Debug)]
pub struct ActorHandle {
    address: Address,
    thread: JoinHandle<()>,
}

impl ActorHandle {
    pub(crate) fn new(address: Address, thread: JoinHandle<()>) -> Self {
        Self { address, thread }
    }

    /// Returns the address the actor registered under.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the actor's thread.
    pub fn thread(&self) -> &Thread {
        self.thread.thread()
    }

    /// Returns true once the actor's thread has finished, which happens only
    /// after it exited and released its memory.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Blocks until the actor has exited and released its memory.
    pub fn join(self) -> thread::Result<()> {
        self.thread.join()
    }
}
