//! Actor execution context: everything an actor can do from its own thread.

use std::sync::Arc;
use std::time::Duration;

use crate::actor::{handle::ActorHandle, runtime::Runtime, Actor, ActorCell, Filter, Unstarted};
use crate::error::{fatal, SendError, SpawnError};
use crate::mailbox::Mailbox;
use crate::registry::reclaim;
use crate::types::{Address, Message};

/// Actor execution context.
///
/// Lives on the actor's thread for the actor's whole life and is passed to
/// every callback. It owns the consumer side of the inbox, the filter buffer
/// and the filter itself; since nothing else can reach them, popping needs no
/// synchronisation beyond the mailbox's own.
pub struct ActorContext<A: Actor> {
    runtime: Runtime,
    cell: Arc<ActorCell>,
    buffer: Mailbox,
    filter: Option<Filter<A>>,
    parent: Option<Address>,
    idle_timeout: Option<Duration>,
    exiting: bool,
}

impl<A: Actor> ActorContext<A> {
    pub(crate) fn new(
        runtime: Runtime,
        cell: Arc<ActorCell>,
        filter: Option<Filter<A>>,
        parent: Option<Address>,
    ) -> Self {
        let idle_timeout = runtime.config().idle_timeout;
        Self {
            runtime,
            cell,
            buffer: Mailbox::new(),
            filter,
            parent,
            idle_timeout,
            exiting: false,
        }
    }

    /// Returns this actor's address.
    pub fn address(&self) -> Address {
        self.cell.address()
    }

    /// Returns the address of the actor that started this one, if any.
    pub fn parent(&self) -> Option<Address> {
        self.parent
    }

    /// Returns the runtime this actor belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Sends `msg` to the actor at `to`, stamped with this actor's address.
    ///
    /// # Panics
    /// Treats every [`SendError`] as fatal: zero destination, zero message
    /// kind, or no live actor at `to`.
    pub fn say(&self, to: impl Into<Address>, msg: Message) {
        if let Err(err) = self.try_say(to, msg) {
            fatal("actor send failed", err);
        }
    }

    /// Sends `msg`, reporting contract violations instead of failing.
    ///
    /// On error the message is dropped.
    pub fn try_say(&self, to: impl Into<Address>, msg: Message) -> Result<(), SendError> {
        self.runtime.deliver(self.address(), to.into(), msg)
    }

    /// Starts a child actor, recording this actor as its parent.
    ///
    /// # Panics
    /// Treats every [`SpawnError`] as fatal.
    pub fn start<B: Actor>(&self, child: Unstarted<B>) -> ActorHandle {
        match self.try_start(child) {
            Ok(handle) => handle,
            Err(err) => fatal("actor start failed", err),
        }
    }

    /// Starts a child actor, reporting failures.
    pub fn try_start<B: Actor>(&self, child: Unstarted<B>) -> Result<ActorHandle, SpawnError> {
        self.runtime.launch(child, Some(self.address()))
    }

    /// Returns true if an actor is registered at `address`.
    pub fn exists(&self, address: impl Into<Address>) -> bool {
        self.runtime.exists(address)
    }

    /// Ends this actor once the running callback returns.
    ///
    /// No further messages are delivered. The runtime then calls
    /// [`Actor::on_exit`], deregisters the address, waits out a grace period
    /// so no sender is still pushing into the inbox, releases every
    /// undelivered message and the actor's state, and ends the thread.
    pub fn exit(&mut self) {
        self.exiting = true;
    }

    /// Returns true once [`exit`](Self::exit) has been requested.
    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// Suspends until a message arrives or `timeout` elapses.
    ///
    /// Returns true if woken by a delivery. May return early if a delivery
    /// raced with an earlier pop.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        self.cell.signal().wait(timeout)
    }

    /// Replaces the inbox filter; `None` accepts everything.
    ///
    /// Previously rejected messages are moved back to the tail of the inbox,
    /// in their original order, to be judged by the new filter.
    pub fn set_filter(&mut self, filter: Option<Filter<A>>) {
        self.filter = filter;
        // SAFETY: this thread is the buffer's only consumer.
        unsafe { self.buffer.splice_into(self.cell.inbox()) };
    }

    /// Returns true if the raw inbox holds anything, filtered or not.
    pub fn has_messages(&self) -> bool {
        // SAFETY: this thread is the inbox's only consumer.
        unsafe { self.cell.inbox().has_messages() }
    }

    /// Pops the oldest message the filter accepts.
    ///
    /// Rejected messages move to the buffer. Returns `None` once the inbox
    /// is empty, and always after [`exit`](Self::exit) has been requested.
    pub fn pop(&mut self, actor: &A) -> Option<Message> {
        if self.exiting {
            return None;
        }
        loop {
            // SAFETY: this thread is the inbox's only consumer.
            let msg = unsafe { self.cell.inbox().pop() }?;
            match &self.filter {
                Some(filter) if !filter.accepts(actor, &msg) => self.buffer.push(msg),
                _ => return Some(msg),
            }
        }
    }

    /// Delivers messages to [`Actor::hear`] until the actor exits, sleeping
    /// whenever the inbox has nothing acceptable.
    pub fn receive_loop(&mut self, actor: &mut A) {
        while !self.exiting {
            match self.pop(actor) {
                Some(msg) => actor.hear(msg, self),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(address = %self.address(), "inbox empty, waiting");
                    self.cell.signal().wait(self.idle_timeout);
                }
            }
        }
    }

    pub(crate) fn bind_thread(&self) {
        self.cell.signal().bind_current();
        debug_assert!(
            self.runtime.exists(self.address()),
            "actor {} running before its registration is visible",
            self.address()
        );
    }

    /// Deregisters and releases everything the actor still owns.
    pub(crate) fn finish(self) {
        let address = self.address();
        if let Err(err) = self.runtime.registry().remove(address) {
            fatal("actor exit failed", err);
        }
        reclaim::synchronize();

        // SAFETY: this thread is the only consumer of both mailboxes, and
        // after the grace period no sender can still reach the inbox.
        let dropped = unsafe { self.cell.inbox().drain() + self.buffer.drain() };

        #[cfg(feature = "tracing")]
        tracing::debug!(%address, dropped, "actor exited");

        #[cfg(not(feature = "tracing"))]
        let _ = dropped;
    }
}
