//! Core actor trait and the state an actor carries before it starts.

/// Actor execution context.
pub mod context;
/// Join handle for started actors.
pub mod handle;
/// Runtime, configuration and the actor thread lifecycle.
pub mod runtime;

use std::fmt;

use crate::error::SendError;
use crate::mailbox::{signal::IdleSignal, Mailbox};
use crate::types::{Address, Message};
use context::ActorContext;

/// Primary trait implemented by all actors.
///
/// The implementing type is the actor's private state. It is moved onto the
/// actor's own thread when the actor starts and is never touched by any
/// other thread afterwards, so handlers take `&mut self` without locking.
pub trait Actor: Sized + Send + 'static {
    /// Entry point, run once on the actor's thread.
    ///
    /// The default runs [`ActorContext::receive_loop`], delivering every
    /// message to [`hear`](Actor::hear) until the actor exits. Override it
    /// for actors that do a fixed piece of work instead; returning from
    /// `listen` exits the actor.
    fn listen(&mut self, ctx: &mut ActorContext<Self>) {
        ctx.receive_loop(self);
    }

    /// Handles one message popped from the inbox.
    ///
    /// Only actors that rely on the default [`listen`](Actor::listen) need
    /// this; the default treats a delivered message as a broken contract.
    fn hear(&mut self, msg: Message, ctx: &mut ActorContext<Self>) {
        let _ = msg;
        crate::error::fatal(
            "message delivered to an actor without a handler",
            ctx.address(),
        )
    }

    /// Called on the actor's thread after it stops receiving and before it
    /// deregisters. Messages can still be sent from here.
    fn on_exit(&mut self, _ctx: &mut ActorContext<Self>) {}
}

/// Predicate deciding which inbox messages an actor accepts right now.
///
/// Rejected messages are parked in the actor's buffer until the filter
/// changes.
pub struct Filter<A>(Box<dyn Fn(&A, &Message) -> bool + Send>);

impl<A> Filter<A> {
    /// Wraps a predicate over the actor's state and a candidate message.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&A, &Message) -> bool + Send + 'static,
    {
        Self(Box::new(predicate))
    }

    /// Accepts only messages of the given kind.
    pub fn kind(kind: u32) -> Self
    where
        A: 'static,
    {
        Self::new(move |_, msg| msg.kind() == kind)
    }

    /// Evaluates the predicate.
    pub fn accepts(&self, actor: &A, msg: &Message) -> bool {
        (self.0)(actor, msg)
    }
}

impl<A> fmt::Debug for Filter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter(..)")
    }
}

/// The part of an actor other threads may reach through the registry.
#[derive(Debug)]
pub(crate) struct ActorCell {
    address: Address,
    inbox: Mailbox,
    signal: IdleSignal,
}

impl ActorCell {
    #[cfg(test)]
    pub(crate) fn new(address: Address) -> Self {
        Self::with_inbox(address, Mailbox::new())
    }

    /// Wraps an inbox that may already hold preloaded messages.
    pub(crate) fn with_inbox(address: Address, inbox: Mailbox) -> Self {
        Self {
            address,
            inbox,
            signal: IdleSignal::new(),
        }
    }

    pub(crate) fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn inbox(&self) -> &Mailbox {
        &self.inbox
    }

    pub(crate) fn signal(&self) -> &IdleSignal {
        &self.signal
    }

    /// Queues `msg` and wakes the owner if it is idle.
    pub(crate) fn deliver(&self, msg: Message) {
        self.inbox.push(msg);
        self.signal.notify();
    }
}

/// An allocated actor that has not been started yet.
///
/// Produced by [`Runtime::alloc`](runtime::Runtime::alloc). Configure it with
/// the `with_*` methods, optionally preload its inbox, then hand it to
/// [`Runtime::start`](runtime::Runtime::start).
pub struct Unstarted<A: Actor> {
    pub(crate) state: A,
    pub(crate) address: Address,
    pub(crate) inbox: Mailbox,
    pub(crate) filter: Option<Filter<A>>,
    pub(crate) name: Option<String>,
    pub(crate) stack_size: Option<usize>,
}

impl<A: Actor> Unstarted<A> {
    pub(crate) fn new(state: A) -> Self {
        Self {
            state,
            address: Address::NONE,
            inbox: Mailbox::new(),
            filter: None,
            name: None,
            stack_size: None,
        }
    }

    /// Sets the address the actor will claim when started.
    pub fn with_address(mut self, address: impl Into<Address>) -> Self {
        self.address = address.into();
        self
    }

    /// Installs an inbox filter that applies from the first pop.
    pub fn with_filter(mut self, filter: Filter<A>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Names the actor's thread. Defaults to `<prefix>-<address>`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the runtime's thread stack size for this actor.
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Queues a message before the actor is reachable by address.
    ///
    /// The message keeps whatever sender it carries.
    ///
    /// # Panics
    /// Treats a zero message kind as fatal, like a send.
    pub fn push(&self, msg: Message) {
        if let Err(err) = self.try_push(msg) {
            crate::error::fatal("actor preload failed", err);
        }
    }

    /// Queues a message before start, rejecting the reserved zero kind.
    pub fn try_push(&self, msg: Message) -> Result<(), SendError> {
        if msg.kind() == 0 {
            return Err(SendError::InvalidKind);
        }
        self.inbox.push(msg);
        Ok(())
    }

    /// Returns the configured address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the actor's state.
    pub fn state(&self) -> &A {
        &self.state
    }

    /// Returns the actor's state mutably.
    pub fn state_mut(&mut self) -> &mut A {
        &mut self.state
    }
}

impl<A: Actor + fmt::Debug> fmt::Debug for Unstarted<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unstarted")
            .field("state", &self.state)
            .field("address", &self.address)
            .field("filter", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

/// Convenience trait for turning actor state into a startable actor.
pub trait ActorExt: Actor {
    /// Wraps the state as an unstarted actor that will claim `address`.
    ///
    /// # Example
    /// ```no_run
    /// # use thread_actors::{Actor, ActorContext, ActorExt, Message, Runtime};
    /// struct Echo;
    ///
    /// impl Actor for Echo {
    ///     fn hear(&mut self, msg: Message, ctx: &mut ActorContext<Self>) {
    ///         if msg.from().is_valid() {
    ///             ctx.say(msg.from(), msg);
    ///         }
    ///     }
    /// }
    ///
    /// let runtime = Runtime::init();
    /// runtime.start(Echo.at(1));
    /// ```
    fn at(self, address: impl Into<Address>) -> Unstarted<Self> {
        Unstarted::new(self).with_address(address)
    }
}

impl<T> ActorExt for T where T: Actor {}
