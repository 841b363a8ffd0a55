use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::actor::{context::ActorContext, handle::ActorHandle, Actor, ActorCell, Unstarted};
use crate::error::{fatal, SendError, SpawnError};
use crate::registry::{reclaim, Registry, DEFAULT_BUCKETS};
use crate::types::{Address, Message};

const ACTORS_PER_BUCKET: usize = 4;

/// Configuration for a [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of registry buckets, rounded up to a power of two.
    ///
    /// The table never resizes, and each start or exit copies its bucket,
    /// so the cost of both grows with actors per bucket. Keep the expected
    /// peak actor count within a small multiple of this (say 8x); see
    /// [`with_expected_actors`](Self::with_expected_actors).
    pub registry_buckets: usize,
    /// Sleep between emptiness probes in [`Runtime::wait_quiescent`].
    pub quiescence_poll: Duration,
    /// Upper bound on one idle sleep of the receive loop. `None` sleeps
    /// until a message arrives.
    pub idle_timeout: Option<Duration>,
    /// Stack size for actor threads; `None` uses the platform default.
    pub stack_size: Option<usize>,
    /// Prefix for actor thread names.
    pub thread_name_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            registry_buckets: DEFAULT_BUCKETS,
            quiescence_poll: Duration::from_millis(1),
            idle_timeout: None,
            stack_size: None,
            thread_name_prefix: "actor".to_owned(),
        }
    }
}

impl RuntimeConfig {
    /// Sets the registry bucket count.
    pub fn with_registry_buckets(mut self, buckets: usize) -> Self {
        self.registry_buckets = buckets;
        self
    }

    /// Sizes the registry for about `actors` concurrently live actors, at
    /// most four per bucket on average. Never shrinks below the default.
    pub fn with_expected_actors(mut self, actors: usize) -> Self {
        let buckets = actors.div_ceil(ACTORS_PER_BUCKET).next_power_of_two();
        self.registry_buckets = buckets.max(DEFAULT_BUCKETS);
        self
    }

    /// Sets the quiescence probe interval.
    pub fn with_quiescence_poll(mut self, poll: Duration) -> Self {
        self.quiescence_poll = poll;
        self
    }

    /// Bounds each idle sleep of the receive loop.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Sets the default actor thread stack size.
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Sets the actor thread name prefix.
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Shared runtime context: the address registry plus configuration.
///
/// Cheap to clone; every clone refers to the same registry. Independent
/// runtimes do not see each other's actors.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    config: RuntimeConfig,
    registry: Registry,
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    pub fn init() -> Self {
        Self::new(RuntimeConfig::default())
    }

    /// Creates a runtime.
    pub fn new(config: RuntimeConfig) -> Self {
        let registry = Registry::with_buckets(config.registry_buckets);
        Self {
            inner: Arc::new(RuntimeInner { config, registry }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Wraps `state` as an actor ready to be configured and started.
    pub fn alloc<A: Actor>(&self, state: A) -> Unstarted<A> {
        Unstarted::new(state)
    }

    /// Allocates an actor with default-initialised state.
    pub fn alloc_default<A: Actor + Default>(&self) -> Unstarted<A> {
        Unstarted::new(A::default())
    }

    /// Registers the actor under its address and spawns its thread.
    ///
    /// # Panics
    /// Treats every [`SpawnError`] as fatal: zero address, an address that
    /// is already live, or a thread the OS refused to create.
    pub fn start<A: Actor>(&self, actor: Unstarted<A>) -> ActorHandle {
        match self.try_start(actor) {
            Ok(handle) => handle,
            Err(err) => fatal("actor start failed", err),
        }
    }

    /// Registers the actor and spawns its thread, reporting failures.
    pub fn try_start<A: Actor>(&self, actor: Unstarted<A>) -> Result<ActorHandle, SpawnError> {
        self.launch(actor, None)
    }

    pub(crate) fn launch<A: Actor>(
        &self,
        actor: Unstarted<A>,
        parent: Option<Address>,
    ) -> Result<ActorHandle, SpawnError> {
        let Unstarted {
            state,
            address,
            inbox,
            filter,
            name,
            stack_size,
        } = actor;
        if !address.is_valid() {
            return Err(SpawnError::InvalidAddress);
        }

        let cell = Arc::new(ActorCell::with_inbox(address, inbox));
        // Registering before the spawn means the new thread can always
        // resolve its own address.
        self.inner
            .registry
            .insert_if_absent(address, Arc::clone(&cell))?;

        let config = &self.inner.config;
        let mut builder = thread::Builder::new().name(
            name.unwrap_or_else(|| format!("{}-{address}", config.thread_name_prefix)),
        );
        if let Some(bytes) = stack_size.or(config.stack_size) {
            builder = builder.stack_size(bytes);
        }

        let runtime = self.clone();
        let spawned = builder.spawn(move || {
            let ctx = ActorContext::new(runtime, cell, filter, parent);
            run_actor(state, ctx);
        });

        match spawned {
            Ok(thread) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%address, parent = ?parent, "actor started");
                Ok(ActorHandle::new(address, thread))
            }
            Err(err) => {
                // Nothing else removes an address whose thread never ran.
                if let Err(missing) = self.inner.registry.remove(address) {
                    fatal("actor start rollback failed", missing);
                }
                Err(SpawnError::Thread {
                    address,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Sends `msg` from outside any actor; the sender reads as
    /// [`Address::NONE`].
    ///
    /// # Panics
    /// Treats every [`SendError`] as fatal.
    pub fn post(&self, to: impl Into<Address>, msg: Message) {
        if let Err(err) = self.try_post(to, msg) {
            fatal("send failed", err);
        }
    }

    /// Sends `msg` from outside any actor, reporting failures.
    pub fn try_post(&self, to: impl Into<Address>, msg: Message) -> Result<(), SendError> {
        self.deliver(Address::NONE, to.into(), msg)
    }

    pub(crate) fn deliver(
        &self,
        from: Address,
        to: Address,
        mut msg: Message,
    ) -> Result<(), SendError> {
        if !to.is_valid() {
            return Err(SendError::InvalidAddress);
        }
        if msg.kind() == 0 {
            return Err(SendError::InvalidKind);
        }
        msg.stamp(from);

        // The push stays inside the read section: an exiting target waits
        // for it before draining its inbox.
        let guard = reclaim::read();
        let target = self
            .inner
            .registry
            .lookup(to, &guard)
            .ok_or(SendError::NoSuchActor(to))?;
        target.deliver(msg);
        Ok(())
    }

    /// Returns true if an actor is registered at `address`.
    pub fn exists(&self, address: impl Into<Address>) -> bool {
        self.inner.registry.contains(address.into())
    }

    /// Number of registered actors.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns true when no actor is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Addresses of the registered actors, in no particular order.
    pub fn addresses(&self) -> Vec<Address> {
        self.inner.registry.addresses()
    }

    /// Blocks until no actor is registered.
    pub fn wait_quiescent(&self) {
        while !self.is_empty() {
            thread::sleep(self.inner.config.quiescence_poll);
        }
    }

    /// Like [`wait_quiescent`](Self::wait_quiescent) but gives up after
    /// `timeout`. Returns true if the runtime became quiescent.
    pub fn wait_quiescent_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait_quiescent();
            return true;
        };
        loop {
            if self.is_empty() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(self.inner.config.quiescence_poll.min(deadline - now));
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::init()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

/// Body of every actor thread.
fn run_actor<A: Actor>(mut state: A, mut ctx: ActorContext<A>) {
    let address = ctx.address();
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
        ctx.bind_thread();
        state.listen(&mut ctx);
        ctx.exit();
        state.on_exit(&mut ctx);
        ctx.finish();
        drop(state);
    }));

    if outcome.is_err() {
        // A half-run actor may still be registered; nothing can be trusted.
        #[cfg(feature = "tracing")]
        tracing::error!(%address, "actor thread panicked, aborting");

        #[cfg(not(feature = "tracing"))]
        let _ = address;

        process::abort();
    }
}
