#![warn(missing_docs)]
//! Thread Actors is a small actor runtime that gives every actor its own OS
//! thread and a 64-bit address.
//!
//! # Overview
//! - Actors talk only by moving [`Message`]s into each other's inboxes.
//! - Addresses resolve through a lock-free registry; lookups never block and
//!   an exiting actor waits out a grace period before releasing its inbox.
//! - Inboxes are wait-free multi-producer, single-consumer queues.
//! - Filters let an actor defer messages it is not ready for without losing
//!   their order.
//! - An actor with an empty inbox sleeps until a message arrives.
//! - See `demos/ring.rs` for a runnable end-to-end example.
//!
//! ```rust,no_run
//! use thread_actors::{Actor, ActorContext, ActorExt, Message, Runtime};
//!
//! const PING: u32 = 1;
//!
//! #[derive(Default)]
//! struct Counter {
//!     seen: u32,
//! }
//!
//! impl Actor for Counter {
//!     fn hear(&mut self, _msg: Message, ctx: &mut ActorContext<Self>) {
//!         self.seen += 1;
//!         if self.seen == 3 {
//!             ctx.exit();
//!         }
//!     }
//! }
//!
//! let runtime = Runtime::init();
//! runtime.start(Counter::default().at(1));
//! for _ in 0..3 {
//!     runtime.post(1, Message::new(PING));
//! }
//! runtime.wait_quiescent();
//! ```

pub mod actor;
pub mod error;
pub mod mailbox;
pub(crate) mod registry;
pub mod types;

pub use actor::{
    context::ActorContext,
    handle::ActorHandle,
    runtime::{Runtime, RuntimeConfig},
    Actor, ActorExt, Filter, Unstarted,
};
pub use error::{RegistryError, SendError, SpawnError};
pub use mailbox::{signal::IdleSignal, Mailbox};
pub use types::{Address, Message, Payload};
