//! Wait-free multi-producer, single-consumer message queue.
//!
//! Every actor owns two mailboxes: the live inbox that other actors push
//! into, and a buffer holding messages its filter rejected. The queue is a
//! linked list with a stub node at the consumer end. A push is one swap on
//! the tail followed by one store linking the previous tail to the new node;
//! between those two steps the chain is briefly broken, and the consumer
//! waits for the link rather than reporting the queue empty.

pub mod signal;

use std::cell::UnsafeCell;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::types::Message;

struct Node {
    next: AtomicPtr<Node>,
    msg: Option<Message>,
}

impl Node {
    fn alloc(msg: Option<Message>) -> *mut Node {
        Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(ptr::null_mut()),
            msg,
        }))
    }
}

/// Multi-producer, single-consumer FIFO of [`Message`]s.
///
/// [`push`](Mailbox::push) is safe from any thread. The consumer-side
/// operations are `unsafe`: at most one thread may run them at a time.
/// Actors never expose their mailboxes directly; the runtime guarantees the
/// single-consumer rule by only consuming from the actor's own thread.
pub struct Mailbox {
    /// Consumer end: the stub node, i.e. the last node popped.
    head: CachePadded<UnsafeCell<*mut Node>>,
    tail: CachePadded<AtomicPtr<Node>>,
}

// SAFETY: messages are `Send`; producer-side state is atomic and the
// consumer-side cell is only touched under the single-consumer contract.
unsafe impl Send for Mailbox {}
unsafe impl Sync for Mailbox {}

impl Mailbox {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        let stub = Node::alloc(None);
        Self {
            head: CachePadded::new(UnsafeCell::new(stub)),
            tail: CachePadded::new(AtomicPtr::new(stub)),
        }
    }

    /// Appends a message. Never blocks and never fails.
    pub fn push(&self, msg: Message) {
        let node = Node::alloc(Some(msg));
        // SAFETY: `node` is a fresh single-node chain.
        unsafe { self.link(node, node) }
    }

    /// Appends the chain `first..=last` to the tail.
    ///
    /// # Safety
    /// The chain must be owned by the caller and `last` must be its end.
    unsafe fn link(&self, first: *mut Node, last: *mut Node) {
        let prev = self.tail.swap(last, Ordering::AcqRel);
        // SAFETY: the consumer cannot step past `prev` (and free it) until
        // this store makes `first` reachable.
        unsafe { (*prev).next.store(first, Ordering::Release) };
    }

    /// Returns the node after `head`, waiting out a producer that has
    /// claimed the tail but not linked its node yet. `None` means empty.
    ///
    /// # Safety
    /// Consumer only; `head` must be the current stub.
    unsafe fn next_after(&self, head: *mut Node) -> Option<*mut Node> {
        let backoff = Backoff::new();
        loop {
            // SAFETY: the stub is only freed by the consumer, i.e. us.
            let next = unsafe { (*head).next.load(Ordering::Acquire) };
            if !next.is_null() {
                return Some(next);
            }
            if self.tail.load(Ordering::Acquire) == head {
                return None;
            }
            backoff.snooze();
        }
    }

    /// Removes and returns the oldest message.
    ///
    /// Waits only while a concurrent push is halfway through linking.
    ///
    /// # Safety
    /// Must not run concurrently with any other consumer-side call
    /// ([`pop`](Mailbox::pop), [`has_messages`](Mailbox::has_messages),
    /// [`splice_into`](Mailbox::splice_into)) on the same mailbox.
    pub unsafe fn pop(&self) -> Option<Message> {
        // SAFETY: single consumer per the caller's contract.
        unsafe {
            let head = *self.head.get();
            let next = self.next_after(head)?;
            *self.head.get() = next;
            drop(Box::from_raw(head));
            (*next).msg.take()
        }
    }

    /// Returns true if a message is queued or being pushed.
    ///
    /// # Safety
    /// Same contract as [`pop`](Mailbox::pop).
    pub unsafe fn has_messages(&self) -> bool {
        // SAFETY: single consumer per the caller's contract.
        unsafe {
            let head = *self.head.get();
            !(*head).next.load(Ordering::Acquire).is_null()
                || self.tail.load(Ordering::Acquire) != head
        }
    }

    /// Moves every queued message onto the tail of `dst`, oldest first,
    /// leaving this mailbox empty.
    ///
    /// The moved chain is published with a single tail swap on `dst`, so
    /// concurrent pushes into `dst` land either wholly before or wholly after
    /// it.
    ///
    /// # Safety
    /// Same contract as [`pop`](Mailbox::pop) for `self`. `dst` only
    /// receives pushes and may be in use by other threads.
    pub unsafe fn splice_into(&self, dst: &Mailbox) {
        debug_assert!(!ptr::eq(self, dst), "cannot splice a mailbox into itself");
        // SAFETY: single consumer per the caller's contract.
        unsafe {
            let head = *self.head.get();
            let Some(first) = self.next_after(head) else {
                return;
            };
            // The stub becomes the tail again; `first` is non-null so no
            // producer holds the stub as its predecessor.
            (*head).next.store(ptr::null_mut(), Ordering::Relaxed);
            let last = self.tail.swap(head, Ordering::AcqRel);
            dst.link(first, last);
        }
    }

    /// Pops and drops every queued message, returning how many there were.
    ///
    /// # Safety
    /// Same contract as [`pop`](Mailbox::pop).
    pub(crate) unsafe fn drain(&self) -> usize {
        let mut dropped = 0;
        // SAFETY: forwarded contract.
        while unsafe { self.pop() }.is_some() {
            dropped += 1;
        }
        dropped
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").finish_non_exhaustive()
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        // SAFETY: `&mut self` excludes every producer and consumer.
        unsafe {
            self.drain();
            drop(Box::from_raw(*self.head.get()));
        }
    }
}
