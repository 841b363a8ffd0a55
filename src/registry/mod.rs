//! Lock-free address registry.
//!
//! A fixed array of buckets, each holding an immutable snapshot of its
//! entries. Writers copy the snapshot, edit the copy and publish it with a
//! compare-and-swap, retrying on contention; the replaced snapshot is freed
//! after a grace period. Readers load a snapshot inside a read-side section
//! and never block or retry.

pub mod reclaim;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};

use crate::actor::ActorCell;
use crate::error::RegistryError;
use crate::types::Address;

/// Bucket count used by [`Registry::default`].
pub const DEFAULT_BUCKETS: usize = 64;

#[derive(Clone)]
struct Entry {
    address: Address,
    cell: Arc<ActorCell>,
}

type Bucket = Vec<Entry>;

/// Concurrent map from live addresses to their actors.
pub struct Registry {
    buckets: Box<[Atomic<Bucket>]>,
    mask: u64,
    len: AtomicUsize,
}

impl Registry {
    /// Creates a registry with at least `buckets` buckets (rounded up to a
    /// power of two).
    pub fn with_buckets(buckets: usize) -> Self {
        let count = buckets.max(1).next_power_of_two();
        Self {
            buckets: (0..count).map(|_| Atomic::null()).collect(),
            mask: count as u64 - 1,
            len: AtomicUsize::new(0),
        }
    }

    fn bucket(&self, address: Address) -> &Atomic<Bucket> {
        // Fibonacci hashing spreads sequential addresses across buckets.
        let hash = address.get().wrapping_mul(0x9E37_79B9_7F4A_7C15);
        &self.buckets[((hash >> 32) & self.mask) as usize]
    }

    /// Publishes `cell` under `address` unless the address is already live.
    pub(crate) fn insert_if_absent(
        &self,
        address: Address,
        cell: Arc<ActorCell>,
    ) -> Result<(), RegistryError> {
        let guard = epoch::pin();
        let bucket = self.bucket(address);
        let mut current = bucket.load(Ordering::Acquire, &guard);
        loop {
            // SAFETY: snapshots are only freed after a grace period and we
            // are pinned.
            let entries = unsafe { current.as_ref() }.map_or(&[][..], Vec::as_slice);
            if entries.iter().any(|entry| entry.address == address) {
                return Err(RegistryError::Duplicate(address));
            }

            let mut next = Vec::with_capacity(entries.len() + 1);
            next.extend_from_slice(entries);
            next.push(Entry {
                address,
                cell: Arc::clone(&cell),
            });

            match bucket.compare_exchange(
                current,
                Owned::new(next),
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(_) => {
                    self.len.fetch_add(1, Ordering::AcqRel);
                    // SAFETY: `current` is unreachable from the registry now.
                    unsafe { retire(current, &guard) };
                    return Ok(());
                }
                Err(err) => current = err.current,
            }
        }
    }

    /// Looks up a live actor. The reference is valid for the guard's
    /// lifetime, even if the actor deregisters meanwhile.
    pub(crate) fn lookup<'g>(&self, address: Address, guard: &'g Guard) -> Option<&'g ActorCell> {
        let snapshot = self.bucket(address).load(Ordering::Acquire, guard);
        // SAFETY: pinned by `guard`, so the snapshot outlives `'g`.
        let entries = unsafe { snapshot.as_ref() }?;
        entries
            .iter()
            .find(|entry| entry.address == address)
            .map(|entry| &*entry.cell)
    }

    /// Deregisters `address`. Lookups that start afterwards fail; the
    /// actor's memory is untouched.
    pub(crate) fn remove(&self, address: Address) -> Result<(), RegistryError> {
        let guard = epoch::pin();
        let bucket = self.bucket(address);
        let mut current = bucket.load(Ordering::Acquire, &guard);
        loop {
            // SAFETY: see `insert_if_absent`.
            let entries = unsafe { current.as_ref() }.map_or(&[][..], Vec::as_slice);
            let Some(index) = entries.iter().position(|entry| entry.address == address) else {
                return Err(RegistryError::Missing(address));
            };

            let next = if entries.len() == 1 {
                Shared::null()
            } else {
                let mut next = entries.to_vec();
                next.swap_remove(index);
                Owned::new(next).into_shared(&guard)
            };

            match bucket.compare_exchange(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(_) => {
                    self.len.fetch_sub(1, Ordering::AcqRel);
                    // SAFETY: `current` is unreachable from the registry now.
                    unsafe { retire(current, &guard) };
                    return Ok(());
                }
                Err(err) => {
                    if !next.is_null() {
                        // SAFETY: the failed CAS never published `next`.
                        drop(unsafe { next.into_owned() });
                    }
                    current = err.current;
                }
            }
        }
    }

    /// Returns true if `address` is live.
    pub fn contains(&self, address: Address) -> bool {
        let guard = reclaim::read();
        self.lookup(address, &guard).is_some()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns true when no actor is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collects the live addresses. Each bucket is read from one snapshot;
    /// the result as a whole is not atomic with concurrent inserts.
    pub fn addresses(&self) -> Vec<Address> {
        let guard = reclaim::read();
        let mut addresses = Vec::with_capacity(self.len());
        for bucket in self.buckets.iter() {
            let snapshot = bucket.load(Ordering::Acquire, &guard);
            // SAFETY: pinned by `guard`.
            if let Some(entries) = unsafe { snapshot.as_ref() } {
                addresses.extend(entries.iter().map(|entry| entry.address));
            }
        }
        addresses
    }
}

/// Frees a replaced snapshot once no reader can still hold it.
///
/// # Safety
/// `snapshot` must no longer be reachable through the registry.
unsafe fn retire(snapshot: Shared<'_, Bucket>, guard: &Guard) {
    if !snapshot.is_null() {
        // SAFETY: forwarded contract.
        unsafe { guard.defer_destroy(snapshot) };
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("buckets", &self.buckets.len())
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no reader is inside this registry.
        unsafe {
            let guard = epoch::unprotected();
            for bucket in self.buckets.iter() {
                let snapshot = bucket.load(Ordering::Relaxed, guard);
                if !snapshot.is_null() {
                    drop(snapshot.into_owned());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    fn cell(address: u64) -> Arc<ActorCell> {
        Arc::new(ActorCell::new(Address::new(address)))
    }

    #[test]
    fn insert_lookup_remove() {
        let registry = Registry::with_buckets(4);
        let address = Address::new(7);
        registry.insert_if_absent(address, cell(7)).unwrap();
        assert!(registry.contains(address));
        assert_eq!(registry.len(), 1);

        {
            let guard = reclaim::read();
            let found = registry.lookup(address, &guard).unwrap();
            assert_eq!(found.address(), address);
        }

        registry.remove(address).unwrap();
        assert!(!registry.contains(address));
        assert!(registry.is_empty());
        assert_eq!(registry.remove(address), Err(RegistryError::Missing(address)));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let registry = Registry::default();
        let address = Address::new(1);
        registry.insert_if_absent(address, cell(1)).unwrap();
        assert_eq!(
            registry.insert_if_absent(address, cell(1)),
            Err(RegistryError::Duplicate(address))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn colliding_addresses_share_a_bucket() {
        let registry = Registry::with_buckets(1);
        for raw in 1..=20 {
            registry.insert_if_absent(Address::new(raw), cell(raw)).unwrap();
        }
        registry.remove(Address::new(10)).unwrap();

        let mut addresses: Vec<u64> = registry.addresses().into_iter().map(u64::from).collect();
        addresses.sort_unstable();
        let expected: Vec<u64> = (1..=20).filter(|raw| *raw != 10).collect();
        assert_eq!(addresses, expected);
    }

    #[test]
    fn concurrent_inserts_of_one_address_admit_exactly_one() {
        const THREADS: usize = 8;
        let registry = Arc::new(Registry::with_buckets(2));
        let barrier = Arc::new(Barrier::new(THREADS));
        let winners: usize = (0..THREADS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.insert_if_absent(Address::new(42), cell(42)).is_ok()
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| usize::from(handle.join().unwrap()))
            .sum();
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }
}
