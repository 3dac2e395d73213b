//! Async per-row lock table.
//!
//! `RocksDB` has no row locks, so mutual exclusion over contended rows
//! (capacity counters, booking status, escrow status, payment status) comes
//! from this in-process table: one `tokio::sync::Mutex` per encoded row key,
//! created on demand and garbage-collected once nobody holds or awaits it.
//!
//! # Ordering
//!
//! [`RowLocks::acquire`] sorts the requested key set and locks keys in that
//! order. Lock keys carry a class-byte prefix (see [`lock_keys`]) so the
//! byte-wise sort yields one global acquisition order across all flows:
//!
//! `idempotency < payment < booking < booking-scope < template <
//! capacity (by date) < escrow < dispute`
//!
//! Every flow acquires its complete key set in a single call (booking
//! creation additionally holds its idempotency-key lock from a prior call,
//! which is safe because that class sorts before all others and is never
//! acquired second), so no cycle between waiters can form.
//!
//! [`RowLocks::try_acquire`] never waits; the escrow release sweep uses it
//! to claim due rows so concurrent sweeps skip rows another worker holds
//! instead of contending.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock-key constructors.
///
/// Each key is the class byte followed by the row's identifying bytes; the
/// class byte fixes the global acquisition order documented on the module.
pub mod lock_keys {
    use chrono::NaiveDate;

    use venuepass_core::{BookingId, DisputeId, EscrowId, FacilityId, SlotType, UserId};

    use crate::keys::encode_date;

    const CLASS_IDEMPOTENCY: u8 = 0x00;
    const CLASS_PAYMENT: u8 = 0x01;
    const CLASS_BOOKING: u8 = 0x02;
    const CLASS_BOOKING_SCOPE: u8 = 0x03;
    const CLASS_TEMPLATE: u8 = 0x04;
    const CLASS_CAPACITY: u8 = 0x05;
    const CLASS_ESCROW: u8 = 0x06;
    const CLASS_DISPUTE: u8 = 0x07;

    fn tagged(class: u8, bytes: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + bytes.len());
        key.push(class);
        key.extend_from_slice(bytes);
        key
    }

    /// Lock key for a client idempotency key.
    #[must_use]
    pub fn idempotency(key: &str) -> Vec<u8> {
        tagged(CLASS_IDEMPOTENCY, key.as_bytes())
    }

    /// Lock key for a payment row, addressed by gateway order id.
    #[must_use]
    pub fn payment(gateway_order_id: &str) -> Vec<u8> {
        tagged(CLASS_PAYMENT, gateway_order_id.as_bytes())
    }

    /// Lock key for a booking row.
    #[must_use]
    pub fn booking(booking_id: BookingId) -> Vec<u8> {
        tagged(CLASS_BOOKING, booking_id.as_bytes())
    }

    /// Lock key for the duplicate-booking scope of one user/facility/slot.
    #[must_use]
    pub fn booking_scope(user_id: UserId, facility_id: FacilityId, slot_type: SlotType) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(33);
        bytes.extend_from_slice(user_id.as_bytes());
        bytes.extend_from_slice(facility_id.as_bytes());
        bytes.push(slot_type.tag());
        tagged(CLASS_BOOKING_SCOPE, &bytes)
    }

    /// Lock key for a slot template row.
    #[must_use]
    pub fn template(facility_id: FacilityId, slot_type: SlotType) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(17);
        bytes.extend_from_slice(facility_id.as_bytes());
        bytes.push(slot_type.tag());
        tagged(CLASS_TEMPLATE, &bytes)
    }

    /// Lock key for a capacity row. Embeds the date after the facility so
    /// capacity keys for one booking sort in date order.
    #[must_use]
    pub fn capacity(facility_id: FacilityId, date: NaiveDate, slot_type: SlotType) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(21);
        bytes.extend_from_slice(facility_id.as_bytes());
        bytes.extend_from_slice(&encode_date(date));
        bytes.push(slot_type.tag());
        tagged(CLASS_CAPACITY, &bytes)
    }

    /// Lock key for an escrow row.
    #[must_use]
    pub fn escrow(escrow_id: EscrowId) -> Vec<u8> {
        tagged(CLASS_ESCROW, escrow_id.as_bytes())
    }

    /// Lock key for a dispute row.
    #[must_use]
    pub fn dispute(dispute_id: DisputeId) -> Vec<u8> {
        tagged(CLASS_DISPUTE, dispute_id.as_bytes())
    }
}

type LockMap = Mutex<HashMap<Vec<u8>, Arc<AsyncMutex<()>>>>;

struct LockTable {
    entries: LockMap,
}

impl LockTable {
    /// Get or create the mutex for a key. Cloning the `Arc` under the map
    /// lock is what keeps the drop-time garbage collection race-free.
    fn entry(&self, key: &[u8]) -> Arc<AsyncMutex<()>> {
        let mut map = self.entries.lock().expect("lock table poisoned");
        Arc::clone(map.entry(key.to_vec()).or_default())
    }

    /// Remove entries nobody references anymore. Called with the guards
    /// already dropped; a strong count of 1 means only the map holds the
    /// mutex, so no holder or waiter can exist.
    fn collect(&self, keys: &[Vec<u8>]) {
        let mut map = self.entries.lock().expect("lock table poisoned");
        for key in keys {
            if map.get(key).is_some_and(|entry| Arc::strong_count(entry) == 1) {
                map.remove(key);
            }
        }
    }
}

/// The row-lock table. Cheap to clone; clones share the table.
#[derive(Clone)]
pub struct RowLocks {
    table: Arc<LockTable>,
}

impl RowLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Arc::new(LockTable {
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Acquire every key in the set, waiting as needed.
    ///
    /// Keys are sorted and deduplicated first; see the module docs for why
    /// that makes concurrent acquisition deadlock-free.
    pub async fn acquire(&self, mut lock_keys: Vec<Vec<u8>>) -> RowGuard {
        lock_keys.sort();
        lock_keys.dedup();

        let mut guards = Vec::with_capacity(lock_keys.len());
        for key in &lock_keys {
            let entry = self.table.entry(key);
            guards.push(entry.lock_owned().await);
        }

        RowGuard {
            table: Arc::clone(&self.table),
            keys: lock_keys,
            guards,
        }
    }

    /// Acquire every key in the set without waiting.
    ///
    /// Returns `None` (holding nothing) if any key is currently held.
    #[must_use]
    pub fn try_acquire(&self, mut lock_keys: Vec<Vec<u8>>) -> Option<RowGuard> {
        lock_keys.sort();
        lock_keys.dedup();

        let mut guards = Vec::with_capacity(lock_keys.len());
        for (i, key) in lock_keys.iter().enumerate() {
            let entry = self.table.entry(key);
            match entry.try_lock_owned() {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    // Hand the acquired prefix to a guard so release and
                    // garbage collection run through the one code path.
                    drop(RowGuard {
                        table: Arc::clone(&self.table),
                        keys: lock_keys[..=i].to_vec(),
                        guards,
                    });
                    return None;
                }
            }
        }

        Some(RowGuard {
            table: Arc::clone(&self.table),
            keys: lock_keys,
            guards,
        })
    }
}

impl Default for RowLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a set of row locks until dropped.
pub struct RowGuard {
    table: Arc<LockTable>,
    keys: Vec<Vec<u8>>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        self.guards.clear();
        self.table.collect(&self.keys);
    }
}
