//! `RocksDB` storage layer for the VenuePass booking engine.
//!
//! This crate provides durable storage for facilities, slot templates,
//! materialized capacity, bookings, escrows, payments, attendance, disputes,
//! and idempotency records, using `RocksDB` column families for primary rows
//! and secondary indexes.
//!
//! # Units of work
//!
//! Multi-row mutations are staged on a [`Batch`] and committed with a single
//! atomic `WriteBatch` write: either every staged row lands or none does.
//! Row-level mutual exclusion comes from [`RowLocks`], an async lock table
//! keyed by encoded row key; flows acquire their full key set up front (in a
//! fixed global order, see [`locks`]) and hold the guard until the batch
//! commits or the flow fails.
//!
//! # Example
//!
//! ```no_run
//! use venuepass_store::Store;
//! use venuepass_core::{Facility, FacilityId, UserId, ApprovalStatus};
//!
//! let store = Store::open("/tmp/venuepass-db").unwrap();
//! let facility = Facility {
//!     id: FacilityId::generate(),
//!     owner_id: UserId::generate(),
//!     name: "Court A".into(),
//!     approval_status: ApprovalStatus::Approved,
//!     is_published: true,
//! };
//! store.put_facility(&facility).unwrap();
//! assert!(store.get_facility(facility.id).unwrap().is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod locks;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use locks::{lock_keys, RowGuard, RowLocks};
pub use rocks::{Batch, Store};
