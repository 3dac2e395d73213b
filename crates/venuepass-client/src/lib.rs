//! VenuePass client SDK.
//!
//! A thin client over the booking API for services and tools that create
//! and manage passes on behalf of users.
//!
//! # Example
//!
//! ```no_run
//! use venuepass_client::{CreateBooking, VenuePassClient};
//! use venuepass_core::{FacilityId, SlotType, UserId};
//!
//! # async fn example() -> Result<(), venuepass_client::ClientError> {
//! let client = VenuePassClient::new("http://venuepass.internal:8080")?;
//!
//! let booking = client
//!     .create_booking(
//!         UserId::generate(),
//!         CreateBooking {
//!             facility_id: FacilityId::generate(),
//!             slot_type: SlotType::Morning,
//!             pass_days: 3,
//!             start_date: "2026-09-01".parse().unwrap(),
//!         },
//!         "retry-safe-key-1",
//!     )
//!     .await?;
//!
//! println!("booked: {} until {}", booking.booking_id, booking.end_date);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::VenuePassClient;
pub use error::ClientError;
pub use types::{BookingCreated, Cancelled, CreateBooking};
