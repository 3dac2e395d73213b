//! Core domain types for the VenuePass reservation and settlement engine.
//!
//! This crate defines the entities shared by the storage layer and the HTTP
//! service: slot templates and materialized capacity, bookings and passes,
//! escrows, payments, attendance, disputes, and the closed error enums each
//! subsystem signals with.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod attendance;
pub mod booking;
pub mod dispute;
pub mod error;
pub mod escrow;
pub mod facility;
pub mod ids;
pub mod payment;
pub mod slot;

pub use attendance::Attendance;
pub use booking::{Booking, BookingStatus, PassDays};
pub use dispute::{
    AccountStatus, Dispute, DisputeDecision, DisputeStatus, UserTrust,
    FALSE_DISPUTE_THRESHOLD, TRUST_DELTA_REJECTED, TRUST_DELTA_UPHELD,
};
pub use error::{
    AttendanceError, BookingError, DisputeError, EscrowError, PaymentError, SlotError,
};
pub use escrow::{Escrow, EscrowStatus};
pub use facility::{ApprovalStatus, Facility};
pub use ids::{
    BookingId, DisputeId, EscrowId, FacilityId, HolidayId, IdError, PaymentId, SubscriptionId,
    TemplateId, UserId,
};
pub use payment::{
    Payment, PaymentEntityType, PaymentStatus, Subscription, SubscriptionStatus,
    SUBSCRIPTION_AMOUNT, SUBSCRIPTION_PERIOD_DAYS,
};
pub use slot::{CapacitySlot, Holiday, SlotTemplate, SlotType, AUTO_EXTEND_DAYS};
