//! Closed error enums, one per subsystem.
//!
//! Each transactional flow signals failure through its own tagged enum; the
//! service boundary matches these exhaustively into the external error
//! taxonomy (not found / bad request / conflict / forbidden / internal) and
//! never leaks internal reasons raw.

use chrono::NaiveDate;

use crate::{BookingStatus, DisputeStatus, EscrowStatus, PaymentStatus};

/// Failures of booking creation and cancellation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    /// The requested pass duration is not sold.
    #[error("invalid pass duration")]
    InvalidPassDays,

    /// The facility is unapproved or unpublished.
    #[error("facility is not bookable")]
    FacilityNotBookable,

    /// The user already holds a live booking for this facility and slot.
    #[error("an active booking already exists for this facility and slot")]
    DuplicateActiveBooking,

    /// No template exists for the facility and slot type.
    #[error("slot template not found")]
    SlotTemplateNotFound,

    /// The start date is outside the template validity window.
    #[error("start date is outside the slot validity window")]
    SlotOutsideValidity,

    /// The template has no price for the requested pass duration.
    #[error("pass duration not supported by this slot")]
    PassNotSupported,

    /// A required capacity row has not been materialized.
    #[error("capacity not generated for {date}")]
    SlotNotGenerated {
        /// The missing date.
        date: NaiveDate,
    },

    /// A required capacity row is fully booked.
    #[error("slot is full on {date}")]
    SlotFull {
        /// The full date.
        date: NaiveDate,
    },

    /// No booking matched the id for this user.
    #[error("booking not found")]
    NotFound,

    /// The booking is past the cancellable states.
    #[error("booking cannot be cancelled from status {status}")]
    NotCancellable {
        /// The current status.
        status: BookingStatus,
    },

    /// The pass has already started.
    #[error("booking cannot be cancelled on or after its start date")]
    CancelAfterStart,

    /// The pass has already been used.
    #[error("booking cannot be cancelled after attendance was recorded")]
    CancelAfterAttendance,
}

/// Failures of template management and capacity materialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    /// The facility already has a template for this slot type.
    #[error("a template already exists for this facility and slot type")]
    TemplateExists,

    /// No template matched the id.
    #[error("slot template not found")]
    TemplateNotFound,

    /// No facility record matched the id.
    #[error("facility not found")]
    FacilityNotFound,

    /// A template needs at least one pass price.
    #[error("template must carry at least one pass price")]
    NoPriceConfigured,

    /// The validity window is inverted.
    #[error("valid_from must not be after valid_till")]
    InvalidWindow,

    /// The new holiday overlaps an existing one.
    #[error("holiday overlaps an existing holiday")]
    HolidayOverlap,

    /// No holiday matched the id.
    #[error("holiday not found")]
    HolidayNotFound,
}

/// Failures of payment order creation and webhook reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// No payment matched the gateway order id.
    #[error("payment not found for order {order_id}")]
    OrderNotFound {
        /// The unknown gateway order id.
        order_id: String,
    },

    /// The webhook body does not carry a payment entity.
    #[error("invalid webhook payload structure")]
    InvalidPayload,

    /// The reported amount does not match the stored order.
    #[error("amount mismatch: stored={stored}, reported={reported}")]
    AmountMismatch {
        /// Amount stored at order creation.
        stored: i64,
        /// Amount reported by the webhook.
        reported: i64,
    },

    /// The reported currency does not match the stored order.
    #[error("currency mismatch: stored={stored}, reported={reported}")]
    CurrencyMismatch {
        /// Currency stored at order creation.
        stored: String,
        /// Currency reported by the webhook.
        reported: String,
    },

    /// No booking matched the payment's entity id.
    #[error("booking not found")]
    BookingNotFound,

    /// Payment can only be initiated for ACCEPTED bookings.
    #[error("booking is not payable from status {status}")]
    BookingNotPayable {
        /// The current booking status.
        status: BookingStatus,
    },

    /// The booking's payment was already captured.
    #[error("payment already completed for this booking")]
    AlreadyCaptured,

    /// A subscription payment lost its owner metadata.
    #[error("owner id missing from payment metadata")]
    MissingOwnerMetadata,

    /// A refund needs a captured payment.
    #[error("payment is not refundable from status {status}")]
    NotRefundable {
        /// The current payment status.
        status: PaymentStatus,
    },

    /// A refund needs the gateway payment id recorded at capture.
    #[error("gateway payment id not recorded")]
    MissingGatewayPaymentId,
}

/// Failures of escrow state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscrowError {
    /// No escrow matched the id.
    #[error("escrow not found")]
    NotFound,

    /// The booking already has an escrow.
    #[error("escrow already exists for this booking")]
    AlreadyExists,

    /// Release is only valid from HELD.
    #[error("escrow cannot be released from status {status}")]
    NotReleasable {
        /// The current status.
        status: EscrowStatus,
    },

    /// An open dispute blocks release.
    #[error("cannot release escrow while a dispute is active")]
    DisputeActive,

    /// A DISPUTED booking blocks release.
    #[error("cannot release escrow for a disputed booking")]
    BookingDisputed,

    /// Refunds start from HELD or PAUSED only.
    #[error("escrow cannot be refunded from status {status}")]
    NotRefundable {
        /// The current status.
        status: EscrowStatus,
    },

    /// Terminal escrows cannot be blocked.
    #[error("escrow cannot be blocked from status {status}")]
    NotBlockable {
        /// The current status.
        status: EscrowStatus,
    },

    /// The escrow's booking disappeared.
    #[error("booking not found for escrow")]
    BookingNotFound,

    /// No payment exists for the escrow's booking.
    #[error("payment not found for booking")]
    PaymentNotFound,
}

/// Failures of attendance scanning and marking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttendanceError {
    /// No booking matched the id.
    #[error("booking not found")]
    BookingNotFound,

    /// No facility record matched the booking.
    #[error("facility not found")]
    FacilityNotFound,

    /// The facility belongs to a different owner.
    #[error("facility does not belong to this owner")]
    WrongOwner,

    /// Attendance needs an ACTIVE or ACCEPTED booking.
    #[error("attendance cannot be marked for booking status {status}")]
    NotMarkable {
        /// The current booking status.
        status: BookingStatus,
    },

    /// Today falls within a facility holiday.
    #[error("cannot mark attendance on a holiday")]
    Holiday,

    /// Attendance was already recorded today.
    #[error("attendance already marked for today")]
    AlreadyMarked,

    /// The credential's facility does not match the booking.
    #[error("credential is for a different facility")]
    FacilityMismatch,

    /// Today is outside the pass validity window.
    #[error("pass is expired or not yet valid")]
    OutsideValidity,

    /// The pass has no days left.
    #[error("pass has no active days remaining")]
    PassExhausted,
}

/// Failures of dispute creation and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisputeError {
    /// No booking matched the id.
    #[error("booking not found")]
    BookingNotFound,

    /// The booking belongs to a different user.
    #[error("booking does not belong to this user")]
    WrongUser,

    /// Disputes need an ACTIVE or ACCEPTED booking.
    #[error("dispute cannot be raised for booking status {status}")]
    NotDisputable {
        /// The current booking status.
        status: BookingStatus,
    },

    /// Only one dispute may be open per booking.
    #[error("an active dispute already exists for this booking")]
    AlreadyDisputed,

    /// Attendance was already recorded.
    #[error("cannot raise a dispute after attendance was marked")]
    AttendanceMarked,

    /// The slot window (plus grace) has passed or not begun.
    #[error("dispute can only be raised during the slot window or its grace period")]
    OutsideSlotWindow,

    /// No dispute matched the id.
    #[error("dispute not found")]
    NotFound,

    /// The dispute was already resolved.
    #[error("dispute cannot be resolved from status {status:?}")]
    NotResolvable {
        /// The current status.
        status: DisputeStatus,
    },
}
