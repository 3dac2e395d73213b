//! API error type and the boundary mapping from subsystem errors.
//!
//! Every transactional flow fails with one of the closed enums from
//! `venuepass-core` (or a `StoreError`/`GatewayError`); the `From` impls
//! here match those exhaustively into the external taxonomy, so internal
//! reasons never leak raw and every variant has a deliberate status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use venuepass_core::{
    AttendanceError, BookingError, DisputeError, EscrowError, PaymentError, SlotError,
};
use venuepass_store::StoreError;

use crate::credential::CredentialError;
use crate::gateway::GatewayError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid session headers.
    #[error("unauthorized")]
    Unauthorized,

    /// Valid session but the action is not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// State conflict (duplicate booking, slot full, invalid transition).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (storage, gateway, misconfiguration).
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("record not found".into()),
            StoreError::AlreadyExists { entity } => Self::Conflict(format!("{entity} already exists")),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::InvalidPassDays
            | BookingError::SlotOutsideValidity
            | BookingError::PassNotSupported
            | BookingError::NotCancellable { .. } => Self::BadRequest(message),
            BookingError::FacilityNotBookable
            | BookingError::CancelAfterStart
            | BookingError::CancelAfterAttendance => Self::Forbidden(message),
            BookingError::DuplicateActiveBooking | BookingError::SlotFull { .. } => {
                Self::Conflict(message)
            }
            BookingError::SlotTemplateNotFound
            | BookingError::SlotNotGenerated { .. }
            | BookingError::NotFound => Self::NotFound(message),
        }
    }
}

impl From<SlotError> for ApiError {
    fn from(err: SlotError) -> Self {
        let message = err.to_string();
        match err {
            SlotError::TemplateExists | SlotError::HolidayOverlap => Self::Conflict(message),
            SlotError::TemplateNotFound
            | SlotError::FacilityNotFound
            | SlotError::HolidayNotFound => Self::NotFound(message),
            SlotError::NoPriceConfigured | SlotError::InvalidWindow => Self::BadRequest(message),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        let message = err.to_string();
        match err {
            PaymentError::OrderNotFound { .. } | PaymentError::BookingNotFound => {
                Self::NotFound(message)
            }
            PaymentError::InvalidPayload
            | PaymentError::AmountMismatch { .. }
            | PaymentError::CurrencyMismatch { .. }
            | PaymentError::BookingNotPayable { .. }
            | PaymentError::NotRefundable { .. }
            | PaymentError::MissingGatewayPaymentId => Self::BadRequest(message),
            PaymentError::AlreadyCaptured => Self::Conflict(message),
            PaymentError::MissingOwnerMetadata => Self::Internal(message),
        }
    }
}

impl From<EscrowError> for ApiError {
    fn from(err: EscrowError) -> Self {
        let message = err.to_string();
        match err {
            EscrowError::NotFound
            | EscrowError::BookingNotFound
            | EscrowError::PaymentNotFound => Self::NotFound(message),
            EscrowError::AlreadyExists
            | EscrowError::NotReleasable { .. }
            | EscrowError::NotRefundable { .. }
            | EscrowError::NotBlockable { .. } => Self::Conflict(message),
            EscrowError::DisputeActive | EscrowError::BookingDisputed => Self::Forbidden(message),
        }
    }
}

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        let message = err.to_string();
        match err {
            AttendanceError::BookingNotFound | AttendanceError::FacilityNotFound => {
                Self::NotFound(message)
            }
            AttendanceError::WrongOwner => Self::Forbidden(message),
            AttendanceError::NotMarkable { .. }
            | AttendanceError::Holiday
            | AttendanceError::AlreadyMarked
            | AttendanceError::FacilityMismatch
            | AttendanceError::OutsideValidity
            | AttendanceError::PassExhausted => Self::BadRequest(message),
        }
    }
}

impl From<DisputeError> for ApiError {
    fn from(err: DisputeError) -> Self {
        let message = err.to_string();
        match err {
            DisputeError::BookingNotFound | DisputeError::NotFound => Self::NotFound(message),
            DisputeError::WrongUser => Self::Forbidden(message),
            DisputeError::NotDisputable { .. }
            | DisputeError::AttendanceMarked
            | DisputeError::OutsideSlotWindow => Self::BadRequest(message),
            DisputeError::AlreadyDisputed | DisputeError::NotResolvable { .. } => {
                Self::Conflict(message)
            }
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        // Gateway trouble is never the caller's fault.
        Self::Internal(err.to_string())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        Self::BadRequest(format!("invalid pass credential: {err}"))
    }
}
