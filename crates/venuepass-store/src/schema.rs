//! Column family definitions.

/// Column family names.
pub mod cf {
    /// Facility capability records, keyed by `facility_id`.
    pub const FACILITIES: &str = "facilities";

    /// Slot templates, keyed by `facility_id || slot_tag` (unique per pair).
    pub const SLOT_TEMPLATES: &str = "slot_templates";

    /// Index: template row key by template id.
    pub const TEMPLATE_BY_ID: &str = "template_by_id";

    /// Materialized capacity rows, keyed by
    /// `facility_id || date || slot_tag`.
    pub const CAPACITY_SLOTS: &str = "capacity_slots";

    /// Facility holidays, keyed by `facility_id || holiday_id`.
    pub const HOLIDAYS: &str = "holidays";

    /// Bookings, keyed by `booking_id`.
    pub const BOOKINGS: &str = "bookings";

    /// Index: bookings by duplicate-check scope, keyed by
    /// `user_id || facility_id || slot_tag || booking_id`. Value is empty.
    pub const BOOKINGS_BY_SCOPE: &str = "bookings_by_scope";

    /// Escrows, keyed by `escrow_id`.
    pub const ESCROWS: &str = "escrows";

    /// Index: escrow id by booking id. One escrow per booking.
    pub const ESCROW_BY_BOOKING: &str = "escrow_by_booking";

    /// Release queue, keyed by `release_date || escrow_id`. Value is empty.
    /// Entries are removed when the escrow reaches a terminal state.
    pub const ESCROW_RELEASE_QUEUE: &str = "escrow_release_queue";

    /// Payments, keyed by `payment_id` (ULID, time-ordered).
    pub const PAYMENTS: &str = "payments";

    /// Index: payment id by gateway order id (unique).
    pub const PAYMENT_BY_ORDER: &str = "payment_by_order";

    /// Index: payment id by `entity_tag || entity_id`.
    pub const PAYMENT_BY_ENTITY: &str = "payment_by_entity";

    /// Attendance records, keyed by `booking_id || date` (unique per day).
    pub const ATTENDANCE: &str = "attendance";

    /// Disputes, keyed by `dispute_id`.
    pub const DISPUTES: &str = "disputes";

    /// Index: disputes by booking, keyed by `booking_id || dispute_id`.
    pub const DISPUTES_BY_BOOKING: &str = "disputes_by_booking";

    /// User trust ledgers, keyed by `user_id`.
    pub const USER_TRUST: &str = "user_trust";

    /// Owner subscriptions, keyed by `subscription_id`.
    pub const SUBSCRIPTIONS: &str = "subscriptions";

    /// Idempotency records, keyed by the client-supplied key bytes.
    pub const IDEMPOTENCY: &str = "idempotency";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::FACILITIES,
        cf::SLOT_TEMPLATES,
        cf::TEMPLATE_BY_ID,
        cf::CAPACITY_SLOTS,
        cf::HOLIDAYS,
        cf::BOOKINGS,
        cf::BOOKINGS_BY_SCOPE,
        cf::ESCROWS,
        cf::ESCROW_BY_BOOKING,
        cf::ESCROW_RELEASE_QUEUE,
        cf::PAYMENTS,
        cf::PAYMENT_BY_ORDER,
        cf::PAYMENT_BY_ENTITY,
        cf::ATTENDANCE,
        cf::DISPUTES,
        cf::DISPUTES_BY_BOOKING,
        cf::USER_TRUST,
        cf::SUBSCRIPTIONS,
        cf::IDEMPOTENCY,
    ]
}
