//! Binary key encodings for column families.
//!
//! Dates are encoded as big-endian `num_days_from_ce` so keys embedding a
//! date sort chronologically; capacity rows for one facility/slot and the
//! escrow release queue both rely on that ordering.

use chrono::{Datelike, NaiveDate};

use venuepass_core::{
    BookingId, DisputeId, EscrowId, FacilityId, HolidayId, PaymentEntityType, PaymentId,
    SlotType, SubscriptionId, TemplateId, UserId,
};

/// Encode a date as 4 big-endian bytes preserving chronological order.
#[must_use]
pub fn encode_date(date: NaiveDate) -> [u8; 4] {
    u32::try_from(date.num_days_from_ce()).unwrap_or(0).to_be_bytes()
}

/// Inverse of [`encode_date`].
#[must_use]
pub fn decode_date(bytes: [u8; 4]) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(i32::try_from(u32::from_be_bytes(bytes)).ok()?)
}

/// Facility record key.
#[must_use]
pub fn facility_key(facility_id: FacilityId) -> Vec<u8> {
    facility_id.as_bytes().to_vec()
}

/// Slot template key: `facility_id || slot_tag`.
#[must_use]
pub fn template_key(facility_id: FacilityId, slot_type: SlotType) -> Vec<u8> {
    let mut key = Vec::with_capacity(17);
    key.extend_from_slice(facility_id.as_bytes());
    key.push(slot_type.tag());
    key
}

/// Template-by-id index key.
#[must_use]
pub fn template_id_key(template_id: TemplateId) -> Vec<u8> {
    template_id.as_bytes().to_vec()
}

/// Capacity row key: `facility_id || date || slot_tag`.
#[must_use]
pub fn capacity_key(facility_id: FacilityId, date: NaiveDate, slot_type: SlotType) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.extend_from_slice(facility_id.as_bytes());
    key.extend_from_slice(&encode_date(date));
    key.push(slot_type.tag());
    key
}

/// Holiday key: `facility_id || holiday_id`.
#[must_use]
pub fn holiday_key(facility_id: FacilityId, holiday_id: HolidayId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(facility_id.as_bytes());
    key.extend_from_slice(holiday_id.as_bytes());
    key
}

/// Prefix for scanning a facility's holidays.
#[must_use]
pub fn holiday_prefix(facility_id: FacilityId) -> Vec<u8> {
    facility_id.as_bytes().to_vec()
}

/// Booking key.
#[must_use]
pub fn booking_key(booking_id: BookingId) -> Vec<u8> {
    booking_id.as_bytes().to_vec()
}

/// Booking scope index key:
/// `user_id || facility_id || slot_tag || booking_id`.
#[must_use]
pub fn booking_scope_key(
    user_id: UserId,
    facility_id: FacilityId,
    slot_type: SlotType,
    booking_id: BookingId,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(49);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(facility_id.as_bytes());
    key.push(slot_type.tag());
    key.extend_from_slice(booking_id.as_bytes());
    key
}

/// Prefix for scanning one user's bookings in a facility/slot scope.
#[must_use]
pub fn booking_scope_prefix(
    user_id: UserId,
    facility_id: FacilityId,
    slot_type: SlotType,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(facility_id.as_bytes());
    key.push(slot_type.tag());
    key
}

/// Extract the booking id from a scope index key.
///
/// # Panics
///
/// Panics if the key is shorter than 49 bytes.
#[must_use]
pub fn booking_id_from_scope_key(key: &[u8]) -> BookingId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[33..49]);
    BookingId::from_uuid(uuid::Uuid::from_bytes(bytes))
}

/// Escrow key.
#[must_use]
pub fn escrow_key(escrow_id: EscrowId) -> Vec<u8> {
    escrow_id.as_bytes().to_vec()
}

/// Release queue key: `release_date || escrow_id`.
#[must_use]
pub fn release_queue_key(release_date: NaiveDate, escrow_id: EscrowId) -> Vec<u8> {
    let mut key = Vec::with_capacity(20);
    key.extend_from_slice(&encode_date(release_date));
    key.extend_from_slice(escrow_id.as_bytes());
    key
}

/// Extract the escrow id from a release queue key.
///
/// # Panics
///
/// Panics if the key is shorter than 20 bytes.
#[must_use]
pub fn escrow_id_from_queue_key(key: &[u8]) -> EscrowId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[4..20]);
    EscrowId::from_uuid(uuid::Uuid::from_bytes(bytes))
}

/// Payment key.
#[must_use]
pub fn payment_key(payment_id: PaymentId) -> Vec<u8> {
    payment_id.to_bytes().to_vec()
}

/// Payment-by-entity index key: `entity_tag || entity_id`.
#[must_use]
pub fn payment_entity_key(entity_type: PaymentEntityType, entity_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + entity_id.len());
    key.push(entity_type.tag());
    key.extend_from_slice(entity_id.as_bytes());
    key
}

/// Attendance key: `booking_id || date`.
#[must_use]
pub fn attendance_key(booking_id: BookingId, date: NaiveDate) -> Vec<u8> {
    let mut key = Vec::with_capacity(20);
    key.extend_from_slice(booking_id.as_bytes());
    key.extend_from_slice(&encode_date(date));
    key
}

/// Prefix for scanning a booking's attendance records.
#[must_use]
pub fn attendance_prefix(booking_id: BookingId) -> Vec<u8> {
    booking_id.as_bytes().to_vec()
}

/// Dispute key.
#[must_use]
pub fn dispute_key(dispute_id: DisputeId) -> Vec<u8> {
    dispute_id.as_bytes().to_vec()
}

/// Dispute-by-booking index key: `booking_id || dispute_id`.
#[must_use]
pub fn dispute_booking_key(booking_id: BookingId, dispute_id: DisputeId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(booking_id.as_bytes());
    key.extend_from_slice(dispute_id.as_bytes());
    key
}

/// Extract the dispute id from a 32-byte index key.
///
/// # Panics
///
/// Panics if the key is shorter than 32 bytes.
#[must_use]
pub fn dispute_id_from_index_key(key: &[u8]) -> DisputeId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    DisputeId::from_uuid(uuid::Uuid::from_bytes(bytes))
}

/// User trust key.
#[must_use]
pub fn trust_key(user_id: UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Subscription key.
#[must_use]
pub fn subscription_key(subscription_id: SubscriptionId) -> Vec<u8> {
    subscription_id.as_bytes().to_vec()
}
