//! `RocksDB` store implementation.
//!
//! Primary rows and secondary indexes live in the column families declared
//! in [`crate::schema`]; values are CBOR-encoded. Multi-row mutations are
//! staged on a [`Batch`] and committed atomically.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use serde::{Deserialize, Serialize};

use venuepass_core::{
    Attendance, Booking, BookingId, CapacitySlot, Dispute, DisputeId, Escrow, EscrowId,
    EscrowStatus, Facility, FacilityId, Holiday, HolidayId, Payment, PaymentEntityType, PaymentId,
    SlotTemplate, SlotType, Subscription, SubscriptionId, TemplateId, UserId, UserTrust,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};

/// A cached idempotency entry.
#[derive(Debug, Serialize, Deserialize)]
struct IdempotencyRecord {
    response: serde_json::Value,
    stored_at: DateTime<Utc>,
}

/// RocksDB-backed storage.
pub struct Store {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl Store {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Start an empty write batch against this store.
    #[must_use]
    pub fn batch(&self) -> Batch<'_> {
        Batch {
            store: self,
            inner: WriteBatch::default(),
        }
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_record<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_record<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = Self::serialize(value)?;
        self.db
            .put_cf(&cf, key, bytes)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Collect all keys under a prefix in one column family.
    fn prefix_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut keys = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    // =========================================================================
    // Facilities
    // =========================================================================

    /// Insert or update a facility capability record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_facility(&self, facility: &Facility) -> Result<()> {
        self.put_record(cf::FACILITIES, &keys::facility_key(facility.id), facility)
    }

    /// Get a facility by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_facility(&self, facility_id: FacilityId) -> Result<Option<Facility>> {
        self.get_record(cf::FACILITIES, &keys::facility_key(facility_id))
    }

    /// List every synced facility record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_facilities(&self) -> Result<Vec<Facility>> {
        let cf = self.cf(cf::FACILITIES)?;
        let iter = self.db.iterator_cf(&cf, IteratorMode::Start);

        let mut facilities = Vec::new();
        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            facilities.push(Self::deserialize(&value)?);
        }
        Ok(facilities)
    }

    // =========================================================================
    // Slot templates
    // =========================================================================

    /// Get the template for a facility and slot type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_template(
        &self,
        facility_id: FacilityId,
        slot_type: SlotType,
    ) -> Result<Option<SlotTemplate>> {
        self.get_record(cf::SLOT_TEMPLATES, &keys::template_key(facility_id, slot_type))
    }

    /// Get a template by id, via the id index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_template_by_id(&self, template_id: TemplateId) -> Result<Option<SlotTemplate>> {
        let cf = self.cf(cf::TEMPLATE_BY_ID)?;
        let Some(row_key) = self
            .db
            .get_cf(&cf, keys::template_id_key(template_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };
        self.get_record(cf::SLOT_TEMPLATES, &row_key)
    }

    /// Insert or update a template (row plus id index).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_template(&self, template: &SlotTemplate) -> Result<()> {
        let mut batch = self.batch();
        batch.put_template(template)?;
        batch.commit()
    }

    /// List the templates of one facility.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_templates_for_facility(&self, facility_id: FacilityId) -> Result<Vec<SlotTemplate>> {
        let prefix = facility_id.as_bytes().to_vec();
        let row_keys = self.prefix_keys(cf::SLOT_TEMPLATES, &prefix)?;

        let mut templates = Vec::with_capacity(row_keys.len());
        for key in row_keys {
            if let Some(template) = self.get_record(cf::SLOT_TEMPLATES, &key)? {
                templates.push(template);
            }
        }
        Ok(templates)
    }

    // =========================================================================
    // Capacity slots
    // =========================================================================

    /// Get one materialized capacity row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_capacity_slot(
        &self,
        facility_id: FacilityId,
        date: NaiveDate,
        slot_type: SlotType,
    ) -> Result<Option<CapacitySlot>> {
        self.get_record(
            cf::CAPACITY_SLOTS,
            &keys::capacity_key(facility_id, date, slot_type),
        )
    }

    // =========================================================================
    // Holidays
    // =========================================================================

    /// Insert a holiday range.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_holiday(&self, holiday: &Holiday) -> Result<()> {
        self.put_record(
            cf::HOLIDAYS,
            &keys::holiday_key(holiday.facility_id, holiday.id),
            holiday,
        )
    }

    /// Delete a holiday; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_holiday(&self, facility_id: FacilityId, holiday_id: HolidayId) -> Result<bool> {
        let cf = self.cf(cf::HOLIDAYS)?;
        let key = keys::holiday_key(facility_id, holiday_id);

        let exists = self
            .db
            .get_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if exists {
            self.db
                .delete_cf(&cf, &key)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        Ok(exists)
    }

    /// List a facility's holiday ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_holidays(&self, facility_id: FacilityId) -> Result<Vec<Holiday>> {
        let prefix = keys::holiday_prefix(facility_id);
        let row_keys = self.prefix_keys(cf::HOLIDAYS, &prefix)?;

        let mut holidays = Vec::with_capacity(row_keys.len());
        for key in row_keys {
            if let Some(holiday) = self.get_record(cf::HOLIDAYS, &key)? {
                holidays.push(holiday);
            }
        }
        Ok(holidays)
    }

    /// Whether `date` falls inside any holiday of the facility.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn is_holiday(&self, facility_id: FacilityId, date: NaiveDate) -> Result<bool> {
        Ok(self
            .list_holidays(facility_id)?
            .iter()
            .any(|h| h.covers(date)))
    }

    // =========================================================================
    // Bookings
    // =========================================================================

    /// Get a booking by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_booking(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        self.get_record(cf::BOOKINGS, &keys::booking_key(booking_id))
    }

    /// Find a live (PENDING/ACCEPTED/ACTIVE) booking of one user for one
    /// facility and slot type, via the scope index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_live_booking_in_scope(
        &self,
        user_id: UserId,
        facility_id: FacilityId,
        slot_type: SlotType,
    ) -> Result<Option<Booking>> {
        let prefix = keys::booking_scope_prefix(user_id, facility_id, slot_type);
        for key in self.prefix_keys(cf::BOOKINGS_BY_SCOPE, &prefix)? {
            let booking_id = keys::booking_id_from_scope_key(&key);
            if let Some(booking) = self.get_booking(booking_id)? {
                if booking.status.is_live() {
                    return Ok(Some(booking));
                }
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Escrows
    // =========================================================================

    /// Get an escrow by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_escrow(&self, escrow_id: EscrowId) -> Result<Option<Escrow>> {
        self.get_record(cf::ESCROWS, &keys::escrow_key(escrow_id))
    }

    /// Get the escrow held for a booking, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_escrow_by_booking(&self, booking_id: BookingId) -> Result<Option<Escrow>> {
        let cf = self.cf(cf::ESCROW_BY_BOOKING)?;
        let Some(escrow_key) = self
            .db
            .get_cf(&cf, keys::booking_key(booking_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };
        self.get_record(cf::ESCROWS, &escrow_key)
    }

    /// Escrow ids whose release date is on or before `today`, oldest first.
    ///
    /// The queue may contain paused escrows; callers re-validate status
    /// after claiming the row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn due_escrows(&self, today: NaiveDate, limit: usize) -> Result<Vec<EscrowId>> {
        let cf = self.cf(cf::ESCROW_RELEASE_QUEUE)?;
        let iter = self.db.iterator_cf(&cf, IteratorMode::Start);
        let cutoff = keys::encode_date(today);

        let mut due = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if key.len() < 20 || key[..4] > cutoff[..] {
                break;
            }
            due.push(keys::escrow_id_from_queue_key(&key));
            if due.len() >= limit {
                break;
            }
        }
        Ok(due)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Get a payment by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>> {
        self.get_record(cf::PAYMENTS, &keys::payment_key(payment_id))
    }

    /// Get a payment by gateway order id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_payment_by_order(&self, gateway_order_id: &str) -> Result<Option<Payment>> {
        let cf = self.cf(cf::PAYMENT_BY_ORDER)?;
        let Some(payment_key) = self
            .db
            .get_cf(&cf, gateway_order_id.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };
        self.get_record(cf::PAYMENTS, &payment_key)
    }

    /// Get the payment bound to an entity, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_payment_by_entity(
        &self,
        entity_type: PaymentEntityType,
        entity_id: &str,
    ) -> Result<Option<Payment>> {
        let cf = self.cf(cf::PAYMENT_BY_ENTITY)?;
        let Some(payment_key) = self
            .db
            .get_cf(&cf, keys::payment_entity_key(entity_type, entity_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };
        self.get_record(cf::PAYMENTS, &payment_key)
    }

    // =========================================================================
    // Attendance
    // =========================================================================

    /// Whether attendance was recorded for a booking on a date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn attendance_exists(&self, booking_id: BookingId, date: NaiveDate) -> Result<bool> {
        let cf = self.cf(cf::ATTENDANCE)?;
        Ok(self
            .db
            .get_cf(&cf, keys::attendance_key(booking_id, date))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some())
    }

    /// Whether any attendance was ever recorded for a booking.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn has_any_attendance(&self, booking_id: BookingId) -> Result<bool> {
        let prefix = keys::attendance_prefix(booking_id);
        Ok(!self.prefix_keys(cf::ATTENDANCE, &prefix)?.is_empty())
    }

    // =========================================================================
    // Disputes and trust
    // =========================================================================

    /// Get a dispute by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_dispute(&self, dispute_id: DisputeId) -> Result<Option<Dispute>> {
        self.get_record(cf::DISPUTES, &keys::dispute_key(dispute_id))
    }

    /// The open (SUBMITTED/UNDER_REVIEW) dispute for a booking, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn active_dispute_for_booking(&self, booking_id: BookingId) -> Result<Option<Dispute>> {
        let prefix = keys::booking_key(booking_id);
        for key in self.prefix_keys(cf::DISPUTES_BY_BOOKING, &prefix)? {
            let dispute_id = keys::dispute_id_from_index_key(&key);
            if let Some(dispute) = self.get_dispute(dispute_id)? {
                if dispute.status.is_active() {
                    return Ok(Some(dispute));
                }
            }
        }
        Ok(None)
    }

    /// Get a user's trust ledger, defaulting to a fresh one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_trust(&self, user_id: UserId) -> Result<UserTrust> {
        Ok(self
            .get_record(cf::USER_TRUST, &keys::trust_key(user_id))?
            .unwrap_or_else(|| UserTrust::new(user_id)))
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Get a subscription by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_subscription(&self, subscription_id: SubscriptionId) -> Result<Option<Subscription>> {
        self.get_record(cf::SUBSCRIPTIONS, &keys::subscription_key(subscription_id))
    }

    // =========================================================================
    // Idempotency
    // =========================================================================

    /// Fetch the cached response for an idempotency key if it is still
    /// within its time-to-live.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_idempotent(
        &self,
        key: &str,
        ttl_seconds: i64,
    ) -> Result<Option<serde_json::Value>> {
        let record: Option<IdempotencyRecord> = self.get_record(cf::IDEMPOTENCY, key.as_bytes())?;
        Ok(record.and_then(|r| {
            (Utc::now() - r.stored_at <= Duration::seconds(ttl_seconds)).then_some(r.response)
        }))
    }

    /// Cache a response under an idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_idempotent(
        &self,
        key: &str,
        response: &serde_json::Value,
        stored_at: DateTime<Utc>,
    ) -> Result<()> {
        let record = IdempotencyRecord {
            response: response.clone(),
            stored_at,
        };
        self.put_record(cf::IDEMPOTENCY, key.as_bytes(), &record)
    }
}

/// A staged set of writes, committed atomically.
///
/// Staging methods also maintain the secondary indexes of the rows they
/// touch; dropping an uncommitted batch discards everything.
pub struct Batch<'a> {
    store: &'a Store,
    inner: WriteBatch,
}

impl Batch<'_> {
    fn put<T: Serialize>(&mut self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.store.cf(cf_name)?;
        let bytes = Store::serialize(value)?;
        self.inner.put_cf(&cf, key, bytes);
        Ok(())
    }

    fn put_raw(&mut self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.store.cf(cf_name)?;
        self.inner.put_cf(&cf, key, value);
        Ok(())
    }

    fn delete(&mut self, cf_name: &str, key: &[u8]) -> Result<()> {
        let cf = self.store.cf(cf_name)?;
        self.inner.delete_cf(&cf, key);
        Ok(())
    }

    /// Stage a booking row and its scope index entry.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn put_booking(&mut self, booking: &Booking) -> Result<()> {
        self.put(cf::BOOKINGS, &keys::booking_key(booking.id), booking)?;
        self.put_raw(
            cf::BOOKINGS_BY_SCOPE,
            &keys::booking_scope_key(
                booking.user_id,
                booking.facility_id,
                booking.slot_type,
                booking.id,
            ),
            &[],
        )
    }

    /// Stage a capacity row.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn put_capacity_slot(&mut self, slot: &CapacitySlot) -> Result<()> {
        self.put(
            cf::CAPACITY_SLOTS,
            &keys::capacity_key(slot.facility_id, slot.date, slot.slot_type),
            slot,
        )
    }

    /// Stage a template row and its id index entry.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn put_template(&mut self, template: &SlotTemplate) -> Result<()> {
        let row_key = keys::template_key(template.facility_id, template.slot_type);
        self.put(cf::SLOT_TEMPLATES, &row_key, template)?;
        self.put_raw(cf::TEMPLATE_BY_ID, &keys::template_id_key(template.id), &row_key)
    }

    /// Stage an escrow row, its by-booking index entry, and its release
    /// queue entry (removed once the escrow is terminal).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn put_escrow(&mut self, escrow: &Escrow) -> Result<()> {
        let row_key = keys::escrow_key(escrow.id);
        self.put(cf::ESCROWS, &row_key, escrow)?;
        self.put_raw(cf::ESCROW_BY_BOOKING, &keys::booking_key(escrow.booking_id), &row_key)?;

        let queue_key = keys::release_queue_key(escrow.release_date, escrow.id);
        match escrow.status {
            EscrowStatus::Held | EscrowStatus::Paused => {
                self.put_raw(cf::ESCROW_RELEASE_QUEUE, &queue_key, &[])
            }
            EscrowStatus::Released | EscrowStatus::Refunded => {
                self.delete(cf::ESCROW_RELEASE_QUEUE, &queue_key)
            }
        }
    }

    /// Stage a payment row plus its order and entity index entries.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn put_payment(&mut self, payment: &Payment) -> Result<()> {
        let row_key = keys::payment_key(payment.id);
        self.put(cf::PAYMENTS, &row_key, payment)?;
        self.put_raw(cf::PAYMENT_BY_ORDER, payment.gateway_order_id.as_bytes(), &row_key)?;
        self.put_raw(
            cf::PAYMENT_BY_ENTITY,
            &keys::payment_entity_key(payment.entity_type, &payment.entity_id),
            &row_key,
        )
    }

    /// Stage removal of a stale payment entity index entry (used when a
    /// subscription payment is rebound from its placeholder).
    ///
    /// # Errors
    ///
    /// Returns an error if the column family is missing.
    pub fn remove_payment_entity_index(
        &mut self,
        entity_type: PaymentEntityType,
        entity_id: &str,
    ) -> Result<()> {
        self.delete(
            cf::PAYMENT_BY_ENTITY,
            &keys::payment_entity_key(entity_type, entity_id),
        )
    }

    /// Stage an attendance record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn put_attendance(&mut self, attendance: &Attendance) -> Result<()> {
        self.put(
            cf::ATTENDANCE,
            &keys::attendance_key(attendance.booking_id, attendance.date),
            attendance,
        )
    }

    /// Stage a dispute row and its booking/user index entries.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn put_dispute(&mut self, dispute: &Dispute) -> Result<()> {
        self.put(cf::DISPUTES, &keys::dispute_key(dispute.id), dispute)?;
        self.put_raw(
            cf::DISPUTES_BY_BOOKING,
            &keys::dispute_booking_key(dispute.booking_id, dispute.id),
            &[],
        )
    }

    /// Stage a trust ledger update.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn put_trust(&mut self, trust: &UserTrust) -> Result<()> {
        self.put(cf::USER_TRUST, &keys::trust_key(trust.user_id), trust)
    }

    /// Stage a subscription record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn put_subscription(&mut self, subscription: &Subscription) -> Result<()> {
        self.put(
            cf::SUBSCRIPTIONS,
            &keys::subscription_key(subscription.id),
            subscription,
        )
    }

    /// Commit every staged write atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn commit(self) -> Result<()> {
        self.store
            .db
            .write(self.inner)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use venuepass_core::{ApprovalStatus, BookingStatus, DisputeStatus, PassDays};

    fn create_test_store() -> (Store, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (store, dir)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_booking(status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::generate(),
            user_id: UserId::generate(),
            facility_id: FacilityId::generate(),
            slot_type: SlotType::Morning,
            pass_days: PassDays::Three,
            start_date: date(2025, 4, 1),
            end_date: date(2025, 4, 3),
            active_days_remaining: 3,
            base_amount: 250,
            platform_fee: 5,
            total_amount: 255,
            status,
            idempotency_key: "idem-1".into(),
            qr_code: "CHECKIN::payload::sig".into(),
            created_at: Utc::now(),
        }
    }

    fn sample_escrow(booking_id: BookingId, status: EscrowStatus) -> Escrow {
        Escrow {
            id: EscrowId::generate(),
            booking_id,
            owner_id: UserId::generate(),
            amount_held: 255,
            platform_fee: 5,
            status,
            release_date: date(2025, 4, 4),
            released_at: None,
        }
    }

    #[test]
    fn facility_roundtrip() {
        let (store, _dir) = create_test_store();
        let facility = Facility {
            id: FacilityId::generate(),
            owner_id: UserId::generate(),
            name: "Court A".into(),
            approval_status: ApprovalStatus::Approved,
            is_published: true,
        };

        store.put_facility(&facility).unwrap();
        let loaded = store.get_facility(facility.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Court A");
        assert!(loaded.is_bookable());

        assert_eq!(store.list_facilities().unwrap().len(), 1);
    }

    #[test]
    fn template_lookup_by_pair_and_id() {
        let (store, _dir) = create_test_store();
        let template = SlotTemplate {
            id: TemplateId::generate(),
            facility_id: FacilityId::generate(),
            slot_type: SlotType::Evening,
            start_time: "18:00".into(),
            end_time: "22:00".into(),
            capacity: 8,
            price_1_day: Some(120),
            price_3_day: None,
            price_7_day: None,
            valid_from: date(2025, 1, 1),
            valid_till: date(2025, 1, 31),
            created_at: Utc::now(),
        };

        store.put_template(&template).unwrap();

        let by_pair = store
            .get_template(template.facility_id, SlotType::Evening)
            .unwrap()
            .unwrap();
        assert_eq!(by_pair.id, template.id);

        let by_id = store.get_template_by_id(template.id).unwrap().unwrap();
        assert_eq!(by_id.capacity, 8);

        assert_eq!(
            store
                .list_templates_for_facility(template.facility_id)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn batch_commits_atomically() {
        let (store, _dir) = create_test_store();
        let facility_id = FacilityId::generate();
        let slot = CapacitySlot {
            facility_id,
            date: date(2025, 2, 1),
            slot_type: SlotType::Morning,
            capacity: 5,
            booked: 0,
        };

        // Dropping an uncommitted batch writes nothing.
        {
            let mut batch = store.batch();
            batch.put_capacity_slot(&slot).unwrap();
        }
        assert!(store
            .get_capacity_slot(facility_id, slot.date, SlotType::Morning)
            .unwrap()
            .is_none());

        let mut batch = store.batch();
        batch.put_capacity_slot(&slot).unwrap();
        let booking = sample_booking(BookingStatus::Accepted);
        batch.put_booking(&booking).unwrap();
        batch.commit().unwrap();

        assert!(store
            .get_capacity_slot(facility_id, slot.date, SlotType::Morning)
            .unwrap()
            .is_some());
        assert!(store.get_booking(booking.id).unwrap().is_some());
    }

    #[test]
    fn scope_index_finds_live_bookings_only() {
        let (store, _dir) = create_test_store();
        let mut booking = sample_booking(BookingStatus::Cancelled);

        let mut batch = store.batch();
        batch.put_booking(&booking).unwrap();
        batch.commit().unwrap();

        assert!(store
            .find_live_booking_in_scope(booking.user_id, booking.facility_id, booking.slot_type)
            .unwrap()
            .is_none());

        booking.status = BookingStatus::Active;
        let mut batch = store.batch();
        batch.put_booking(&booking).unwrap();
        batch.commit().unwrap();

        let found = store
            .find_live_booking_in_scope(booking.user_id, booking.facility_id, booking.slot_type)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, booking.id);
    }

    #[test]
    fn escrow_by_booking_and_release_queue() {
        let (store, _dir) = create_test_store();
        let booking = sample_booking(BookingStatus::Active);
        let mut escrow = sample_escrow(booking.id, EscrowStatus::Held);

        let mut batch = store.batch();
        batch.put_escrow(&escrow).unwrap();
        batch.commit().unwrap();

        assert_eq!(
            store.get_escrow_by_booking(booking.id).unwrap().unwrap().id,
            escrow.id
        );

        // Due on and after the release date, not before.
        assert!(store.due_escrows(date(2025, 4, 3), 10).unwrap().is_empty());
        assert_eq!(store.due_escrows(date(2025, 4, 4), 10).unwrap(), vec![escrow.id]);
        assert_eq!(store.due_escrows(date(2025, 4, 10), 10).unwrap(), vec![escrow.id]);

        // Terminal states leave the queue.
        escrow.status = EscrowStatus::Released;
        escrow.released_at = Some(Utc::now());
        let mut batch = store.batch();
        batch.put_escrow(&escrow).unwrap();
        batch.commit().unwrap();

        assert!(store.due_escrows(date(2025, 4, 10), 10).unwrap().is_empty());
    }

    #[test]
    fn payment_indexes_and_rebind() {
        let (store, _dir) = create_test_store();
        let mut payment = Payment {
            id: PaymentId::generate(),
            gateway_order_id: "order_123".into(),
            gateway_payment_id: None,
            entity_type: PaymentEntityType::Subscription,
            entity_id: "temp_owner_1".into(),
            amount: 99_900,
            currency: "INR".into(),
            method: None,
            status: venuepass_core::PaymentStatus::Pending,
            metadata: serde_json::json!({"ownerId": "o1"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let mut batch = store.batch();
        batch.put_payment(&payment).unwrap();
        batch.commit().unwrap();

        assert!(store.get_payment_by_order("order_123").unwrap().is_some());
        assert!(store
            .get_payment_by_entity(PaymentEntityType::Subscription, "temp_owner_1")
            .unwrap()
            .is_some());

        // Rebind to the real subscription id.
        let old_entity = payment.entity_id.clone();
        payment.entity_id = "sub_real".into();
        let mut batch = store.batch();
        batch
            .remove_payment_entity_index(PaymentEntityType::Subscription, &old_entity)
            .unwrap();
        batch.put_payment(&payment).unwrap();
        batch.commit().unwrap();

        assert!(store
            .get_payment_by_entity(PaymentEntityType::Subscription, "temp_owner_1")
            .unwrap()
            .is_none());
        assert!(store
            .get_payment_by_entity(PaymentEntityType::Subscription, "sub_real")
            .unwrap()
            .is_some());
    }

    #[test]
    fn attendance_uniqueness_by_key() {
        let (store, _dir) = create_test_store();
        let booking_id = BookingId::generate();
        let attendance = Attendance {
            booking_id,
            facility_id: FacilityId::generate(),
            date: date(2025, 4, 1),
            created_at: Utc::now(),
        };

        assert!(!store.has_any_attendance(booking_id).unwrap());

        let mut batch = store.batch();
        batch.put_attendance(&attendance).unwrap();
        batch.commit().unwrap();

        assert!(store.attendance_exists(booking_id, date(2025, 4, 1)).unwrap());
        assert!(!store.attendance_exists(booking_id, date(2025, 4, 2)).unwrap());
        assert!(store.has_any_attendance(booking_id).unwrap());
    }

    #[test]
    fn dispute_indexes() {
        let (store, _dir) = create_test_store();
        let booking_id = BookingId::generate();

        let mut dispute = Dispute {
            id: DisputeId::generate(),
            booking_id,
            user_id: UserId::generate(),
            owner_id: UserId::generate(),
            facility_id: FacilityId::generate(),
            reason: "court unusable".into(),
            status: DisputeStatus::Submitted,
            admin_decision: None,
            refund_amount: None,
            created_at: Utc::now(),
        };

        let mut batch = store.batch();
        batch.put_dispute(&dispute).unwrap();
        batch.commit().unwrap();

        assert!(store.active_dispute_for_booking(booking_id).unwrap().is_some());

        dispute.status = DisputeStatus::ResolvedRejected;
        let mut batch = store.batch();
        batch.put_dispute(&dispute).unwrap();
        batch.commit().unwrap();

        assert!(store.active_dispute_for_booking(booking_id).unwrap().is_none());
    }

    #[test]
    fn trust_defaults_to_fresh_ledger() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        let trust = store.get_trust(user_id).unwrap();
        assert_eq!(trust.trust_score, 0);
        assert_eq!(trust.rejected_disputes, 0);
    }

    #[test]
    fn idempotency_ttl() {
        let (store, _dir) = create_test_store();
        let response = serde_json::json!({"bookingId": "b1"});

        store.put_idempotent("key-1", &response, Utc::now()).unwrap();
        assert_eq!(store.get_idempotent("key-1", 600).unwrap(), Some(response.clone()));

        // An entry stored beyond the TTL reads as a miss.
        store
            .put_idempotent("key-2", &response, Utc::now() - Duration::seconds(700))
            .unwrap();
        assert!(store.get_idempotent("key-2", 600).unwrap().is_none());
    }
}
