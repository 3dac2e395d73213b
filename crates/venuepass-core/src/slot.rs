//! Slot templates, materialized capacity, and facility holidays.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{FacilityId, HolidayId, PassDays, TemplateId};

/// How many days an expired template's validity window is extended by when
/// the materializer finds `valid_till` already in the past.
pub const AUTO_EXTEND_DAYS: i64 = 15;

/// Time-of-day slot a facility offers.
///
/// A facility has at most one template per slot type, so `(facility, slot
/// type)` addresses a template and `(facility, date, slot type)` addresses a
/// capacity row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotType {
    /// Morning slot.
    Morning,
    /// Afternoon slot.
    Afternoon,
    /// Evening slot.
    Evening,
}

impl SlotType {
    /// Single-byte tag used in store key encodings.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Morning => 0,
            Self::Afternoon => 1,
            Self::Evening => 2,
        }
    }

    /// Inverse of [`SlotType::tag`].
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Morning),
            1 => Some(Self::Afternoon),
            2 => Some(Self::Evening),
            _ => None,
        }
    }

    /// The wire name, as it appears in JSON payloads and credentials.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "MORNING",
            Self::Afternoon => "AFTERNOON",
            Self::Evening => "EVENING",
        }
    }
}

/// An owner-defined recurring offering for one facility and time of day.
///
/// Templates are expanded into [`CapacitySlot`] rows by the materializer.
/// Prices are per pass duration; at least one must be set for the template
/// to be sellable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTemplate {
    /// Template id.
    pub id: TemplateId,
    /// The facility this template belongs to.
    pub facility_id: FacilityId,
    /// Time-of-day slot.
    pub slot_type: SlotType,
    /// Slot start time, `"HH:MM"` 24-hour format.
    pub start_time: String,
    /// Slot end time, `"HH:MM"` 24-hour format.
    pub end_time: String,
    /// Seats available per materialized day.
    pub capacity: u32,
    /// Price of a 1-day pass, in minor currency units.
    pub price_1_day: Option<i64>,
    /// Price of a 3-day pass, in minor currency units.
    pub price_3_day: Option<i64>,
    /// Price of a 7-day pass, in minor currency units.
    pub price_7_day: Option<i64>,
    /// First bookable date (inclusive).
    pub valid_from: NaiveDate,
    /// Last bookable date (inclusive); auto-extended when expired.
    pub valid_till: NaiveDate,
    /// When the template was created.
    pub created_at: DateTime<Utc>,
}

impl SlotTemplate {
    /// The price for a given pass duration, if the template sells it.
    #[must_use]
    pub const fn price_for(&self, pass_days: PassDays) -> Option<i64> {
        match pass_days {
            PassDays::One => self.price_1_day,
            PassDays::Three => self.price_3_day,
            PassDays::Seven => self.price_7_day,
        }
    }

    /// Whether `date` falls inside the validity window (inclusive).
    #[must_use]
    pub fn window_contains(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && date <= self.valid_till
    }

    /// Whether the template has any sellable price.
    #[must_use]
    pub const fn has_price(&self) -> bool {
        self.price_1_day.is_some() || self.price_3_day.is_some() || self.price_7_day.is_some()
    }

    /// The slot window as minutes-from-midnight `(start, end)`.
    ///
    /// Returns `None` when either time string is malformed; callers treat a
    /// missing window as "no time restriction".
    #[must_use]
    pub fn time_window_minutes(&self) -> Option<(u32, u32)> {
        Some((parse_hhmm(&self.start_time)?, parse_hhmm(&self.end_time)?))
    }
}

fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// One materialized bookable unit for a specific calendar date.
///
/// Invariant: `0 <= booked <= capacity`. Rows are insert-only; `booked` is
/// mutated only under the row lock inside a unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySlot {
    /// The facility this row belongs to.
    pub facility_id: FacilityId,
    /// The calendar date.
    pub date: NaiveDate,
    /// Time-of-day slot.
    pub slot_type: SlotType,
    /// Seats available on this date.
    pub capacity: u32,
    /// Seats already reserved.
    pub booked: u32,
}

impl CapacitySlot {
    /// Whether every seat is taken.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.booked >= self.capacity
    }
}

/// A closed-date range for a facility.
///
/// Ranges are non-overlapping per facility. Holidays are skipped by both the
/// materializer and the booking walk: they consume neither pass term nor
/// capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    /// Holiday id.
    pub id: HolidayId,
    /// The facility the holiday applies to.
    pub facility_id: FacilityId,
    /// First closed date (inclusive).
    pub start_date: NaiveDate,
    /// Last closed date (inclusive).
    pub end_date: NaiveDate,
    /// Human-readable reason.
    pub reason: String,
}

impl Holiday {
    /// Whether `date` falls inside this holiday range (inclusive).
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Whether this range overlaps `[start, end]`.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}
