//! Slot templates, holidays, and capacity materialization.
//!
//! The materializer expands a template's validity window into capacity
//! rows, skipping holidays and auto-extending expired windows. It is
//! insert-only and idempotent: existing rows are never deleted or shrunk,
//! so regenerating after a holiday or capacity change is always safe.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use venuepass_core::{
    CapacitySlot, Facility, FacilityId, Holiday, HolidayId, SlotError, SlotTemplate, SlotType,
    TemplateId, AUTO_EXTEND_DAYS,
};
use venuepass_store::lock_keys;

use crate::auth::Session;
use crate::error::ApiError;
use crate::state::AppState;

/// Template creation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    /// The facility the template belongs to.
    pub facility_id: FacilityId,
    /// Time-of-day slot.
    pub slot_type: SlotType,
    /// Slot start time, `"HH:MM"`.
    pub start_time: String,
    /// Slot end time, `"HH:MM"`.
    pub end_time: String,
    /// Seats per materialized day.
    pub capacity: u32,
    /// 1-day pass price.
    #[serde(default)]
    pub price_1_day: Option<i64>,
    /// 3-day pass price.
    #[serde(default)]
    pub price_3_day: Option<i64>,
    /// 7-day pass price.
    #[serde(default)]
    pub price_7_day: Option<i64>,
    /// First bookable date.
    pub valid_from: NaiveDate,
    /// Last bookable date.
    pub valid_till: NaiveDate,
}

/// Capacity update request.
#[derive(Debug, Deserialize)]
pub struct UpdateCapacityRequest {
    /// New per-day seat count.
    pub capacity: u32,
}

/// Holiday creation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHolidayRequest {
    /// First closed date.
    pub start_date: NaiveDate,
    /// Last closed date.
    pub end_date: NaiveDate,
    /// Human-readable reason.
    pub reason: String,
}

/// Materialization result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Number of capacity rows inserted.
    pub generated: u32,
}

/// Create a slot template and materialize its window (owner).
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(body): Json<CreateTemplateRequest>,
) -> Result<Json<SlotTemplate>, ApiError> {
    session.ensure_owner()?;
    let facility = owned_facility(&state, body.facility_id, &session)?;

    if body.valid_from > body.valid_till {
        return Err(SlotError::InvalidWindow.into());
    }
    if state
        .store
        .get_template(facility.id, body.slot_type)?
        .is_some()
    {
        return Err(SlotError::TemplateExists.into());
    }

    let template = SlotTemplate {
        id: TemplateId::generate(),
        facility_id: facility.id,
        slot_type: body.slot_type,
        start_time: body.start_time,
        end_time: body.end_time,
        capacity: body.capacity,
        price_1_day: body.price_1_day,
        price_3_day: body.price_3_day,
        price_7_day: body.price_7_day,
        valid_from: body.valid_from,
        valid_till: body.valid_till,
        created_at: Utc::now(),
    };
    if !template.has_price() {
        return Err(SlotError::NoPriceConfigured.into());
    }

    state.store.put_template(&template)?;
    let generated = generate_for_template(&state, template.id).await?;

    tracing::info!(
        template_id = %template.id,
        facility_id = %facility.id,
        slot_type = ?template.slot_type,
        generated = %generated,
        "Slot template created"
    );

    Ok(Json(template))
}

/// Update a template's per-day capacity and regenerate (owner).
pub async fn update_capacity(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(template_id): Path<TemplateId>,
    Json(body): Json<UpdateCapacityRequest>,
) -> Result<Json<SlotTemplate>, ApiError> {
    session.ensure_owner()?;

    let mut template = state
        .store
        .get_template_by_id(template_id)?
        .ok_or(SlotError::TemplateNotFound)?;
    owned_facility(&state, template.facility_id, &session)?;

    template.capacity = body.capacity;
    state.store.put_template(&template)?;
    regenerate_for_facility(&state, template.facility_id).await?;

    tracing::info!(
        template_id = %template.id,
        capacity = %template.capacity,
        "Template capacity updated"
    );

    Ok(Json(template))
}

/// Add a facility holiday and regenerate (owner).
pub async fn create_holiday(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(facility_id): Path<FacilityId>,
    Json(body): Json<CreateHolidayRequest>,
) -> Result<Json<Holiday>, ApiError> {
    session.ensure_owner()?;
    owned_facility(&state, facility_id, &session)?;

    if body.start_date > body.end_date {
        return Err(SlotError::InvalidWindow.into());
    }
    let overlapping = state
        .store
        .list_holidays(facility_id)?
        .iter()
        .any(|h| h.overlaps(body.start_date, body.end_date));
    if overlapping {
        return Err(SlotError::HolidayOverlap.into());
    }

    let holiday = Holiday {
        id: HolidayId::generate(),
        facility_id,
        start_date: body.start_date,
        end_date: body.end_date,
        reason: body.reason,
    };
    state.store.put_holiday(&holiday)?;
    regenerate_for_facility(&state, facility_id).await?;

    tracing::info!(
        holiday_id = %holiday.id,
        facility_id = %facility_id,
        start_date = %holiday.start_date,
        end_date = %holiday.end_date,
        "Holiday added"
    );

    Ok(Json(holiday))
}

/// Remove a facility holiday and regenerate (owner).
pub async fn delete_holiday(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path((facility_id, holiday_id)): Path<(FacilityId, HolidayId)>,
) -> Result<Json<GenerateResponse>, ApiError> {
    session.ensure_owner()?;
    owned_facility(&state, facility_id, &session)?;

    if !state.store.delete_holiday(facility_id, holiday_id)? {
        return Err(SlotError::HolidayNotFound.into());
    }
    let generated = regenerate_for_facility(&state, facility_id).await?;

    tracing::info!(
        holiday_id = %holiday_id,
        facility_id = %facility_id,
        generated = %generated,
        "Holiday removed"
    );

    Ok(Json(GenerateResponse { generated }))
}

/// Regenerate every template of a facility (owner or admin).
pub async fn regenerate_facility(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(facility_id): Path<FacilityId>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if !session.is_admin() {
        session.ensure_owner()?;
        owned_facility(&state, facility_id, &session)?;
    }

    let generated = regenerate_for_facility(&state, facility_id).await?;
    Ok(Json(GenerateResponse { generated }))
}

/// Expand one template's validity window into capacity rows.
///
/// Skips holiday-covered dates and dates that already have a row. If the
/// window has fully expired, extends `valid_till` to today plus
/// [`AUTO_EXTEND_DAYS`] and persists the template before expanding. Holding
/// the template lock excludes concurrent bookings for this facility/slot,
/// so a fresh row can never clobber an in-flight `booked` increment.
pub async fn generate_for_template(
    state: &AppState,
    template_id: TemplateId,
) -> Result<u32, ApiError> {
    let mut template = state
        .store
        .get_template_by_id(template_id)?
        .ok_or(SlotError::TemplateNotFound)?;

    let _guard = state
        .locks
        .acquire(vec![lock_keys::template(
            template.facility_id,
            template.slot_type,
        )])
        .await;

    let today = Utc::now().date_naive();
    if template.valid_till < today {
        template.valid_till = today + Duration::days(AUTO_EXTEND_DAYS);
        state.store.put_template(&template)?;
        tracing::info!(
            template_id = %template.id,
            valid_till = %template.valid_till,
            "Expired template auto-extended"
        );
    }

    let holidays = state.store.list_holidays(template.facility_id)?;
    let mut batch = state.store.batch();
    let mut generated = 0u32;

    let mut current = template.valid_from;
    while current <= template.valid_till {
        let is_holiday = holidays.iter().any(|h| h.covers(current));
        if !is_holiday
            && state
                .store
                .get_capacity_slot(template.facility_id, current, template.slot_type)?
                .is_none()
        {
            batch.put_capacity_slot(&CapacitySlot {
                facility_id: template.facility_id,
                date: current,
                slot_type: template.slot_type,
                capacity: template.capacity,
                booked: 0,
            })?;
            generated += 1;
        }
        current += Duration::days(1);
    }

    batch.commit()?;

    tracing::debug!(
        template_id = %template_id,
        generated = %generated,
        "Capacity materialized"
    );
    Ok(generated)
}

/// Run [`generate_for_template`] for every template of a facility.
pub async fn regenerate_for_facility(
    state: &AppState,
    facility_id: FacilityId,
) -> Result<u32, ApiError> {
    let mut generated = 0;
    for template in state.store.list_templates_for_facility(facility_id)? {
        generated += generate_for_template(state, template.id).await?;
    }
    Ok(generated)
}

fn owned_facility(
    state: &AppState,
    facility_id: FacilityId,
    session: &Session,
) -> Result<Facility, ApiError> {
    let facility = state
        .store
        .get_facility(facility_id)?
        .ok_or(SlotError::FacilityNotFound)?;
    if facility.owner_id != session.user_id {
        return Err(ApiError::Forbidden(
            "facility does not belong to this owner".into(),
        ));
    }
    Ok(facility)
}
