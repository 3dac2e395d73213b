//! Facility capability sync.
//!
//! Facility CRUD and approval live in the facility service; admins push the
//! resulting capability slice here so the booking core can check
//! bookability and ownership locally.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use venuepass_core::{ApprovalStatus, Facility, FacilityId, UserId};

use crate::auth::Session;
use crate::error::ApiError;
use crate::state::AppState;

/// Facility sync request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertFacilityRequest {
    /// The owning user.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Admin approval state.
    pub approval_status: ApprovalStatus,
    /// Whether the facility is published.
    pub is_published: bool,
}

/// Upsert a facility capability record (admin).
pub async fn upsert_facility(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(facility_id): Path<FacilityId>,
    Json(body): Json<UpsertFacilityRequest>,
) -> Result<Json<Facility>, ApiError> {
    session.ensure_admin()?;

    let facility = Facility {
        id: facility_id,
        owner_id: body.owner_id,
        name: body.name,
        approval_status: body.approval_status,
        is_published: body.is_published,
    };
    state.store.put_facility(&facility)?;

    tracing::info!(
        facility_id = %facility_id,
        owner_id = %facility.owner_id,
        approval_status = ?facility.approval_status,
        is_published = %facility.is_published,
        "Facility record synced"
    );

    Ok(Json(facility))
}
