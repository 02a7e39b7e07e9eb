use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use crate::{
    routes::models::{
        CoLandlordInvitationResponse, CreateUnitRequest, InviteCoLandlordRequest,
        LandlordsResponse, UnitResponse, UnitsResponse, UpdateRoomsRequest, UpdateUnitRequest,
    },
    services::access::{require_unit_access, require_unit_landlord},
    services::invites::co_landlord_invitation_email,
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::{
    new_public_id, CoLandlordInvitation, LandlordRole, NotificationType, RentalUnit, UnitLandlord,
    UserRole,
};

fn validate_letting_kind(value: &str) -> Result<(), ApiError> {
    match value {
        "own_home" | "short_term_own_home" | "secondary" => Ok(()),
        _ => Err(ApiError::bad_request(
            "letting_kind must be own_home, short_term_own_home or secondary",
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/units",
    tag = "Units",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Units visible to the caller", body = UnitsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to fetch units", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_units(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UnitsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let units = sqlx::query_as::<_, RentalUnit>(
        r#"
        SELECT * FROM rental_units u
        WHERE u.id IN (SELECT unit_id FROM unit_landlords WHERE user_id = ?)
           OR u.tenant_id = ?
        ORDER BY u.created_at DESC
        "#,
    )
    .bind(user.id)
    .bind(user.id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch units: {}", e);
        ApiError::internal_server_error("Failed to fetch units")
    })?;

    Ok(Json(UnitsResponse { units }))
}

#[utoipa::path(
    post,
    path = "/api/units",
    tag = "Units",
    security(("bearerAuth" = [])),
    request_body = CreateUnitRequest,
    responses(
        (status = 200, description = "Unit created", body = UnitResponse),
        (status = 400, description = "Invalid unit payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not a landlord", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to create unit", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_unit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateUnitRequest>,
) -> Result<Json<UnitResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if user.role != UserRole::Landlord && user.role != UserRole::Admin {
        return Err(ApiError::forbidden("Only landlords can create units"));
    }

    if req.name.trim().is_empty() || req.address.trim().is_empty() {
        return Err(ApiError::bad_request("Name and address are required"));
    }
    if req.monthly_rent_ore < 0 {
        return Err(ApiError::bad_request("Monthly rent cannot be negative"));
    }
    let letting_kind = req.letting_kind.as_deref().unwrap_or("secondary");
    validate_letting_kind(letting_kind)?;

    let public_id = new_public_id();
    let now = Utc::now().to_rfc3339();

    let unit_db_id = sqlx::query(
        r#"
        INSERT INTO rental_units
            (public_id, landlord_id, name, address, postal_code, city, status,
             monthly_rent_ore, deposit_ore, size_sqm, bedrooms, furnished,
             letting_kind, description, rooms, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'vacant', ?, ?, ?, ?, ?, ?, ?, '[]', ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(user.id)
    .bind(req.name.trim())
    .bind(req.address.trim())
    .bind(req.postal_code.as_deref().unwrap_or(""))
    .bind(req.city.as_deref().unwrap_or(""))
    .bind(req.monthly_rent_ore)
    .bind(req.deposit_ore.unwrap_or(0))
    .bind(req.size_sqm)
    .bind(req.bedrooms)
    .bind(req.furnished)
    .bind(letting_kind)
    .bind(&req.description)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create unit: {}", e);
        ApiError::internal_server_error("Failed to create unit")
    })?
    .last_insert_rowid();

    // The creator becomes the sole owner with the full split.
    sqlx::query(
        "INSERT INTO unit_landlords (unit_id, user_id, role, ownership_percent, joined_at) VALUES (?, ?, 'owner', 100, ?)"
    )
    .bind(unit_db_id)
    .bind(user.id)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to add unit owner: {}", e);
        ApiError::internal_server_error("Failed to create unit")
    })?;

    let unit = fetch_unit_by_id(&state, unit_db_id).await?;
    Ok(Json(UnitResponse { unit }))
}

#[utoipa::path(
    get,
    path = "/api/units/{unit_id}",
    tag = "Units",
    security(("bearerAuth" = [])),
    params(("unit_id" = String, Path, description = "Unit public identifier")),
    responses(
        (status = 200, description = "Unit retrieved", body = UnitResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 404, description = "Unit not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_unit(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<UnitResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_access(state.db_pool(), &unit_id, user.id).await?;
    let unit = fetch_unit_by_id(&state, unit_db_id).await?;

    Ok(Json(UnitResponse { unit }))
}

#[utoipa::path(
    put,
    path = "/api/units/{unit_id}",
    tag = "Units",
    security(("bearerAuth" = [])),
    params(("unit_id" = String, Path, description = "Unit public identifier")),
    request_body = UpdateUnitRequest,
    responses(
        (status = 200, description = "Unit updated", body = UnitResponse),
        (status = 400, description = "Invalid update payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not a landlord of the unit", body = crate::error::ErrorResponse),
        (status = 404, description = "Unit not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_unit(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateUnitRequest>,
) -> Result<Json<UnitResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_landlord(state.db_pool(), &unit_id, user.id).await?;

    if let Some(rent) = req.monthly_rent_ore {
        if rent < 0 {
            return Err(ApiError::bad_request("Monthly rent cannot be negative"));
        }
    }
    if let Some(kind) = req.letting_kind.as_deref() {
        validate_letting_kind(kind)?;
    }

    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE rental_units
        SET name = COALESCE(?, name),
            address = COALESCE(?, address),
            postal_code = COALESCE(?, postal_code),
            city = COALESCE(?, city),
            monthly_rent_ore = COALESCE(?, monthly_rent_ore),
            deposit_ore = COALESCE(?, deposit_ore),
            size_sqm = COALESCE(?, size_sqm),
            bedrooms = COALESCE(?, bedrooms),
            furnished = COALESCE(?, furnished),
            letting_kind = COALESCE(?, letting_kind),
            description = COALESCE(?, description),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&req.name)
    .bind(&req.address)
    .bind(&req.postal_code)
    .bind(&req.city)
    .bind(req.monthly_rent_ore)
    .bind(req.deposit_ore)
    .bind(req.size_sqm)
    .bind(req.bedrooms)
    .bind(req.furnished)
    .bind(&req.letting_kind)
    .bind(&req.description)
    .bind(&now)
    .bind(unit_db_id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to update unit: {}", e);
        ApiError::internal_server_error("Failed to update unit")
    })?;

    let unit = fetch_unit_by_id(&state, unit_db_id).await?;
    Ok(Json(UnitResponse { unit }))
}

#[utoipa::path(
    delete,
    path = "/api/units/{unit_id}",
    tag = "Units",
    security(("bearerAuth" = [])),
    params(("unit_id" = String, Path, description = "Unit public identifier")),
    responses(
        (status = 200, description = "Unit deleted"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Only the owner can delete a unit", body = crate::error::ErrorResponse),
        (status = 404, description = "Unit not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_unit(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, role) = require_unit_landlord(state.db_pool(), &unit_id, user.id).await?;
    if role != LandlordRole::Owner {
        return Err(ApiError::forbidden("Only the owner can delete a unit"));
    }

    sqlx::query("DELETE FROM rental_units WHERE id = ?")
        .bind(unit_db_id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete unit: {}", e);
            ApiError::internal_server_error("Failed to delete unit")
        })?;

    Ok(())
}

#[utoipa::path(
    put,
    path = "/api/units/{unit_id}/rooms",
    tag = "Units",
    security(("bearerAuth" = [])),
    params(("unit_id" = String, Path, description = "Unit public identifier")),
    request_body = UpdateRoomsRequest,
    responses(
        (status = 200, description = "Room list replaced", body = UnitResponse),
        (status = 400, description = "Invalid room payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not a landlord of the unit", body = crate::error::ErrorResponse),
        (status = 404, description = "Unit not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_rooms(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateRoomsRequest>,
) -> Result<Json<UnitResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_landlord(state.db_pool(), &unit_id, user.id).await?;

    for room in &req.rooms {
        if room.name.trim().is_empty() {
            return Err(ApiError::bad_request("Every room needs a name"));
        }
        if room.monthly_rent_ore < 0 {
            return Err(ApiError::bad_request("Room rent cannot be negative"));
        }
    }

    let rooms_json = serde_json::to_string(&req.rooms)
        .map_err(|_| ApiError::bad_request("Invalid room payload"))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query("UPDATE rental_units SET rooms = ?, updated_at = ? WHERE id = ?")
        .bind(&rooms_json)
        .bind(&now)
        .bind(unit_db_id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to update rooms: {}", e);
            ApiError::internal_server_error("Failed to update rooms")
        })?;

    let unit = fetch_unit_by_id(&state, unit_db_id).await?;
    Ok(Json(UnitResponse { unit }))
}

#[utoipa::path(
    get,
    path = "/api/units/{unit_id}/landlords",
    tag = "Units",
    security(("bearerAuth" = [])),
    params(("unit_id" = String, Path, description = "Unit public identifier")),
    responses(
        (status = 200, description = "Owner and co-landlords with splits", body = LandlordsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 404, description = "Unit not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_landlords(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<LandlordsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_access(state.db_pool(), &unit_id, user.id).await?;

    let landlords = sqlx::query_as::<_, UnitLandlord>(
        "SELECT id, unit_id, user_id, role, ownership_percent, joined_at FROM unit_landlords WHERE unit_id = ? ORDER BY joined_at ASC"
    )
    .bind(unit_db_id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch landlords: {}", e);
        ApiError::internal_server_error("Failed to fetch landlords")
    })?;

    Ok(Json(LandlordsResponse { landlords }))
}

#[utoipa::path(
    post,
    path = "/api/units/{unit_id}/co-landlords",
    tag = "Units",
    security(("bearerAuth" = [])),
    params(("unit_id" = String, Path, description = "Unit public identifier")),
    request_body = InviteCoLandlordRequest,
    responses(
        (status = 200, description = "Co-landlord invited", body = crate::routes::models::CoLandlordInvitationResponse),
        (status = 400, description = "Invalid ownership split", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Only the owner can invite co-landlords", body = crate::error::ErrorResponse),
        (status = 404, description = "Unit not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn invite_co_landlord(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<InviteCoLandlordRequest>,
) -> Result<Json<CoLandlordInvitationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, role) = require_unit_landlord(state.db_pool(), &unit_id, user.id).await?;
    if role != LandlordRole::Owner {
        return Err(ApiError::forbidden("Only the owner can invite co-landlords"));
    }

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }

    // The invited split comes out of the owner's share on acceptance, so
    // the owner must keep at least one percent.
    let owner_percent: i64 = sqlx::query_scalar(
        "SELECT ownership_percent FROM unit_landlords WHERE unit_id = ? AND user_id = ?",
    )
    .bind(unit_db_id)
    .bind(user.id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch ownership split: {}", e);
        ApiError::internal_server_error("Failed to create invitation")
    })?;

    if req.ownership_percent < 1 || req.ownership_percent >= owner_percent {
        return Err(ApiError::bad_request(
            "Ownership percent must be at least 1 and leave the owner a share",
        ));
    }

    let already_member: Option<i64> = sqlx::query_scalar(
        "SELECT ul.id FROM unit_landlords ul JOIN users u ON u.id = ul.user_id WHERE ul.unit_id = ? AND u.email = ?"
    )
    .bind(unit_db_id)
    .bind(&email)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to check membership: {}", e);
        ApiError::internal_server_error("Failed to create invitation")
    })?;

    if already_member.is_some() {
        return Err(ApiError::conflict("That user is already a landlord of the unit"));
    }

    let public_id = new_public_id();
    let invite_token = utleie_auth::generate_token();
    let now = Utc::now();
    let expires_at = (now + state.invitation_ttl()).to_rfc3339();
    let now = now.to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO co_landlord_invitations
            (public_id, unit_id, inviter_id, email, token, ownership_percent, status, expires_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(unit_db_id)
    .bind(user.id)
    .bind(&email)
    .bind(&invite_token)
    .bind(req.ownership_percent)
    .bind(&expires_at)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create co-landlord invitation: {}", e);
        ApiError::internal_server_error("Failed to create invitation")
    })?;

    let invitation = sqlx::query_as::<_, CoLandlordInvitation>(
        "SELECT * FROM co_landlord_invitations WHERE public_id = ?",
    )
    .bind(&public_id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch created invitation: {}", e);
        ApiError::internal_server_error("Failed to create invitation")
    })?;

    let unit = fetch_unit_by_id(&state, unit_db_id).await?;
    state
        .mailer()
        .dispatch(co_landlord_invitation_email(
            &email,
            &unit.name,
            req.ownership_percent,
            &invite_token,
        ))
        .await;

    // Existing accounts also get an in-app notification.
    if let Ok(Some(invitee)) = state.users().find_by_email(&email).await {
        state
            .notifications()
            .notify(
                invitee.id,
                NotificationType::InvitationReceived,
                "Du er invitert som medutleier",
                &format!("Du har fått en medutleier-invitasjon til {}.", unit.name),
            )
            .await;
    }

    Ok(Json(CoLandlordInvitationResponse {
        invitation,
        token: invite_token,
    }))
}

async fn fetch_unit_by_id(state: &AppState, unit_db_id: i64) -> Result<RentalUnit, ApiError> {
    sqlx::query_as::<_, RentalUnit>("SELECT * FROM rental_units WHERE id = ?")
        .bind(unit_db_id)
        .fetch_optional(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch unit: {}", e);
            ApiError::internal_server_error("Failed to fetch unit")
        })?
        .ok_or_else(|| ApiError::not_found("Unit not found"))
}
