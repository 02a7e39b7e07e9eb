use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use crate::{
    routes::models::{
        CreateTenantInvitationRequest, InvitationsResponse, TenantInvitationResponse,
    },
    services::access::require_unit_landlord,
    services::invites::tenant_invitation_email,
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::{
    new_public_id, CoLandlordInvitation, NotificationType, TenantInvitation, User,
};

#[utoipa::path(
    post,
    path = "/api/units/{unit_id}/invitations",
    tag = "Invitations",
    security(("bearerAuth" = [])),
    params(("unit_id" = String, Path, description = "Unit public identifier")),
    request_body = CreateTenantInvitationRequest,
    responses(
        (status = 200, description = "Invitation created and emailed", body = TenantInvitationResponse),
        (status = 400, description = "Invalid email", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not a landlord of the unit", body = crate::error::ErrorResponse),
        (status = 404, description = "Unit not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Unit already occupied", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_tenant_invitation(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateTenantInvitationRequest>,
) -> Result<Json<TenantInvitationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_landlord(state.db_pool(), &unit_id, user.id).await?;

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }

    let (unit_name, unit_status, monthly_rent_ore): (String, String, i64) = sqlx::query_as(
        "SELECT name, status, monthly_rent_ore FROM rental_units WHERE id = ?",
    )
    .bind(unit_db_id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch unit: {}", e);
        ApiError::internal_server_error("Failed to create invitation")
    })?;

    if unit_status == "occupied" {
        return Err(ApiError::conflict("Unit already has a tenant"));
    }

    let public_id = new_public_id();
    let invite_token = utleie_auth::generate_token();
    let now = Utc::now();
    let expires_at = (now + state.invitation_ttl()).to_rfc3339();
    let now = now.to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO tenant_invitations
            (public_id, unit_id, inviter_id, email, token, status, expires_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(unit_db_id)
    .bind(user.id)
    .bind(&email)
    .bind(&invite_token)
    .bind(&expires_at)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create invitation: {}", e);
        ApiError::internal_server_error("Failed to create invitation")
    })?;

    sqlx::query("UPDATE rental_units SET status = 'pending_invitation', updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(unit_db_id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark unit pending: {}", e);
            ApiError::internal_server_error("Failed to create invitation")
        })?;

    let invitation = sqlx::query_as::<_, TenantInvitation>(
        "SELECT * FROM tenant_invitations WHERE public_id = ?",
    )
    .bind(&public_id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch created invitation: {}", e);
        ApiError::internal_server_error("Failed to create invitation")
    })?;

    state
        .mailer()
        .dispatch(tenant_invitation_email(
            &email,
            &unit_name,
            monthly_rent_ore,
            &invite_token,
        ))
        .await;

    if let Ok(Some(invitee)) = state.users().find_by_email(&email).await {
        state
            .notifications()
            .notify(
                invitee.id,
                NotificationType::InvitationReceived,
                "Du har en ventende invitasjon",
                &format!("Du er invitert som leietaker til {unit_name}."),
            )
            .await;
    }

    Ok(Json(TenantInvitationResponse {
        invitation,
        token: invite_token,
    }))
}

/// List pending invitations addressed to the caller's email.
pub async fn list_my_invitations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<InvitationsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let Some(email) = user.email.clone() else {
        return Ok(Json(InvitationsResponse {
            tenant_invitations: Vec::new(),
            co_landlord_invitations: Vec::new(),
        }));
    };
    let now = Utc::now().to_rfc3339();

    let tenant_invitations = sqlx::query_as::<_, TenantInvitation>(
        "SELECT * FROM tenant_invitations WHERE email = ? AND status = 'pending' AND expires_at > ? ORDER BY created_at DESC"
    )
    .bind(&email)
    .bind(&now)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch invitations: {}", e);
        ApiError::internal_server_error("Failed to fetch invitations")
    })?;

    let co_landlord_invitations = sqlx::query_as::<_, CoLandlordInvitation>(
        "SELECT * FROM co_landlord_invitations WHERE email = ? AND status = 'pending' AND expires_at > ? ORDER BY created_at DESC"
    )
    .bind(&email)
    .bind(&now)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch co-landlord invitations: {}", e);
        ApiError::internal_server_error("Failed to fetch invitations")
    })?;

    Ok(Json(InvitationsResponse {
        tenant_invitations,
        co_landlord_invitations,
    }))
}

/// Look up a pending invitation by token, enforcing addressee and expiry.
///
/// Expired rows are flipped to `expired` on touch and reported as a
/// conflict, mirroring session expiry-on-touch.
async fn load_pending_invitation<F>(
    state: &AppState,
    table: &str,
    token: &str,
    user: &User,
) -> Result<F, ApiError>
where
    F: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
{
    let query = format!("SELECT * FROM {table} WHERE token = ? AND status = 'pending'");
    let row = sqlx::query(&query)
        .bind(token)
        .fetch_optional(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch invitation: {}", e);
            ApiError::internal_server_error("Failed to fetch invitation")
        })?
        .ok_or_else(|| ApiError::not_found("Invitation not found"))?;

    use sqlx::Row;
    let email: String = row
        .try_get("email")
        .map_err(|_| ApiError::internal_server_error("Failed to fetch invitation"))?;
    let expires_at: String = row
        .try_get("expires_at")
        .map_err(|_| ApiError::internal_server_error("Failed to fetch invitation"))?;

    if user.email.as_deref() != Some(email.as_str()) {
        return Err(ApiError::forbidden("Invitation not for this user"));
    }

    let now = Utc::now().to_rfc3339();
    if expires_at <= now {
        let expire = format!(
            "UPDATE {table} SET status = 'expired', updated_at = ? WHERE token = ?"
        );
        let _ = sqlx::query(&expire)
            .bind(&now)
            .bind(token)
            .execute(state.db_pool())
            .await;
        return Err(ApiError::conflict("Invitation has expired"));
    }

    F::from_row(&row).map_err(|e| {
        tracing::error!("Failed to decode invitation: {}", e);
        ApiError::internal_server_error("Failed to fetch invitation")
    })
}

pub async fn accept_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let bearer = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&bearer).await?;

    let invitation: TenantInvitation =
        load_pending_invitation(&state, "tenant_invitations", &token, &user).await?;

    // The unit may have been let to somebody else in the meantime.
    let tenant_id: Option<i64> =
        sqlx::query_scalar("SELECT tenant_id FROM rental_units WHERE id = ?")
            .bind(invitation.unit_id)
            .fetch_one(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to check unit: {}", e);
                ApiError::internal_server_error("Failed to accept invitation")
            })?;
    if tenant_id.is_some() {
        return Err(ApiError::conflict("Unit already has a tenant"));
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = state.db_pool().begin().await.map_err(|e| {
        tracing::error!("Failed to open transaction: {}", e);
        ApiError::internal_server_error("Failed to accept invitation")
    })?;

    sqlx::query("UPDATE tenant_invitations SET status = 'accepted', updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(invitation.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update invitation: {}", e);
            ApiError::internal_server_error("Failed to accept invitation")
        })?;

    sqlx::query(
        "UPDATE rental_units SET tenant_id = ?, status = 'occupied', updated_at = ? WHERE id = ?",
    )
    .bind(user.id)
    .bind(&now)
    .bind(invitation.unit_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to occupy unit: {}", e);
        ApiError::internal_server_error("Failed to accept invitation")
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit acceptance: {}", e);
        ApiError::internal_server_error("Failed to accept invitation")
    })?;

    state
        .notifications()
        .notify(
            invitation.inviter_id,
            NotificationType::InvitationAccepted,
            "Invitasjon akseptert",
            &format!(
                "{} har akseptert invitasjonen.",
                user.display_name.as_deref().unwrap_or("Leietakeren")
            ),
        )
        .await;

    Ok(())
}

pub async fn decline_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let bearer = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&bearer).await?;

    let invitation: TenantInvitation =
        load_pending_invitation(&state, "tenant_invitations", &token, &user).await?;

    let now = Utc::now().to_rfc3339();

    sqlx::query("UPDATE tenant_invitations SET status = 'declined', updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(invitation.id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to decline invitation: {}", e);
            ApiError::internal_server_error("Failed to decline invitation")
        })?;

    // Only flip the unit back if this invitation was the reason it was
    // pending; an occupied unit stays occupied.
    sqlx::query(
        "UPDATE rental_units SET status = 'vacant', updated_at = ? WHERE id = ? AND status = 'pending_invitation'"
    )
    .bind(&now)
    .bind(invitation.unit_id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to reset unit status: {}", e);
        ApiError::internal_server_error("Failed to decline invitation")
    })?;

    state
        .notifications()
        .notify(
            invitation.inviter_id,
            NotificationType::InvitationDeclined,
            "Invitasjon avslått",
            &format!("Invitasjonen til {} ble avslått.", invitation.email),
        )
        .await;

    Ok(())
}

/// The inviter withdraws a pending invitation.
pub async fn cancel_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let bearer = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&bearer).await?;

    let invitation = sqlx::query_as::<_, TenantInvitation>(
        "SELECT * FROM tenant_invitations WHERE token = ? AND inviter_id = ? AND status = 'pending'"
    )
    .bind(&token)
    .bind(user.id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch invitation: {}", e);
        ApiError::internal_server_error("Failed to cancel invitation")
    })?
    .ok_or_else(|| ApiError::not_found("Invitation not found"))?;

    let now = Utc::now().to_rfc3339();

    sqlx::query("UPDATE tenant_invitations SET status = 'cancelled', updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(invitation.id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to cancel invitation: {}", e);
            ApiError::internal_server_error("Failed to cancel invitation")
        })?;

    sqlx::query(
        "UPDATE rental_units SET status = 'vacant', updated_at = ? WHERE id = ? AND status = 'pending_invitation'"
    )
    .bind(&now)
    .bind(invitation.unit_id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to reset unit status: {}", e);
        ApiError::internal_server_error("Failed to cancel invitation")
    })?;

    Ok(())
}

pub async fn accept_co_landlord_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let bearer = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&bearer).await?;

    let invitation: CoLandlordInvitation =
        load_pending_invitation(&state, "co_landlord_invitations", &token, &user).await?;

    // The inviter's share funds the new split and may have shrunk since
    // the invitation went out.
    let inviter_percent: Option<i64> = sqlx::query_scalar(
        "SELECT ownership_percent FROM unit_landlords WHERE unit_id = ? AND user_id = ?",
    )
    .bind(invitation.unit_id)
    .bind(invitation.inviter_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch inviter split: {}", e);
        ApiError::internal_server_error("Failed to accept invitation")
    })?;

    let inviter_percent = inviter_percent
        .ok_or_else(|| ApiError::conflict("The inviter no longer owns this unit"))?;
    if inviter_percent - invitation.ownership_percent < 1 {
        return Err(ApiError::conflict(
            "The inviter's remaining share cannot cover this split",
        ));
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = state.db_pool().begin().await.map_err(|e| {
        tracing::error!("Failed to open transaction: {}", e);
        ApiError::internal_server_error("Failed to accept invitation")
    })?;

    sqlx::query(
        "INSERT INTO unit_landlords (unit_id, user_id, role, ownership_percent, joined_at) VALUES (?, ?, 'co_landlord', ?, ?)"
    )
    .bind(invitation.unit_id)
    .bind(user.id)
    .bind(invitation.ownership_percent)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to add co-landlord: {}", e);
        ApiError::internal_server_error("Failed to accept invitation")
    })?;

    sqlx::query(
        "UPDATE unit_landlords SET ownership_percent = ownership_percent - ? WHERE unit_id = ? AND user_id = ?"
    )
    .bind(invitation.ownership_percent)
    .bind(invitation.unit_id)
    .bind(invitation.inviter_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to rebalance ownership: {}", e);
        ApiError::internal_server_error("Failed to accept invitation")
    })?;

    sqlx::query(
        "UPDATE co_landlord_invitations SET status = 'accepted', updated_at = ? WHERE id = ?",
    )
    .bind(&now)
    .bind(invitation.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update invitation: {}", e);
        ApiError::internal_server_error("Failed to accept invitation")
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit acceptance: {}", e);
        ApiError::internal_server_error("Failed to accept invitation")
    })?;

    state
        .notifications()
        .notify(
            invitation.inviter_id,
            NotificationType::InvitationAccepted,
            "Medutleier-invitasjon akseptert",
            &format!(
                "{} er nå medutleier.",
                user.display_name.as_deref().unwrap_or("Mottakeren")
            ),
        )
        .await;

    Ok(())
}

pub async fn decline_co_landlord_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let bearer = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&bearer).await?;

    let invitation: CoLandlordInvitation =
        load_pending_invitation(&state, "co_landlord_invitations", &token, &user).await?;

    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "UPDATE co_landlord_invitations SET status = 'declined', updated_at = ? WHERE id = ?",
    )
    .bind(&now)
    .bind(invitation.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to decline invitation: {}", e);
        ApiError::internal_server_error("Failed to decline invitation")
    })?;

    state
        .notifications()
        .notify(
            invitation.inviter_id,
            NotificationType::InvitationDeclined,
            "Medutleier-invitasjon avslått",
            &format!("Invitasjonen til {} ble avslått.", invitation.email),
        )
        .await;

    Ok(())
}
