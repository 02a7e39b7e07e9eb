use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use crate::{
    routes::models::{
        AgreementResponse, AgreementsResponse, AmendAgreementRequest, CreateAgreementRequest,
        UpdateAgreementRequest,
    },
    services::access::require_unit_landlord,
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::{
    new_public_id, AgreementStatus, NotificationType, RentalAgreement, SignerParty,
    TransitionError, User,
};

#[utoipa::path(
    get,
    path = "/api/agreements",
    tag = "Agreements",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Agreements the caller is party to", body = AgreementsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to fetch agreements", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_agreements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AgreementsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let agreements = sqlx::query_as::<_, RentalAgreement>(
        r#"
        SELECT * FROM rental_agreements
        WHERE landlord_id = ? OR tenant_id = ?
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user.id)
    .bind(user.id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch agreements: {}", e);
        ApiError::internal_server_error("Failed to fetch agreements")
    })?;

    Ok(Json(AgreementsResponse { agreements }))
}

#[utoipa::path(
    post,
    path = "/api/agreements",
    tag = "Agreements",
    security(("bearerAuth" = [])),
    request_body = CreateAgreementRequest,
    responses(
        (status = 200, description = "Draft agreement created", body = AgreementResponse),
        (status = 400, description = "Invalid agreement payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not a landlord of the unit", body = crate::error::ErrorResponse),
        (status = 404, description = "Unit or tenant not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_agreement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateAgreementRequest>,
) -> Result<Json<AgreementResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_landlord(state.db_pool(), &req.unit_id, user.id).await?;

    let tenant = state
        .users()
        .find_by_public_id(&req.tenant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    if req.start_date.trim().is_empty() {
        return Err(ApiError::bad_request("A start date is required"));
    }

    let (unit_rent, unit_deposit): (i64, i64) =
        sqlx::query_as("SELECT monthly_rent_ore, deposit_ore FROM rental_units WHERE id = ?")
            .bind(unit_db_id)
            .fetch_one(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch unit: {}", e);
                ApiError::internal_server_error("Failed to create agreement")
            })?;

    let public_id = new_public_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO rental_agreements
            (public_id, unit_id, landlord_id, tenant_id, status, landlord_signed, tenant_signed,
             monthly_rent_ore, deposit_ore, start_date, end_date, terms, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'draft', false, false, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(unit_db_id)
    .bind(user.id)
    .bind(tenant.id)
    .bind(req.monthly_rent_ore.unwrap_or(unit_rent))
    .bind(req.deposit_ore.unwrap_or(unit_deposit))
    .bind(req.start_date.trim())
    .bind(&req.end_date)
    .bind(req.terms.as_deref().unwrap_or(""))
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create agreement: {}", e);
        ApiError::internal_server_error("Failed to create agreement")
    })?;

    let agreement = fetch_agreement(&state, &public_id, user.id).await?;
    Ok(Json(AgreementResponse { agreement }))
}

#[utoipa::path(
    get,
    path = "/api/agreements/{agreement_id}",
    tag = "Agreements",
    security(("bearerAuth" = [])),
    params(("agreement_id" = String, Path, description = "Agreement public identifier")),
    responses(
        (status = 200, description = "Agreement retrieved", body = AgreementResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 404, description = "Agreement not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AgreementResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let agreement = fetch_agreement(&state, &agreement_id, user.id).await?;
    Ok(Json(AgreementResponse { agreement }))
}

#[utoipa::path(
    put,
    path = "/api/agreements/{agreement_id}",
    tag = "Agreements",
    security(("bearerAuth" = [])),
    params(("agreement_id" = String, Path, description = "Agreement public identifier")),
    request_body = UpdateAgreementRequest,
    responses(
        (status = 200, description = "Draft updated", body = AgreementResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Only the landlord can edit", body = crate::error::ErrorResponse),
        (status = 404, description = "Agreement not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Agreement is no longer editable", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateAgreementRequest>,
) -> Result<Json<AgreementResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let agreement = fetch_agreement(&state, &agreement_id, user.id).await?;
    if agreement.landlord_id != user.id {
        return Err(ApiError::forbidden("Only the landlord can edit the agreement"));
    }
    if !agreement.editable() {
        return Err(TransitionError::NotEditable.into());
    }

    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE rental_agreements
        SET monthly_rent_ore = COALESCE(?, monthly_rent_ore),
            deposit_ore = COALESCE(?, deposit_ore),
            start_date = COALESCE(?, start_date),
            end_date = COALESCE(?, end_date),
            terms = COALESCE(?, terms),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.monthly_rent_ore)
    .bind(req.deposit_ore)
    .bind(&req.start_date)
    .bind(&req.end_date)
    .bind(&req.terms)
    .bind(&now)
    .bind(agreement.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to update agreement: {}", e);
        ApiError::internal_server_error("Failed to update agreement")
    })?;

    let agreement = fetch_agreement(&state, &agreement_id, user.id).await?;
    Ok(Json(AgreementResponse { agreement }))
}

#[utoipa::path(
    post,
    path = "/api/agreements/{agreement_id}/send",
    tag = "Agreements",
    security(("bearerAuth" = [])),
    params(("agreement_id" = String, Path, description = "Agreement public identifier")),
    responses(
        (status = 200, description = "Agreement sent for signing", body = AgreementResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Only the landlord can send", body = crate::error::ErrorResponse),
        (status = 404, description = "Agreement not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Agreement is not a draft", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AgreementResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let mut agreement = fetch_agreement(&state, &agreement_id, user.id).await?;
    if agreement.landlord_id != user.id {
        return Err(ApiError::forbidden("Only the landlord can send the agreement"));
    }

    agreement.send()?;
    persist_agreement(&state, &agreement).await?;

    state
        .notifications()
        .notify(
            agreement.tenant_id,
            NotificationType::AgreementSent,
            "Leieavtale til signering",
            "Du har mottatt en leieavtale som venter på signatur.",
        )
        .await;

    Ok(Json(AgreementResponse { agreement }))
}

#[utoipa::path(
    post,
    path = "/api/agreements/{agreement_id}/sign",
    tag = "Agreements",
    security(("bearerAuth" = [])),
    params(("agreement_id" = String, Path, description = "Agreement public identifier")),
    responses(
        (status = 200, description = "Signature recorded", body = AgreementResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 404, description = "Agreement not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Agreement is not awaiting this signature", body = crate::error::ErrorResponse)
    )
)]
pub async fn sign_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AgreementResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let mut agreement = fetch_agreement(&state, &agreement_id, user.id).await?;
    let party = signer_party(&agreement, &user);

    let now = Utc::now().to_rfc3339();
    let became_active = agreement.sign(party, &now)?;
    persist_agreement(&state, &agreement).await?;

    let other_party = match party {
        SignerParty::Landlord => agreement.tenant_id,
        SignerParty::Tenant => agreement.landlord_id,
    };

    if became_active {
        // The lease is binding; the unit follows.
        sqlx::query(
            "UPDATE rental_units SET tenant_id = ?, status = 'occupied', updated_at = ? WHERE id = ?",
        )
        .bind(agreement.tenant_id)
        .bind(&now)
        .bind(agreement.unit_id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to occupy unit: {}", e);
            ApiError::internal_server_error("Failed to update unit")
        })?;

        state
            .notifications()
            .notify(
                other_party,
                NotificationType::AgreementActive,
                "Leieavtalen er aktiv",
                "Begge parter har signert; leieavtalen er nå aktiv.",
            )
            .await;
    } else {
        state
            .notifications()
            .notify(
                other_party,
                NotificationType::AgreementSigned,
                "Leieavtalen er signert av motparten",
                "Avtalen venter nå på din signatur.",
            )
            .await;
    }

    Ok(Json(AgreementResponse { agreement }))
}

#[utoipa::path(
    post,
    path = "/api/agreements/{agreement_id}/amend",
    tag = "Agreements",
    security(("bearerAuth" = [])),
    params(("agreement_id" = String, Path, description = "Agreement public identifier")),
    request_body = AmendAgreementRequest,
    responses(
        (status = 200, description = "Agreement amended, both signatures reset", body = AgreementResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Only the landlord can amend", body = crate::error::ErrorResponse),
        (status = 404, description = "Agreement not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Only active agreements can be amended", body = crate::error::ErrorResponse)
    )
)]
pub async fn amend_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AmendAgreementRequest>,
) -> Result<Json<AgreementResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let mut agreement = fetch_agreement(&state, &agreement_id, user.id).await?;
    if agreement.landlord_id != user.id {
        return Err(ApiError::forbidden("Only the landlord can amend the agreement"));
    }

    agreement.amend()?;
    if let Some(rent) = req.monthly_rent_ore {
        agreement.monthly_rent_ore = rent;
    }
    if let Some(terms) = req.terms {
        agreement.terms = terms;
    }
    persist_agreement(&state, &agreement).await?;

    state
        .notifications()
        .notify(
            agreement.tenant_id,
            NotificationType::AgreementAmended,
            "Leieavtalen er endret",
            "Avtalen er endret og må signeres på nytt av begge parter.",
        )
        .await;

    Ok(Json(AgreementResponse { agreement }))
}

#[utoipa::path(
    post,
    path = "/api/agreements/{agreement_id}/terminate",
    tag = "Agreements",
    security(("bearerAuth" = [])),
    params(("agreement_id" = String, Path, description = "Agreement public identifier")),
    responses(
        (status = 200, description = "Agreement terminated", body = AgreementResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 404, description = "Agreement not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Agreement already terminated", body = crate::error::ErrorResponse)
    )
)]
pub async fn terminate_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AgreementResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let mut agreement = fetch_agreement(&state, &agreement_id, user.id).await?;
    let was_active = agreement.status == AgreementStatus::Active;

    agreement.terminate()?;
    persist_agreement(&state, &agreement).await?;

    if was_active {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE rental_units SET tenant_id = NULL, status = 'vacant', updated_at = ? WHERE id = ? AND tenant_id = ?",
        )
        .bind(&now)
        .bind(agreement.unit_id)
        .bind(agreement.tenant_id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to vacate unit: {}", e);
            ApiError::internal_server_error("Failed to update unit")
        })?;
    }

    let other_party = if user.id == agreement.landlord_id {
        agreement.tenant_id
    } else {
        agreement.landlord_id
    };
    state
        .notifications()
        .notify(
            other_party,
            NotificationType::AgreementTerminated,
            "Leieavtalen er avsluttet",
            "Leieavtalen er avsluttet av motparten.",
        )
        .await;

    Ok(Json(AgreementResponse { agreement }))
}

fn signer_party(agreement: &RentalAgreement, user: &User) -> SignerParty {
    if user.id == agreement.landlord_id {
        SignerParty::Landlord
    } else {
        SignerParty::Tenant
    }
}

async fn fetch_agreement(
    state: &AppState,
    public_id: &str,
    user_id: i64,
) -> Result<RentalAgreement, ApiError> {
    sqlx::query_as::<_, RentalAgreement>(
        "SELECT * FROM rental_agreements WHERE public_id = ? AND (landlord_id = ? OR tenant_id = ?)",
    )
    .bind(public_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch agreement: {}", e);
        ApiError::internal_server_error("Failed to fetch agreement")
    })?
    .ok_or_else(|| ApiError::not_found("Agreement not found"))
}

async fn persist_agreement(state: &AppState, agreement: &RentalAgreement) -> Result<(), ApiError> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE rental_agreements
        SET status = ?,
            landlord_signed = ?,
            tenant_signed = ?,
            landlord_signed_at = ?,
            tenant_signed_at = ?,
            monthly_rent_ore = ?,
            deposit_ore = ?,
            terms = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(agreement.status.to_string())
    .bind(agreement.landlord_signed)
    .bind(agreement.tenant_signed)
    .bind(&agreement.landlord_signed_at)
    .bind(&agreement.tenant_signed_at)
    .bind(agreement.monthly_rent_ore)
    .bind(agreement.deposit_ore)
    .bind(&agreement.terms)
    .bind(&now)
    .bind(agreement.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to persist agreement: {}", e);
        ApiError::internal_server_error("Failed to update agreement")
    })?;

    Ok(())
}
