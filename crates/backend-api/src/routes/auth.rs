use axum::{extract::State, http::HeaderMap, Json};

use crate::{
    routes::models::{
        ChooseRoleRequest, LoginRequest, RegisterRequest, SessionResponse, UpdateProfileRequest,
        UserResponse,
    },
    services::invites::process_pending_invitations,
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::UserRole;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created and logged in", body = SessionResponse),
        (status = 400, description = "Invalid payload or email in use", body = crate::error::ErrorResponse),
        (status = 500, description = "Registration failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let (user, session) = state
        .authenticator()
        .register_with_password(&email, &req.password, req.display_name.as_deref())
        .await?;

    process_pending_invitations(state.db_pool(), state.notifications(), &user).await;

    Ok(Json(SessionResponse {
        token: session.token,
        expires_at: session.expires_at.to_rfc3339(),
        user,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    let session = state
        .authenticator()
        .login_with_password(&email, &req.password)
        .await?;

    let user = state.authenticator().user_profile(session.user_id).await?;

    process_pending_invitations(state.db_pool(), state.notifications(), &user).await;

    Ok(Json(SessionResponse {
        token: session.token,
        expires_at: session.expires_at.to_rfc3339(),
        user,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Session deleted"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<(), ApiError> {
    let token = require_bearer(&headers)?;
    state.authenticate(&token).await?;
    state.authenticator().logout(&token).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;
    Ok(Json(UserResponse { user }))
}

#[utoipa::path(
    put,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearerAuth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let user = state
        .users()
        .update_profile(user.id, req.display_name.as_deref(), req.phone.as_deref())
        .await?;

    Ok(Json(UserResponse { user }))
}

#[utoipa::path(
    post,
    path = "/api/auth/role",
    tag = "Auth",
    security(("bearerAuth" = [])),
    request_body = ChooseRoleRequest,
    responses(
        (status = 200, description = "Role locked in", body = UserResponse),
        (status = 400, description = "Invalid role", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 409, description = "Role already chosen", body = crate::error::ErrorResponse)
    )
)]
pub async fn choose_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChooseRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    // Only the two self-service roles can be chosen here.
    let role = match req.role.as_str() {
        "landlord" => UserRole::Landlord,
        "tenant" => UserRole::Tenant,
        _ => return Err(ApiError::bad_request("Role must be landlord or tenant")),
    };

    let user = state.users().set_role(user.id, role).await?;

    Ok(Json(UserResponse { user }))
}
