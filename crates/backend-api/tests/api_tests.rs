use std::str::FromStr;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tempfile::TempDir;
use tower::ServiceExt;
use utleie_auth::Authenticator;
use utleie_backend_api::{build_router, AppState};
use utleie_config::AppConfig;
use utleie_database::{UserRepository, UserRole};
use utleie_mailer::Mailer;

type TestResult<T = ()> = anyhow::Result<T>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../database/migrations");

struct TestContext {
    _temp_dir: TempDir,
    pool: SqlitePool,
    state: AppState,
}

impl TestContext {
    async fn new() -> TestResult<Self> {
        let config = AppConfig::default();
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("backend_api.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let mut options = SqliteConnectOptions::from_str(&db_url)?;
        options = options.create_if_missing(true);
        options = options.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let authenticator = Authenticator::new(pool.clone(), config.auth.clone());
        let mailer = Mailer::from_config(&config.email);
        let state = AppState::new(pool.clone(), authenticator, mailer, &config);

        Ok(Self {
            _temp_dir: temp_dir,
            pool,
            state,
        })
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Register an account and lock in a role, returning its bearer token.
    async fn register(&self, email: &str, role: UserRole) -> TestResult<String> {
        let (user, session) = self
            .state
            .authenticator()
            .register_with_password(email, "test-passord", Some(email.split('@').next().unwrap()))
            .await?;

        if role != UserRole::Unassigned {
            UserRepository::new(self.pool.clone())
                .set_role(user.id, role)
                .await?;
        }

        Ok(session.token)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResult<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        Ok((status, value))
    }

    async fn create_unit(&self, token: &str, name: &str) -> TestResult<String> {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/units",
                Some(token),
                Some(json!({
                    "name": name,
                    "address": "Storgata 1",
                    "postal_code": "0155",
                    "city": "Oslo",
                    "monthly_rent_ore": 1_200_000,
                    "deposit_ore": 3_600_000
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "create unit failed: {body}");
        Ok(body["unit"]["public_id"].as_str().unwrap().to_string())
    }

    /// Attach a tenant to a unit through the invitation flow.
    async fn let_unit(
        &self,
        landlord_token: &str,
        tenant_token: &str,
        tenant_email: &str,
        unit_id: &str,
    ) -> TestResult<()> {
        let (status, body) = self
            .send(
                Method::POST,
                &format!("/api/units/{unit_id}/invitations"),
                Some(landlord_token),
                Some(json!({ "email": tenant_email })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "invite failed: {body}");
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = self
            .send(
                Method::POST,
                &format!("/api/invitations/{token}/accept"),
                Some(tenant_token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "accept failed: {body}");
        Ok(())
    }
}

#[tokio::test]
async fn health_check_is_public() -> TestResult {
    let ctx = TestContext::new().await?;
    let (status, body) = ctx.send(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn register_login_and_me_round_trip() -> TestResult {
    let ctx = TestContext::new().await?;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "kari@example.com",
                "password": "passord123",
                "display_name": "Kari"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    assert_eq!(body["user"]["role"], "unassigned");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .send(Method::GET, "/api/auth/me", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "kari@example.com");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "kari@example.com", "password": "passord123" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert!(body["token"].as_str().is_some());

    Ok(())
}

#[tokio::test]
async fn short_passwords_are_rejected() -> TestResult {
    let ctx = TestContext::new().await?;
    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "kari@example.com", "password": "kort" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn role_choice_is_locked_after_first_pick() -> TestResult {
    let ctx = TestContext::new().await?;
    let token = ctx.register("kari@example.com", UserRole::Unassigned).await?;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/role",
            Some(&token),
            Some(json!({ "role": "landlord" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "landlord");

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/auth/role",
            Some(&token),
            Some(json!({ "role": "tenant" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/auth/role",
            Some(&token),
            Some(json!({ "role": "admin" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "admin is not self-service");

    Ok(())
}

#[tokio::test]
async fn unit_routes_require_authentication() -> TestResult {
    let ctx = TestContext::new().await?;
    let (status, _) = ctx.send(Method::GET, "/api/units", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn tenants_cannot_create_units() -> TestResult {
    let ctx = TestContext::new().await?;
    let token = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/units",
            Some(&token),
            Some(json!({ "name": "Hybel", "address": "Gata 2", "monthly_rent_ore": 500_000 })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn units_are_invisible_to_strangers() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let stranger = ctx.register("nils@example.com", UserRole::Landlord).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    let (status, body) = ctx
        .send(Method::GET, &format!("/api/units/{unit_id}"), Some(&landlord), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unit"]["status"], "vacant");

    let (status, _) = ctx
        .send(Method::GET, &format!("/api/units/{unit_id}"), Some(&stranger), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = ctx.send(Method::GET, "/api/units", Some(&stranger), None).await?;
    assert_eq!(body["units"].as_array().unwrap().len(), 0);

    Ok(())
}

#[tokio::test]
async fn invitation_flow_occupies_the_unit() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/invitations"),
            Some(&landlord),
            Some(json!({ "email": "ola@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "invite failed: {body}");
    let invite_token = body["token"].as_str().unwrap().to_string();

    // Unit is reserved while the invitation is out.
    let (_, body) = ctx
        .send(Method::GET, &format!("/api/units/{unit_id}"), Some(&landlord), None)
        .await?;
    assert_eq!(body["unit"]["status"], "pending_invitation");

    // The invitee sees it in their pending list.
    let (_, body) = ctx.send(Method::GET, "/api/invitations", Some(&tenant), None).await?;
    assert_eq!(body["tenant_invitations"].as_array().unwrap().len(), 1);

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/invitations/{invite_token}/accept"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx
        .send(Method::GET, &format!("/api/units/{unit_id}"), Some(&tenant), None)
        .await?;
    assert_eq!(body["unit"]["status"], "occupied");

    // The inviter got a notification about the acceptance.
    let (_, body) = ctx
        .send(Method::GET, "/api/notifications", Some(&landlord), None)
        .await?;
    let types: Vec<&str> = body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["notification_type"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"invitation_accepted"), "got {types:?}");

    Ok(())
}

#[tokio::test]
async fn invitations_cannot_be_accepted_by_the_wrong_user() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let other = ctx.register("nils@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    let (_, body) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/invitations"),
            Some(&landlord),
            Some(json!({ "email": "ola@example.com" })),
        )
        .await?;
    let invite_token = body["token"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/invitations/{invite_token}/accept"),
            Some(&other),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn declined_and_cancelled_invitations_release_the_unit() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    let (_, body) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/invitations"),
            Some(&landlord),
            Some(json!({ "email": "ola@example.com" })),
        )
        .await?;
    let invite_token = body["token"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/invitations/{invite_token}/decline"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx
        .send(Method::GET, &format!("/api/units/{unit_id}"), Some(&landlord), None)
        .await?;
    assert_eq!(body["unit"]["status"], "vacant");

    // Second round: the inviter withdraws before any answer.
    let (_, body) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/invitations"),
            Some(&landlord),
            Some(json!({ "email": "ola@example.com" })),
        )
        .await?;
    let invite_token = body["token"].as_str().unwrap().to_string();

    // Only the inviter can cancel.
    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/invitations/{invite_token}"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/invitations/{invite_token}"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx
        .send(Method::GET, &format!("/api/units/{unit_id}"), Some(&landlord), None)
        .await?;
    assert_eq!(body["unit"]["status"], "vacant");

    // A cancelled token cannot be accepted afterwards.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/invitations/{invite_token}/accept"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn expired_invitations_flip_to_expired_on_touch() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    let (_, body) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/invitations"),
            Some(&landlord),
            Some(json!({ "email": "ola@example.com" })),
        )
        .await?;
    let invite_token = body["token"].as_str().unwrap().to_string();

    // Backdate the expiry past the seven-day window.
    let stale = (Utc::now() - Duration::days(1)).to_rfc3339();
    sqlx::query("UPDATE tenant_invitations SET expires_at = ? WHERE token = ?")
        .bind(&stale)
        .bind(&invite_token)
        .execute(ctx.pool())
        .await?;

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/invitations/{invite_token}/accept"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let status_col: String =
        sqlx::query_scalar("SELECT status FROM tenant_invitations WHERE token = ?")
            .bind(&invite_token)
            .fetch_one(ctx.pool())
            .await?;
    assert_eq!(status_col, "expired");

    Ok(())
}

#[tokio::test]
async fn agreement_signature_flow_activates_and_amends() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;
    ctx.let_unit(&landlord, &tenant, "ola@example.com", &unit_id)
        .await?;

    let (_, body) = ctx.send(Method::GET, "/api/auth/me", Some(&tenant), None).await?;
    let tenant_public_id = body["user"]["public_id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/agreements",
            Some(&landlord),
            Some(json!({
                "unit_id": unit_id,
                "tenant_id": tenant_public_id,
                "start_date": "2026-09-01",
                "terms": "Standard leieavtale"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "create agreement failed: {body}");
    assert_eq!(body["agreement"]["status"], "draft");
    let agreement_id = body["agreement"]["public_id"].as_str().unwrap().to_string();

    // Signing a draft is a conflict.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/sign"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // Only the landlord can send.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/send"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/send"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agreement"]["status"], "pending_tenant");

    // Draft edits are no longer allowed.
    let (status, _) = ctx
        .send(
            Method::PUT,
            &format!("/api/agreements/{agreement_id}"),
            Some(&landlord),
            Some(json!({ "terms": "Nye vilkår" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/sign"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agreement"]["status"], "pending_tenant");
    assert_eq!(body["agreement"]["tenant_signed"], true);

    // Double signature is a conflict.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/sign"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/sign"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agreement"]["status"], "active");

    // Amendment resets both signatures.
    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/amend"),
            Some(&landlord),
            Some(json!({ "monthly_rent_ore": 1_300_000 })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agreement"]["status"], "pending_tenant");
    assert_eq!(body["agreement"]["landlord_signed"], false);
    assert_eq!(body["agreement"]["tenant_signed"], false);
    assert_eq!(body["agreement"]["monthly_rent_ore"], 1_300_000);

    Ok(())
}

#[tokio::test]
async fn terminating_an_active_agreement_vacates_the_unit() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;
    ctx.let_unit(&landlord, &tenant, "ola@example.com", &unit_id)
        .await?;

    let (_, body) = ctx.send(Method::GET, "/api/auth/me", Some(&tenant), None).await?;
    let tenant_public_id = body["user"]["public_id"].as_str().unwrap().to_string();

    let (_, body) = ctx
        .send(
            Method::POST,
            "/api/agreements",
            Some(&landlord),
            Some(json!({
                "unit_id": unit_id,
                "tenant_id": tenant_public_id,
                "start_date": "2026-09-01"
            })),
        )
        .await?;
    let agreement_id = body["agreement"]["public_id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/send"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    for token in [&tenant, &landlord] {
        let (status, _) = ctx
            .send(
                Method::POST,
                &format!("/api/agreements/{agreement_id}/sign"),
                Some(token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/terminate"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agreement"]["status"], "terminated");

    let (_, body) = ctx
        .send(Method::GET, &format!("/api/units/{unit_id}"), Some(&landlord), None)
        .await?;
    assert_eq!(body["unit"]["status"], "vacant");
    assert!(body["unit"]["tenant_id"].is_null());

    // Terminated is final.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/agreements/{agreement_id}/terminate"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn finances_validate_and_aggregate() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/finances"),
            Some(&landlord),
            Some(json!({
                "entry_type": "income",
                "category": "rent",
                "amount_ore": -5,
                "entry_date": "2026-01-05"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for (entry_type, category, amount, date) in [
        ("income", "rent", 1_200_000i64, "2026-01-05"),
        ("income", "rent", 1_200_000, "2026-02-05"),
        ("expense", "insurance", 300_000, "2026-02-10"),
    ] {
        let (status, body) = ctx
            .send(
                Method::POST,
                &format!("/api/units/{unit_id}/finances"),
                Some(&landlord),
                Some(json!({
                    "entry_type": entry_type,
                    "category": category,
                    "amount_ore": amount,
                    "entry_date": date
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "entry failed: {body}");
    }

    // Date-range filter picks up February only.
    let (_, body) = ctx
        .send(
            Method::GET,
            &format!("/api/units/{unit_id}/finances?from=2026-02-01&to=2026-02-28"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);

    let (status, body) = ctx
        .send(
            Method::GET,
            "/api/reports/summary?from=2026-01-01&to=2026-12-31",
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_income_ore"], 2_400_000);
    assert_eq!(body["total_expense_ore"], 300_000);
    assert_eq!(body["total_net_ore"], 2_100_000);

    Ok(())
}

#[tokio::test]
async fn tax_report_applies_flat_rate_to_secondary_units() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    for (entry_type, category, amount) in [
        ("income", "rent", 24_000_000i64),
        ("expense", "municipal_fees", 4_000_000),
    ] {
        ctx.send(
            Method::POST,
            &format!("/api/units/{unit_id}/finances"),
            Some(&landlord),
            Some(json!({
                "entry_type": entry_type,
                "category": category,
                "amount_ore": amount,
                "entry_date": "2026-06-15"
            })),
        )
        .await?;
    }

    let (status, body) = ctx
        .send(Method::GET, "/api/reports/tax?year=2026", Some(&landlord), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    // 200 000 kr profit at 22 % => 44 000 kr.
    assert_eq!(body["total_estimated_tax_ore"], 4_400_000);
    assert_eq!(body["units"][0]["estimate"]["taxable_base_ore"], 20_000_000);

    // Own-home letting is exempt.
    ctx.send(
        Method::PUT,
        &format!("/api/units/{unit_id}"),
        Some(&landlord),
        Some(json!({ "letting_kind": "own_home" })),
    )
    .await?;

    let (_, body) = ctx
        .send(Method::GET, "/api/reports/tax?year=2026", Some(&landlord), None)
        .await?;
    assert_eq!(body["total_estimated_tax_ore"], 0);
    assert_eq!(body["units"][0]["estimate"]["tax_free"], true);

    Ok(())
}

#[tokio::test]
async fn maintenance_completion_books_and_reverts_expenses() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;
    ctx.let_unit(&landlord, &tenant, "ola@example.com", &unit_id)
        .await?;

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/maintenance"),
            Some(&tenant),
            Some(json!({ "title": "Lekkasje på badet", "priority": "urgent" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "report failed: {body}");
    let task_id = body["task"]["public_id"].as_str().unwrap().to_string();

    // The landlord was notified of the tenant report.
    let (_, body) = ctx
        .send(Method::GET, "/api/notifications?unread_only=true", Some(&landlord), None)
        .await?;
    assert!(body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["notification_type"] == "maintenance_reported"));

    // Tenants cannot complete tasks.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/maintenance/{task_id}/complete"),
            Some(&tenant),
            Some(json!({ "cost_ore": 450_000 })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/maintenance/{task_id}/complete"),
            Some(&landlord),
            Some(json!({ "cost_ore": 450_000 })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "complete failed: {body}");
    assert_eq!(body["task"]["status"], "completed");
    assert!(body["task"]["financial_entry_id"].is_number());

    let (_, body) = ctx
        .send(
            Method::GET,
            &format!("/api/units/{unit_id}/finances"),
            Some(&landlord),
            None,
        )
        .await?;
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["category"], "maintenance");
    assert_eq!(entries[0]["amount_ore"], 450_000);

    // Completing twice is a conflict.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/maintenance/{task_id}/complete"),
            Some(&landlord),
            Some(json!({})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // Reopening removes the linked expense again.
    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/maintenance/{task_id}/reopen"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["status"], "open");
    assert!(body["task"]["financial_entry_id"].is_null());

    let (_, body) = ctx
        .send(
            Method::GET,
            &format!("/api/units/{unit_id}/finances"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(body["entries"].as_array().unwrap().len(), 0);

    Ok(())
}

#[tokio::test]
async fn unit_thread_messaging_works_both_ways() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    // Messaging a vacant unit has no recipient.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/messages"),
            Some(&landlord),
            Some(json!({ "content": "Hei!" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    ctx.let_unit(&landlord, &tenant, "ola@example.com", &unit_id)
        .await?;

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/messages"),
            Some(&tenant),
            Some(json!({ "content": "Hei, vaskemaskinen bråker." })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/messages"),
            Some(&landlord),
            Some(json!({ "content": "Takk, jeg ser på det i morgen." })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx
        .send(
            Method::GET,
            &format!("/api/units/{unit_id}/messages"),
            Some(&tenant),
            None,
        )
        .await?;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["read"], false);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/messages/read",
            Some(&tenant),
            Some(json!({ "unit_id": unit_id })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    Ok(())
}

#[tokio::test]
async fn payment_reminder_settlement_books_rent_income() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    // No tenant yet: nothing to remind.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/reminders"),
            Some(&landlord),
            Some(json!({ "due_date": "2026-09-01" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    ctx.let_unit(&landlord, &tenant, "ola@example.com", &unit_id)
        .await?;

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/reminders"),
            Some(&landlord),
            Some(json!({ "due_date": "2026-09-01" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "create reminder failed: {body}");
    // Amount defaults to the unit rent.
    assert_eq!(body["reminder"]["amount_ore"], 1_200_000);
    let reminder_id = body["reminder"]["public_id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/reminders/{reminder_id}/send"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reminder"]["status"], "sent");

    // The tenant got an in-app nudge.
    let (_, body) = ctx
        .send(Method::GET, "/api/notifications?unread_only=true", Some(&tenant), None)
        .await?;
    assert!(body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["notification_type"] == "payment_reminder"));

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/reminders/{reminder_id}/paid"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reminder"]["status"], "paid");

    let (_, body) = ctx
        .send(
            Method::GET,
            &format!("/api/units/{unit_id}/finances"),
            Some(&landlord),
            None,
        )
        .await?;
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["entry_type"], "income");
    assert_eq!(entries[0]["category"], "rent");

    Ok(())
}

#[tokio::test]
async fn co_landlord_acceptance_rebalances_ownership() -> TestResult {
    let ctx = TestContext::new().await?;
    let owner = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let partner = ctx.register("nils@example.com", UserRole::Landlord).await?;

    let unit_id = ctx.create_unit(&owner, "Sokkelleilighet").await?;

    // A full split would leave the owner with nothing.
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/co-landlords"),
            Some(&owner),
            Some(json!({ "email": "nils@example.com", "ownership_percent": 100 })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/units/{unit_id}/co-landlords"),
            Some(&owner),
            Some(json!({ "email": "nils@example.com", "ownership_percent": 40 })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "invite failed: {body}");
    let invite_token = body["token"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/co-landlord-invitations/{invite_token}/accept"),
            Some(&partner),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx
        .send(
            Method::GET,
            &format!("/api/units/{unit_id}/landlords"),
            Some(&partner),
            None,
        )
        .await?;
    let landlords = body["landlords"].as_array().unwrap();
    assert_eq!(landlords.len(), 2);
    let total: i64 = landlords
        .iter()
        .map(|l| l["ownership_percent"].as_i64().unwrap())
        .sum();
    assert_eq!(total, 100, "splits must sum to 100");

    Ok(())
}

#[tokio::test]
async fn error_log_endpoint_always_acknowledges() -> TestResult {
    let ctx = TestContext::new().await?;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/errors",
            None,
            Some(json!({ "message": "TypeError: x is undefined", "user_agent": "test" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM error_logs")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn account_deletion_cascades_owned_data() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;
    ctx.let_unit(&landlord, &tenant, "ola@example.com", &unit_id)
        .await?;

    ctx.send(
        Method::POST,
        &format!("/api/units/{unit_id}/finances"),
        Some(&landlord),
        Some(json!({
            "entry_type": "income",
            "category": "rent",
            "amount_ore": 1_200_000,
            "entry_date": "2026-08-01"
        })),
    )
    .await?;

    let (status, body) = ctx
        .send(Method::DELETE, "/api/account", Some(&landlord), None)
        .await?;
    assert_eq!(status, StatusCode::OK, "delete failed: {body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["deleted"]["rental_units"], 1);

    // The session died with the account.
    let (status, _) = ctx
        .send(Method::GET, "/api/auth/me", Some(&landlord), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let units: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rental_units")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(units, 0);
    let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM financial_entries")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(entries, 0);

    // The tenant account is untouched.
    let (status, _) = ctx.send(Method::GET, "/api/auth/me", Some(&tenant), None).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn admin_purge_requires_admin_role() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let admin = ctx.register("admin@example.com", UserRole::Unassigned).await?;

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/admin/purge",
            Some(&landlord),
            Some(json!({ "email": "admin@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admin is never self-service; grant it directly.
    sqlx::query("UPDATE users SET role = 'admin' WHERE email = 'admin@example.com'")
        .execute(ctx.pool())
        .await?;

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/admin/purge",
            Some(&admin),
            Some(json!({ "email": "ukjent@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/admin/purge",
            Some(&admin),
            Some(json!({ "email": "kari@example.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "purge failed: {body}");
    assert_eq!(body["user_deleted"], true);

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = 'kari@example.com'")
            .fetch_one(ctx.pool())
            .await?;
    assert_eq!(remaining, 0);

    Ok(())
}

#[tokio::test]
async fn calendar_events_are_scoped_to_their_owner() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let other = ctx.register("nils@example.com", UserRole::Landlord).await?;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/events",
            Some(&landlord),
            Some(json!({
                "title": "Visning",
                "event_type": "viewing",
                "starts_at": "2026-09-01T17:00:00Z"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "create event failed: {body}");
    let event_id = body["event"]["public_id"].as_str().unwrap().to_string();

    let (_, body) = ctx.send(Method::GET, "/api/events", Some(&other), None).await?;
    assert_eq!(body["events"].as_array().unwrap().len(), 0);

    let (status, _) = ctx
        .send(Method::DELETE, &format!("/api/events/{event_id}"), Some(&other), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/events/{event_id}"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn tenant_ratings_require_history_and_are_unique() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;

    let (_, body) = ctx.send(Method::GET, "/api/auth/me", Some(&tenant), None).await?;
    let tenant_public_id = body["user"]["public_id"].as_str().unwrap().to_string();

    // No tenancy history yet.
    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/ratings",
            Some(&landlord),
            Some(json!({ "unit_id": unit_id, "tenant_id": tenant_public_id, "score": 5 })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.let_unit(&landlord, &tenant, "ola@example.com", &unit_id)
        .await?;

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/ratings",
            Some(&landlord),
            Some(json!({ "unit_id": unit_id, "tenant_id": tenant_public_id, "score": 9 })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "score must be 1..=5");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/ratings",
            Some(&landlord),
            Some(json!({
                "unit_id": unit_id,
                "tenant_id": tenant_public_id,
                "score": 4,
                "comment": "Ryddig og grei"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "rating failed: {body}");

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/ratings",
            Some(&landlord),
            Some(json!({ "unit_id": unit_id, "tenant_id": tenant_public_id, "score": 2 })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "one rating per triple");

    let (status, body) = ctx
        .send(
            Method::GET,
            &format!("/api/ratings/tenant/{tenant_public_id}"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ratings"].as_array().unwrap().len(), 1);
    assert_eq!(body["average_score"], 4.0);

    // Tenants cannot browse ratings.
    let (status, _) = ctx
        .send(
            Method::GET,
            &format!("/api/ratings/tenant/{tenant_public_id}"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn notifications_mark_read_and_count() -> TestResult {
    let ctx = TestContext::new().await?;
    let landlord = ctx.register("kari@example.com", UserRole::Landlord).await?;
    let tenant = ctx.register("ola@example.com", UserRole::Tenant).await?;

    let unit_id = ctx.create_unit(&landlord, "Sokkelleilighet").await?;
    ctx.let_unit(&landlord, &tenant, "ola@example.com", &unit_id)
        .await?;

    let (_, body) = ctx
        .send(
            Method::GET,
            "/api/notifications/unread-count",
            Some(&landlord),
            None,
        )
        .await?;
    let unread = body["unread_count"].as_i64().unwrap();
    assert!(unread >= 1, "landlord should have acceptance notification");

    let (_, body) = ctx
        .send(Method::GET, "/api/notifications", Some(&landlord), None)
        .await?;
    let first_id = body["notifications"][0]["id"].as_i64().unwrap();

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/notifications/{first_id}/read"),
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["read"], true);

    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/notifications/{first_id}/read"),
            Some(&tenant),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "scoped to owner");

    let (_, body) = ctx
        .send(Method::POST, "/api/notifications/read-all", Some(&landlord), None)
        .await?;
    assert!(body["updated"].as_i64().is_some());

    let (_, body) = ctx
        .send(
            Method::GET,
            "/api/notifications/unread-count",
            Some(&landlord),
            None,
        )
        .await?;
    assert_eq!(body["unread_count"], 0);

    Ok(())
}
