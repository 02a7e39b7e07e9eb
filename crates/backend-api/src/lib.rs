mod docs;
mod error;
mod state;
mod util;

pub mod routes;
pub mod services;

pub use error::ApiError;
pub use state::AppState;

use axum::{
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .route("/health", get(routes::health::health_check))
        // Auth and profile
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/me", put(routes::auth::update_me))
        .route("/api/auth/role", post(routes::auth::choose_role))
        // Rental units
        .route("/api/units", get(routes::units::list_units))
        .route("/api/units", post(routes::units::create_unit))
        .route("/api/units/:unit_id", get(routes::units::get_unit))
        .route("/api/units/:unit_id", put(routes::units::update_unit))
        .route("/api/units/:unit_id", delete(routes::units::delete_unit))
        .route("/api/units/:unit_id/rooms", put(routes::units::update_rooms))
        .route(
            "/api/units/:unit_id/landlords",
            get(routes::units::list_landlords),
        )
        .route(
            "/api/units/:unit_id/co-landlords",
            post(routes::units::invite_co_landlord),
        )
        // Invitations
        .route(
            "/api/units/:unit_id/invitations",
            post(routes::invitations::create_tenant_invitation),
        )
        .route(
            "/api/invitations",
            get(routes::invitations::list_my_invitations),
        )
        .route(
            "/api/invitations/:token/accept",
            post(routes::invitations::accept_invitation),
        )
        .route(
            "/api/invitations/:token/decline",
            post(routes::invitations::decline_invitation),
        )
        .route(
            "/api/invitations/:token",
            delete(routes::invitations::cancel_invitation),
        )
        .route(
            "/api/co-landlord-invitations/:token/accept",
            post(routes::invitations::accept_co_landlord_invitation),
        )
        .route(
            "/api/co-landlord-invitations/:token/decline",
            post(routes::invitations::decline_co_landlord_invitation),
        )
        // Agreements
        .route("/api/agreements", get(routes::agreements::list_agreements))
        .route("/api/agreements", post(routes::agreements::create_agreement))
        .route(
            "/api/agreements/:agreement_id",
            get(routes::agreements::get_agreement),
        )
        .route(
            "/api/agreements/:agreement_id",
            put(routes::agreements::update_agreement),
        )
        .route(
            "/api/agreements/:agreement_id/send",
            post(routes::agreements::send_agreement),
        )
        .route(
            "/api/agreements/:agreement_id/sign",
            post(routes::agreements::sign_agreement),
        )
        .route(
            "/api/agreements/:agreement_id/amend",
            post(routes::agreements::amend_agreement),
        )
        .route(
            "/api/agreements/:agreement_id/terminate",
            post(routes::agreements::terminate_agreement),
        )
        // Bookkeeping and reports
        .route(
            "/api/units/:unit_id/finances",
            get(routes::finances::list_entries),
        )
        .route(
            "/api/units/:unit_id/finances",
            post(routes::finances::create_entry),
        )
        .route(
            "/api/finances/:entry_id",
            delete(routes::finances::delete_entry),
        )
        .route("/api/reports/summary", get(routes::finances::report_summary))
        .route("/api/reports/tax", get(routes::finances::report_tax))
        // Maintenance
        .route(
            "/api/units/:unit_id/maintenance",
            get(routes::maintenance::list_tasks),
        )
        .route(
            "/api/units/:unit_id/maintenance",
            post(routes::maintenance::create_task),
        )
        .route(
            "/api/maintenance/:task_id",
            get(routes::maintenance::get_task),
        )
        .route(
            "/api/maintenance/:task_id",
            put(routes::maintenance::update_task),
        )
        .route(
            "/api/maintenance/:task_id/complete",
            post(routes::maintenance::complete_task),
        )
        .route(
            "/api/maintenance/:task_id/reopen",
            post(routes::maintenance::reopen_task),
        )
        // Messaging
        .route(
            "/api/units/:unit_id/messages",
            get(routes::messages::list_messages),
        )
        .route(
            "/api/units/:unit_id/messages",
            post(routes::messages::send_message),
        )
        .route("/api/messages/read", post(routes::messages::mark_thread_read))
        // Notifications
        .route(
            "/api/notifications",
            get(routes::notifications::get_notifications),
        )
        .route(
            "/api/notifications/unread-count",
            get(routes::notifications::get_unread_count),
        )
        .route(
            "/api/notifications/:notification_id/read",
            post(routes::notifications::mark_notification_read),
        )
        .route(
            "/api/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        // Calendar
        .route("/api/events", get(routes::events::list_events))
        .route("/api/events", post(routes::events::create_event))
        .route("/api/events/:event_id", delete(routes::events::delete_event))
        // Payment reminders
        .route(
            "/api/units/:unit_id/reminders",
            get(routes::reminders::list_reminders),
        )
        .route(
            "/api/units/:unit_id/reminders",
            post(routes::reminders::create_reminder),
        )
        .route(
            "/api/reminders/:reminder_id/send",
            post(routes::reminders::send_reminder),
        )
        .route(
            "/api/reminders/:reminder_id/paid",
            post(routes::reminders::mark_reminder_paid),
        )
        // Tenant ratings
        .route("/api/ratings", post(routes::ratings::create_rating))
        .route(
            "/api/ratings/tenant/:tenant_id",
            get(routes::ratings::list_tenant_ratings),
        )
        // Account lifecycle
        .route("/api/errors", post(routes::account::log_error))
        .route("/api/account", delete(routes::account::delete_account))
        .route("/api/admin/purge", post(routes::account::admin_purge))
        .with_state(state)
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
