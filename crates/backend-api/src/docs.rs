use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::auth::update_me,
        crate::routes::auth::choose_role,
        crate::routes::units::list_units,
        crate::routes::units::create_unit,
        crate::routes::units::get_unit,
        crate::routes::units::update_unit,
        crate::routes::units::delete_unit,
        crate::routes::units::update_rooms,
        crate::routes::units::list_landlords,
        crate::routes::units::invite_co_landlord,
        crate::routes::invitations::create_tenant_invitation,
        crate::routes::agreements::list_agreements,
        crate::routes::agreements::create_agreement,
        crate::routes::agreements::get_agreement,
        crate::routes::agreements::update_agreement,
        crate::routes::agreements::send_agreement,
        crate::routes::agreements::sign_agreement,
        crate::routes::agreements::amend_agreement,
        crate::routes::agreements::terminate_agreement
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HealthResponse,
            crate::routes::models::RegisterRequest,
            crate::routes::models::LoginRequest,
            crate::routes::models::SessionResponse,
            crate::routes::models::UserResponse,
            crate::routes::models::UpdateProfileRequest,
            crate::routes::models::ChooseRoleRequest,
            crate::routes::models::CreateUnitRequest,
            crate::routes::models::UpdateUnitRequest,
            crate::routes::models::UpdateRoomsRequest,
            crate::routes::models::UnitsResponse,
            crate::routes::models::UnitResponse,
            crate::routes::models::LandlordsResponse,
            crate::routes::models::InviteCoLandlordRequest,
            crate::routes::models::CoLandlordInvitationResponse,
            crate::routes::models::CreateTenantInvitationRequest,
            crate::routes::models::TenantInvitationResponse,
            crate::routes::models::CreateAgreementRequest,
            crate::routes::models::UpdateAgreementRequest,
            crate::routes::models::AmendAgreementRequest,
            crate::routes::models::AgreementsResponse,
            crate::routes::models::AgreementResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Authentication, profile and role selection"),
        (name = "Units", description = "Rental unit management"),
        (name = "Invitations", description = "Tenant and co-landlord invitations"),
        (name = "Agreements", description = "Lease agreements and signatures")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("Bearer".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
