//! Request and response payloads for the API routes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use utleie_database::{
    CalendarEvent, ChatMessage, CoLandlordInvitation, FinancialEntry, MaintenanceTask,
    Notification, PaymentReminder, RentalAgreement, RentalUnit, Room, TenantInvitation,
    TenantRating, UnitLandlord, User,
};

// Auth

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: String,
    #[schema(value_type = Object)]
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = Object)]
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChooseRoleRequest {
    pub role: String,
}

// Units

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUnitRequest {
    pub name: String,
    pub address: String,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub monthly_rent_ore: i64,
    pub deposit_ore: Option<i64>,
    pub size_sqm: Option<i64>,
    pub bedrooms: Option<i64>,
    #[serde(default)]
    pub furnished: bool,
    pub letting_kind: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUnitRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub monthly_rent_ore: Option<i64>,
    pub deposit_ore: Option<i64>,
    pub size_sqm: Option<i64>,
    pub bedrooms: Option<i64>,
    pub furnished: Option<bool>,
    pub letting_kind: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoomsRequest {
    #[schema(value_type = Vec<Object>)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnitsResponse {
    #[schema(value_type = Vec<Object>)]
    pub units: Vec<RentalUnit>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnitResponse {
    #[schema(value_type = Object)]
    pub unit: RentalUnit,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LandlordsResponse {
    #[schema(value_type = Vec<Object>)]
    pub landlords: Vec<UnitLandlord>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InviteCoLandlordRequest {
    pub email: String,
    pub ownership_percent: i64,
}

// Invitations

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTenantInvitationRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct InvitationsResponse {
    pub tenant_invitations: Vec<TenantInvitation>,
    pub co_landlord_invitations: Vec<CoLandlordInvitation>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantInvitationResponse {
    #[schema(value_type = Object)]
    pub invitation: TenantInvitation,
    /// The single-use acceptance token; exposed only to the inviter at
    /// creation time so it can be relayed out of band.
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CoLandlordInvitationResponse {
    #[schema(value_type = Object)]
    pub invitation: CoLandlordInvitation,
    /// The single-use acceptance token, exposed only to the inviter.
    pub token: String,
}

// Agreements

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAgreementRequest {
    pub unit_id: String,
    /// Public id of the tenant the agreement is for.
    pub tenant_id: String,
    pub monthly_rent_ore: Option<i64>,
    pub deposit_ore: Option<i64>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub terms: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAgreementRequest {
    pub monthly_rent_ore: Option<i64>,
    pub deposit_ore: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub terms: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AmendAgreementRequest {
    pub monthly_rent_ore: Option<i64>,
    pub terms: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AgreementsResponse {
    #[schema(value_type = Vec<Object>)]
    pub agreements: Vec<RentalAgreement>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AgreementResponse {
    #[schema(value_type = Object)]
    pub agreement: RentalAgreement,
}

// Finances

#[derive(Debug, Deserialize)]
pub struct CreateFinancialEntryRequest {
    pub entry_type: String,
    pub category: String,
    pub amount_ore: i64,
    pub entry_date: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub entries: Vec<FinancialEntry>,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub entry: FinancialEntry,
}

// Maintenance

#[derive(Debug, Deserialize)]
pub struct CreateMaintenanceRequest {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMaintenanceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteMaintenanceRequest {
    pub cost_ore: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<MaintenanceTask>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task: MaintenanceTask,
}

// Messages

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkThreadReadRequest {
    pub unit_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: ChatMessage,
}

// Notifications

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub notification: Notification,
}

// Calendar events

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub unit_id: Option<String>,
    pub starts_at: String,
    pub ends_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event: CalendarEvent,
}

// Payment reminders

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    pub amount_ore: Option<i64>,
    pub due_date: String,
}

#[derive(Debug, Serialize)]
pub struct RemindersResponse {
    pub reminders: Vec<PaymentReminder>,
}

#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    pub reminder: PaymentReminder,
}

// Ratings

#[derive(Debug, Deserialize)]
pub struct CreateRatingRequest {
    pub unit_id: String,
    /// Public id of the rated tenant.
    pub tenant_id: String,
    pub score: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RatingsResponse {
    pub ratings: Vec<TenantRating>,
    pub average_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub rating: TenantRating,
}

// Account lifecycle

#[derive(Debug, Deserialize)]
pub struct LogErrorRequest {
    pub message: String,
    pub context: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub email: String,
}
