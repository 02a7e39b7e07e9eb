//! Notification entity definitions

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// In-app notification created as a side effect of another mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for Notification {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            notification_type: NotificationType::from(
                row.try_get::<String, _>("notification_type")?.as_str(),
            ),
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            read: row.try_get("read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Notification type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    InvitationReceived,
    InvitationAccepted,
    InvitationDeclined,
    AgreementSent,
    AgreementSigned,
    AgreementActive,
    AgreementAmended,
    AgreementTerminated,
    MaintenanceReported,
    MaintenanceCompleted,
    MessageReceived,
    PaymentReminder,
    General,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::InvitationReceived => "invitation_received",
            NotificationType::InvitationAccepted => "invitation_accepted",
            NotificationType::InvitationDeclined => "invitation_declined",
            NotificationType::AgreementSent => "agreement_sent",
            NotificationType::AgreementSigned => "agreement_signed",
            NotificationType::AgreementActive => "agreement_active",
            NotificationType::AgreementAmended => "agreement_amended",
            NotificationType::AgreementTerminated => "agreement_terminated",
            NotificationType::MaintenanceReported => "maintenance_reported",
            NotificationType::MaintenanceCompleted => "maintenance_completed",
            NotificationType::MessageReceived => "message_received",
            NotificationType::PaymentReminder => "payment_reminder",
            NotificationType::General => "general",
        }
    }
}

impl From<&str> for NotificationType {
    fn from(s: &str) -> Self {
        match s {
            "invitation_received" => NotificationType::InvitationReceived,
            "invitation_accepted" => NotificationType::InvitationAccepted,
            "invitation_declined" => NotificationType::InvitationDeclined,
            "agreement_sent" => NotificationType::AgreementSent,
            "agreement_signed" => NotificationType::AgreementSigned,
            "agreement_active" => NotificationType::AgreementActive,
            "agreement_amended" => NotificationType::AgreementAmended,
            "agreement_terminated" => NotificationType::AgreementTerminated,
            "maintenance_reported" => NotificationType::MaintenanceReported,
            "maintenance_completed" => NotificationType::MaintenanceCompleted,
            "message_received" => NotificationType::MessageReceived,
            "payment_reminder" => NotificationType::PaymentReminder,
            _ => NotificationType::General,
        }
    }
}

impl ToString for NotificationType {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
