//! Invitation helpers shared by the auth and invitation routes.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::warn;
use utleie_database::{NotificationRepository, NotificationType, User};
use utleie_mailer::OutboundEmail;

use crate::util::format_kroner;

/// Surface pending invitations to a user who just registered or logged in.
///
/// Stale invitations addressed to the account email are flipped to
/// `expired`; fresh ones produce an in-app notification so the user finds
/// them on first visit. Best-effort: failures are logged, the login still
/// succeeds.
pub async fn process_pending_invitations(
    pool: &SqlitePool,
    notifications: &NotificationRepository,
    user: &User,
) {
    let Some(email) = user.email.as_deref() else {
        return;
    };
    let now = Utc::now().to_rfc3339();

    for table in ["tenant_invitations", "co_landlord_invitations"] {
        let expire_sql = format!(
            "UPDATE {table} SET status = 'expired', updated_at = ? WHERE email = ? AND status = 'pending' AND expires_at <= ?"
        );
        if let Err(error) = sqlx::query(&expire_sql)
            .bind(&now)
            .bind(email)
            .bind(&now)
            .execute(pool)
            .await
        {
            warn!(table, %error, "failed to expire stale invitations");
        }
    }

    let pending = sqlx::query(
        r#"
        SELECT u.name AS unit_name, 'tenant' AS kind
        FROM tenant_invitations i
        JOIN rental_units u ON u.id = i.unit_id
        WHERE i.email = ? AND i.status = 'pending' AND i.expires_at > ?
        UNION ALL
        SELECT u.name AS unit_name, 'co_landlord' AS kind
        FROM co_landlord_invitations i
        JOIN rental_units u ON u.id = i.unit_id
        WHERE i.email = ? AND i.status = 'pending' AND i.expires_at > ?
        "#,
    )
    .bind(email)
    .bind(&now)
    .bind(email)
    .bind(&now)
    .fetch_all(pool)
    .await;

    let rows = match pending {
        Ok(rows) => rows,
        Err(error) => {
            warn!(%error, "failed to look up pending invitations");
            return;
        }
    };

    for row in rows {
        let unit_name: String = row.try_get("unit_name").unwrap_or_default();
        let kind: String = row.try_get("kind").unwrap_or_default();
        let (title, body) = if kind == "co_landlord" {
            (
                "Du er invitert som medutleier".to_string(),
                format!("Du har en ventende medutleier-invitasjon til {unit_name}."),
            )
        } else {
            (
                "Du har en ventende invitasjon".to_string(),
                format!("Du er invitert som leietaker til {unit_name}."),
            )
        };
        notifications
            .notify(user.id, NotificationType::InvitationReceived, &title, &body)
            .await;
    }
}

/// Invitation email sent to a prospective tenant.
pub fn tenant_invitation_email(
    to: &str,
    unit_name: &str,
    monthly_rent_ore: i64,
    token: &str,
) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Invitasjon til leieforhold: {unit_name}"),
        html: format!(
            "<p>Du er invitert som leietaker til <strong>{unit_name}</strong> \
             (månedsleie {rent}).</p>\
             <p>Logg inn på Enkel Utleie og bruk koden <code>{token}</code> \
             for å svare. Invitasjonen gjelder i sju dager.</p>",
            rent = format_kroner(monthly_rent_ore),
        ),
    }
}

/// Invitation email sent to a prospective co-landlord.
pub fn co_landlord_invitation_email(
    to: &str,
    unit_name: &str,
    ownership_percent: i64,
    token: &str,
) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Invitasjon som medutleier: {unit_name}"),
        html: format!(
            "<p>Du er invitert som medutleier til <strong>{unit_name}</strong> \
             med en eierandel på {ownership_percent}&nbsp;%.</p>\
             <p>Logg inn på Enkel Utleie og bruk koden <code>{token}</code> \
             for å svare. Invitasjonen gjelder i sju dager.</p>",
        ),
    }
}

/// Payment reminder email sent to a tenant.
pub fn payment_reminder_email(
    to: &str,
    unit_name: &str,
    amount_ore: i64,
    due_date: &str,
) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Betalingspåminnelse for {unit_name}"),
        html: format!(
            "<p>Dette er en påminnelse om utestående husleie for \
             <strong>{unit_name}</strong>: {amount} med forfall {due_date}.</p>",
            amount = format_kroner(amount_ore),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_invitation_email_includes_token_and_rent() {
        let email = tenant_invitation_email("kari@example.com", "Storgata 1", 1_200_000, "tok123");
        assert_eq!(email.to, "kari@example.com");
        assert!(email.subject.contains("Storgata 1"));
        assert!(email.html.contains("tok123"));
        assert!(email.html.contains("12000,00 kr"));
    }

    #[test]
    fn co_landlord_email_includes_percent() {
        let email = co_landlord_invitation_email("ola@example.com", "Storgata 1", 40, "tok456");
        assert!(email.html.contains("40"));
        assert!(email.html.contains("tok456"));
    }
}
