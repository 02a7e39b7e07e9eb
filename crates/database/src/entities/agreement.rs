//! Rental agreement entity and its signature workflow.
//!
//! An agreement moves `draft -> pending_tenant -> active -> terminated`.
//! Both parties must sign while the agreement is `pending_tenant`; an
//! amendment of an active agreement clears both signatures and sends it
//! back for re-signing. Transitions are pure so route handlers only
//! persist the outcome.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentalAgreement {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub unit_id: i64,
    pub landlord_id: i64,
    pub tenant_id: i64,
    pub status: AgreementStatus,
    pub landlord_signed: bool,
    pub tenant_signed: bool,
    pub landlord_signed_at: Option<String>,
    pub tenant_signed_at: Option<String>,
    pub monthly_rent_ore: i64,
    pub deposit_ore: i64,
    pub start_date: String,
    pub end_date: Option<String>,
    pub terms: String,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for RentalAgreement {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            unit_id: row.try_get("unit_id")?,
            landlord_id: row.try_get("landlord_id")?,
            tenant_id: row.try_get("tenant_id")?,
            status: AgreementStatus::from(row.try_get::<String, _>("status")?.as_str()),
            landlord_signed: row.try_get("landlord_signed")?,
            tenant_signed: row.try_get("tenant_signed")?,
            landlord_signed_at: row.try_get("landlord_signed_at")?,
            tenant_signed_at: row.try_get("tenant_signed_at")?,
            monthly_rent_ore: row.try_get("monthly_rent_ore")?,
            deposit_ore: row.try_get("deposit_ore")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            terms: row.try_get("terms")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Agreement status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Draft,
    PendingTenant,
    Active,
    Terminated,
}

impl AgreementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementStatus::Draft => "draft",
            AgreementStatus::PendingTenant => "pending_tenant",
            AgreementStatus::Active => "active",
            AgreementStatus::Terminated => "terminated",
        }
    }
}

impl From<&str> for AgreementStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending_tenant" => AgreementStatus::PendingTenant,
            "active" => AgreementStatus::Active,
            "terminated" => AgreementStatus::Terminated,
            _ => AgreementStatus::Draft,
        }
    }
}

impl ToString for AgreementStatus {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

/// The party performing a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerParty {
    Landlord,
    Tenant,
}

/// Rejected agreement transitions. All map to HTTP 409 at the API layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("agreement can only be sent while in draft")]
    NotDraft,

    #[error("agreement is not awaiting signatures")]
    NotAwaitingSignatures,

    #[error("party has already signed this agreement")]
    AlreadySigned,

    #[error("only an active agreement can be amended")]
    NotActive,

    #[error("agreement is already terminated")]
    AlreadyTerminated,

    #[error("agreement cannot be edited after it has been sent")]
    NotEditable,
}

impl RentalAgreement {
    /// Send a draft to the tenant for signing.
    pub fn send(&mut self) -> Result<(), TransitionError> {
        match self.status {
            AgreementStatus::Draft => {
                self.status = AgreementStatus::PendingTenant;
                Ok(())
            }
            _ => Err(TransitionError::NotDraft),
        }
    }

    /// Record a signature from one party.
    ///
    /// Returns `true` when this was the second signature and the agreement
    /// became active. Signing twice is a conflict, not a no-op, so clients
    /// surface the double submission.
    pub fn sign(&mut self, party: SignerParty, now: &str) -> Result<bool, TransitionError> {
        if self.status != AgreementStatus::PendingTenant {
            return Err(TransitionError::NotAwaitingSignatures);
        }

        match party {
            SignerParty::Landlord => {
                if self.landlord_signed {
                    return Err(TransitionError::AlreadySigned);
                }
                self.landlord_signed = true;
                self.landlord_signed_at = Some(now.to_string());
            }
            SignerParty::Tenant => {
                if self.tenant_signed {
                    return Err(TransitionError::AlreadySigned);
                }
                self.tenant_signed = true;
                self.tenant_signed_at = Some(now.to_string());
            }
        }

        if self.landlord_signed && self.tenant_signed {
            self.status = AgreementStatus::Active;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Amend an active agreement: both signatures are void and the
    /// agreement returns to the tenant for re-signing.
    pub fn amend(&mut self) -> Result<(), TransitionError> {
        match self.status {
            AgreementStatus::Active => {
                self.status = AgreementStatus::PendingTenant;
                self.landlord_signed = false;
                self.tenant_signed = false;
                self.landlord_signed_at = None;
                self.tenant_signed_at = None;
                Ok(())
            }
            _ => Err(TransitionError::NotActive),
        }
    }

    /// Terminate a pending or active agreement. Terminated is final.
    pub fn terminate(&mut self) -> Result<(), TransitionError> {
        match self.status {
            AgreementStatus::Terminated => Err(TransitionError::AlreadyTerminated),
            _ => {
                self.status = AgreementStatus::Terminated;
                Ok(())
            }
        }
    }

    /// Whether the landlord may still edit terms and rent.
    pub fn editable(&self) -> bool {
        self.status == AgreementStatus::Draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RentalAgreement {
        RentalAgreement {
            id: 1,
            public_id: "agr1".to_string(),
            unit_id: 1,
            landlord_id: 10,
            tenant_id: 20,
            status: AgreementStatus::Draft,
            landlord_signed: false,
            tenant_signed: false,
            landlord_signed_at: None,
            tenant_signed_at: None,
            monthly_rent_ore: 1_200_000,
            deposit_ore: 3_600_000,
            start_date: "2026-09-01".to_string(),
            end_date: None,
            terms: "Standard leieavtale".to_string(),
            created_at: "2026-08-01T00:00:00Z".to_string(),
            updated_at: "2026-08-01T00:00:00Z".to_string(),
        }
    }

    const NOW: &str = "2026-08-02T12:00:00Z";

    #[test]
    fn full_signing_flow_activates_agreement() {
        let mut agreement = draft();
        agreement.send().unwrap();
        assert_eq!(agreement.status, AgreementStatus::PendingTenant);

        assert!(!agreement.sign(SignerParty::Tenant, NOW).unwrap());
        assert_eq!(agreement.status, AgreementStatus::PendingTenant);
        assert!(agreement.tenant_signed);
        assert_eq!(agreement.tenant_signed_at.as_deref(), Some(NOW));

        assert!(agreement.sign(SignerParty::Landlord, NOW).unwrap());
        assert_eq!(agreement.status, AgreementStatus::Active);
    }

    #[test]
    fn signatures_complete_in_either_order() {
        let mut agreement = draft();
        agreement.send().unwrap();
        assert!(!agreement.sign(SignerParty::Landlord, NOW).unwrap());
        assert!(agreement.sign(SignerParty::Tenant, NOW).unwrap());
        assert_eq!(agreement.status, AgreementStatus::Active);
    }

    #[test]
    fn cannot_sign_a_draft() {
        let mut agreement = draft();
        assert_eq!(
            agreement.sign(SignerParty::Tenant, NOW),
            Err(TransitionError::NotAwaitingSignatures)
        );
    }

    #[test]
    fn double_signature_is_a_conflict() {
        let mut agreement = draft();
        agreement.send().unwrap();
        agreement.sign(SignerParty::Tenant, NOW).unwrap();
        assert_eq!(
            agreement.sign(SignerParty::Tenant, NOW),
            Err(TransitionError::AlreadySigned)
        );
    }

    #[test]
    fn send_is_only_valid_from_draft() {
        let mut agreement = draft();
        agreement.send().unwrap();
        assert_eq!(agreement.send(), Err(TransitionError::NotDraft));
    }

    #[test]
    fn amend_resets_both_signatures() {
        let mut agreement = draft();
        agreement.send().unwrap();
        agreement.sign(SignerParty::Tenant, NOW).unwrap();
        agreement.sign(SignerParty::Landlord, NOW).unwrap();

        agreement.amend().unwrap();
        assert_eq!(agreement.status, AgreementStatus::PendingTenant);
        assert!(!agreement.landlord_signed);
        assert!(!agreement.tenant_signed);
        assert!(agreement.landlord_signed_at.is_none());
        assert!(agreement.tenant_signed_at.is_none());
    }

    #[test]
    fn amend_requires_active_status() {
        let mut agreement = draft();
        assert_eq!(agreement.amend(), Err(TransitionError::NotActive));
        agreement.send().unwrap();
        assert_eq!(agreement.amend(), Err(TransitionError::NotActive));
    }

    #[test]
    fn amended_agreement_requires_both_signatures_again() {
        let mut agreement = draft();
        agreement.send().unwrap();
        agreement.sign(SignerParty::Tenant, NOW).unwrap();
        agreement.sign(SignerParty::Landlord, NOW).unwrap();
        agreement.amend().unwrap();

        assert!(!agreement.sign(SignerParty::Landlord, NOW).unwrap());
        assert!(agreement.sign(SignerParty::Tenant, NOW).unwrap());
        assert_eq!(agreement.status, AgreementStatus::Active);
    }

    #[test]
    fn terminated_is_final() {
        let mut agreement = draft();
        agreement.send().unwrap();
        agreement.terminate().unwrap();
        assert_eq!(agreement.status, AgreementStatus::Terminated);

        assert_eq!(agreement.terminate(), Err(TransitionError::AlreadyTerminated));
        assert_eq!(agreement.send(), Err(TransitionError::NotDraft));
        assert_eq!(
            agreement.sign(SignerParty::Tenant, NOW),
            Err(TransitionError::NotAwaitingSignatures)
        );
        assert_eq!(agreement.amend(), Err(TransitionError::NotActive));
    }

    #[test]
    fn draft_is_editable_until_sent() {
        let mut agreement = draft();
        assert!(agreement.editable());
        agreement.send().unwrap();
        assert!(!agreement.editable());
    }
}
