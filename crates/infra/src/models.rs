use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::EngineError;
use crate::pairing::{
    GuaranteeStatus, JoinMode, Occupant, Pairing, Pairing0, PairingStatus, PaymentMode, Slot,
    SlotPayment, SlotRole, SlotStatus,
};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub status: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub registration_starts_at: Option<DateTime<Utc>>,
    pub registration_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per event+category tournament configuration; `category_id = NULL` is the
/// open category. Carries the one-shot generation marker.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CategoryConfigRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    pub format: String,
    pub split_deadline_hours: Option<i32>,
    pub score_rules: Option<serde_json::Value>,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PairingRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    pub created_by: Uuid,
    pub payment_mode: String,
    pub join_mode: String,
    pub status: String,
    pub is_public_open: bool,
    pub deadline_at: Option<DateTime<Utc>>,
    pub grace_until: Option<DateTime<Utc>>,
    pub guarantee_status: String,
    pub invite_token: Option<Uuid>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub invite_used_at: Option<DateTime<Utc>>,
    pub partner_accepted_at: Option<DateTime<Utc>>,
    pub partner_paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PairingSlotRow {
    pub id: Uuid,
    pub pairing_id: Uuid,
    pub slot_role: String,
    pub slot_status: String,
    pub payment_status: String,
    pub profile_id: Option<Uuid>,
    pub invited_user_id: Option<Uuid>,
    pub invited_contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RegistrationRow {
    pub id: Uuid,
    pub pairing_id: Uuid,
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    pub status: String,
    /// Joined in from the pairing; the lifecycle projection needs it.
    pub payment_mode: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EntryRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    pub user_id: Uuid,
    pub pairing_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HoldRow {
    pub id: Uuid,
    pub pairing_id: Uuid,
    pub event_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StageRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub stage_type: String,
    pub position: i32,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StructureMatchRow {
    pub id: Uuid,
    pub stage_id: Uuid,
    pub group_label: Option<String>,
    pub round: i32,
    pub pairing_a: Option<Uuid>,
    pub pairing_b: Option<Uuid>,
    pub status: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GenerationAuditRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    pub format: String,
    pub seed: i64,
    pub participants: serde_json::Value,
    pub forced: bool,
    pub created_at: DateTime<Utc>,
}

// Text <-> enum mapping for stored pairing state.

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Full => "FULL",
            PaymentMode::Split => "SPLIT",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw {
            "FULL" => Ok(PaymentMode::Full),
            "SPLIT" => Ok(PaymentMode::Split),
            other => Err(EngineError::Invariant(format!("unknown payment mode {other}"))),
        }
    }
}

impl JoinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinMode::InvitePartner => "INVITE_PARTNER",
            JoinMode::LookingForPartner => "LOOKING_FOR_PARTNER",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw {
            "INVITE_PARTNER" => Ok(JoinMode::InvitePartner),
            "LOOKING_FOR_PARTNER" => Ok(JoinMode::LookingForPartner),
            other => Err(EngineError::Invariant(format!("unknown join mode {other}"))),
        }
    }
}

impl PairingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairingStatus::Incomplete => "INCOMPLETE",
            PairingStatus::Confirmed => "CONFIRMED",
            PairingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw {
            "INCOMPLETE" => Ok(PairingStatus::Incomplete),
            "CONFIRMED" => Ok(PairingStatus::Confirmed),
            "CANCELLED" => Ok(PairingStatus::Cancelled),
            other => Err(EngineError::Invariant(format!("unknown pairing status {other}"))),
        }
    }
}

impl GuaranteeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuaranteeStatus::None => "NONE",
            GuaranteeStatus::Armed => "ARMED",
            GuaranteeStatus::Consumed => "CONSUMED",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw {
            "NONE" => Ok(GuaranteeStatus::None),
            "ARMED" => Ok(GuaranteeStatus::Armed),
            "CONSUMED" => Ok(GuaranteeStatus::Consumed),
            other => Err(EngineError::Invariant(format!("unknown guarantee status {other}"))),
        }
    }
}

impl SlotRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotRole::Captain => "CAPTAIN",
            SlotRole::Partner => "PARTNER",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw {
            "CAPTAIN" => Ok(SlotRole::Captain),
            "PARTNER" => Ok(SlotRole::Partner),
            other => Err(EngineError::Invariant(format!("unknown slot role {other}"))),
        }
    }
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Pending => "PENDING",
            SlotStatus::Filled => "FILLED",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw {
            "PENDING" => Ok(SlotStatus::Pending),
            "FILLED" => Ok(SlotStatus::Filled),
            other => Err(EngineError::Invariant(format!("unknown slot status {other}"))),
        }
    }
}

impl SlotPayment {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotPayment::Unpaid => "UNPAID",
            SlotPayment::Paid => "PAID",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw {
            "UNPAID" => Ok(SlotPayment::Unpaid),
            "PAID" => Ok(SlotPayment::Paid),
            other => Err(EngineError::Invariant(format!("unknown payment status {other}"))),
        }
    }
}

impl PairingSlotRow {
    pub fn to_domain(&self) -> Result<Slot, EngineError> {
        let occupant = match (self.profile_id, self.invited_user_id, &self.invited_contact) {
            (Some(profile), _, _) => Occupant::Profile(profile),
            (None, None, None) => Occupant::Empty,
            (None, user, contact) => Occupant::Invited { user, contact: contact.clone() },
        };
        Ok(Slot {
            role: SlotRole::parse(&self.slot_role)?,
            status: SlotStatus::parse(&self.slot_status)?,
            payment: SlotPayment::parse(&self.payment_status)?,
            occupant,
        })
    }

    /// Occupant columns for persisting a domain slot.
    pub fn occupant_columns(slot: &Slot) -> (Option<Uuid>, Option<Uuid>, Option<String>) {
        match &slot.occupant {
            Occupant::Empty => (None, None, None),
            Occupant::Profile(id) => (Some(*id), None, None),
            Occupant::Invited { user, contact } => (None, *user, contact.clone()),
        }
    }
}

impl PairingRow {
    /// Rebuild the domain pairing; fatal if the stored slot set is malformed.
    pub fn to_domain(&self, slots: &[PairingSlotRow]) -> Result<Pairing, EngineError> {
        let scalar = Pairing0 {
            id: self.id,
            event_id: self.event_id,
            category_id: self.category_id,
            created_by: self.created_by,
            payment_mode: PaymentMode::parse(&self.payment_mode)?,
            join_mode: JoinMode::parse(&self.join_mode)?,
            is_public_open: self.is_public_open,
            status: PairingStatus::parse(&self.status)?,
            deadline_at: self.deadline_at,
            grace_until: self.grace_until,
            guarantee: GuaranteeStatus::parse(&self.guarantee_status)?,
            invite_token: self.invite_token,
            invite_expires_at: self.invite_expires_at,
            invite_used_at: self.invite_used_at,
            partner_accepted_at: self.partner_accepted_at,
            partner_paid_at: self.partner_paid_at,
        };
        let slots = slots
            .iter()
            .map(PairingSlotRow::to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Pairing::from_parts(scalar, slots)
    }
}
