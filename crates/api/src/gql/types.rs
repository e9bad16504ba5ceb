use async_graphql::{Enum, InputObject, SimpleObject, ID};
use chrono::{DateTime, Utc};

use infra::pairing as domain;
use infra::registration::{PairingLifecycle, RegistrationStatus};
use infra::score;

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum PaymentMode {
    Full,
    Split,
}

impl From<PaymentMode> for domain::PaymentMode {
    fn from(m: PaymentMode) -> Self {
        match m {
            PaymentMode::Full => domain::PaymentMode::Full,
            PaymentMode::Split => domain::PaymentMode::Split,
        }
    }
}

impl From<domain::PaymentMode> for PaymentMode {
    fn from(m: domain::PaymentMode) -> Self {
        match m {
            domain::PaymentMode::Full => PaymentMode::Full,
            domain::PaymentMode::Split => PaymentMode::Split,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum JoinMode {
    InvitePartner,
    LookingForPartner,
}

impl From<JoinMode> for domain::JoinMode {
    fn from(m: JoinMode) -> Self {
        match m {
            JoinMode::InvitePartner => domain::JoinMode::InvitePartner,
            JoinMode::LookingForPartner => domain::JoinMode::LookingForPartner,
        }
    }
}

impl From<domain::JoinMode> for JoinMode {
    fn from(m: domain::JoinMode) -> Self {
        match m {
            domain::JoinMode::InvitePartner => JoinMode::InvitePartner,
            domain::JoinMode::LookingForPartner => JoinMode::LookingForPartner,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum PairingStatus {
    Incomplete,
    Confirmed,
    Cancelled,
}

impl From<domain::PairingStatus> for PairingStatus {
    fn from(s: domain::PairingStatus) -> Self {
        match s {
            domain::PairingStatus::Incomplete => PairingStatus::Incomplete,
            domain::PairingStatus::Confirmed => PairingStatus::Confirmed,
            domain::PairingStatus::Cancelled => PairingStatus::Cancelled,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GuaranteeStatus {
    None,
    Armed,
    Consumed,
}

impl From<domain::GuaranteeStatus> for GuaranteeStatus {
    fn from(s: domain::GuaranteeStatus) -> Self {
        match s {
            domain::GuaranteeStatus::None => GuaranteeStatus::None,
            domain::GuaranteeStatus::Armed => GuaranteeStatus::Armed,
            domain::GuaranteeStatus::Consumed => GuaranteeStatus::Consumed,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum SlotRole {
    Captain,
    Partner,
}

impl From<SlotRole> for domain::SlotRole {
    fn from(r: SlotRole) -> Self {
        match r {
            SlotRole::Captain => domain::SlotRole::Captain,
            SlotRole::Partner => domain::SlotRole::Partner,
        }
    }
}

impl From<domain::SlotRole> for SlotRole {
    fn from(r: domain::SlotRole) -> Self {
        match r {
            domain::SlotRole::Captain => SlotRole::Captain,
            domain::SlotRole::Partner => SlotRole::Partner,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum RegistrationStatusGql {
    PendingPartner,
    PendingPayment,
    Matchmaking,
    Confirmed,
    Cancelled,
    Expired,
}

impl From<RegistrationStatus> for RegistrationStatusGql {
    fn from(s: RegistrationStatus) -> Self {
        match s {
            RegistrationStatus::PendingPartner => RegistrationStatusGql::PendingPartner,
            RegistrationStatus::PendingPayment => RegistrationStatusGql::PendingPayment,
            RegistrationStatus::Matchmaking => RegistrationStatusGql::Matchmaking,
            RegistrationStatus::Confirmed => RegistrationStatusGql::Confirmed,
            RegistrationStatus::Cancelled => RegistrationStatusGql::Cancelled,
            RegistrationStatus::Expired => RegistrationStatusGql::Expired,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum Lifecycle {
    PendingOnePaid,
    PendingPartnerPayment,
    ConfirmedBothPaid,
    ConfirmedCaptainFull,
    CancelledIncomplete,
}

impl From<PairingLifecycle> for Lifecycle {
    fn from(l: PairingLifecycle) -> Self {
        match l {
            PairingLifecycle::PendingOnePaid => Lifecycle::PendingOnePaid,
            PairingLifecycle::PendingPartnerPayment => Lifecycle::PendingPartnerPayment,
            PairingLifecycle::ConfirmedBothPaid => Lifecycle::ConfirmedBothPaid,
            PairingLifecycle::ConfirmedCaptainFull => Lifecycle::ConfirmedCaptainFull,
            PairingLifecycle::CancelledIncomplete => Lifecycle::CancelledIncomplete,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum ResultType {
    Normal,
    Walkover,
    Retirement,
    Injury,
}

impl From<ResultType> for score::ResultType {
    fn from(r: ResultType) -> Self {
        match r {
            ResultType::Normal => score::ResultType::Normal,
            ResultType::Walkover => score::ResultType::Walkover,
            ResultType::Retirement => score::ResultType::Retirement,
            ResultType::Injury => score::ResultType::Injury,
        }
    }
}

impl From<score::ResultType> for ResultType {
    fn from(r: score::ResultType) -> Self {
        match r {
            score::ResultType::Normal => ResultType::Normal,
            score::ResultType::Walkover => ResultType::Walkover,
            score::ResultType::Retirement => ResultType::Retirement,
            score::ResultType::Injury => ResultType::Injury,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum Side {
    A,
    B,
}

impl From<Side> for score::Side {
    fn from(s: Side) -> Self {
        match s {
            Side::A => score::Side::A,
            Side::B => score::Side::B,
        }
    }
}

impl From<score::Side> for Side {
    fn from(s: score::Side) -> Self {
        match s {
            score::Side::A => Side::A,
            score::Side::B => Side::B,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct PairingSlot {
    pub role: SlotRole,
    pub filled: bool,
    pub paid: bool,
    pub profile_id: Option<ID>,
    pub invited_contact: Option<String>,
}

impl From<&domain::Slot> for PairingSlot {
    fn from(slot: &domain::Slot) -> Self {
        let invited_contact = match &slot.occupant {
            domain::Occupant::Invited { contact, .. } => contact.clone(),
            _ => None,
        };
        Self {
            role: slot.role.into(),
            filled: slot.status == domain::SlotStatus::Filled,
            paid: slot.payment == domain::SlotPayment::Paid,
            profile_id: slot.occupant.profile_id().map(Into::into),
            invited_contact,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct Pairing {
    pub id: ID,
    pub event_id: ID,
    pub category_id: Option<ID>,
    pub created_by: ID,
    pub payment_mode: PaymentMode,
    pub join_mode: JoinMode,
    pub status: PairingStatus,
    pub is_public_open: bool,
    pub deadline_at: Option<DateTime<Utc>>,
    pub guarantee: GuaranteeStatus,
    pub invite_token: Option<ID>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub slots: Vec<PairingSlot>,
    pub registration_status: RegistrationStatusGql,
    pub lifecycle: Lifecycle,
}

impl From<&domain::Pairing> for Pairing {
    fn from(p: &domain::Pairing) -> Self {
        let status = infra::registration::derive_status(p);
        Self {
            id: p.id.into(),
            event_id: p.event_id.into(),
            category_id: p.category_id.map(Into::into),
            created_by: p.created_by.into(),
            payment_mode: p.payment_mode.into(),
            join_mode: p.join_mode.into(),
            status: p.status.into(),
            is_public_open: p.is_public_open,
            deadline_at: p.deadline_at,
            guarantee: p.guarantee.into(),
            invite_token: p.invite_token.map(Into::into),
            invite_expires_at: p.invite_expires_at,
            slots: p.slots().iter().map(Into::into).collect(),
            registration_status: status.into(),
            lifecycle: infra::registration::lifecycle(status, p.payment_mode).into(),
        }
    }
}

/// Discovery listing of pairings still looking for a partner.
#[derive(SimpleObject, Clone)]
pub struct OpenPairing {
    pub id: ID,
    pub event_id: ID,
    pub category_id: Option<ID>,
    pub created_by: ID,
    pub payment_mode: PaymentMode,
    pub deadline_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(SimpleObject, Clone)]
pub struct Registration {
    pub pairing_id: ID,
    pub event_id: ID,
    pub category_id: Option<ID>,
    pub status: RegistrationStatusGql,
    pub lifecycle: Lifecycle,
    pub updated_at: DateTime<Utc>,
}

#[derive(SimpleObject, Clone)]
pub struct Entry {
    pub id: ID,
    pub event_id: ID,
    pub category_id: Option<ID>,
    pub user_id: ID,
    pub pairing_id: ID,
}

#[derive(InputObject, Clone, Copy)]
pub struct SetScoreInput {
    pub team_a: u32,
    pub team_b: u32,
}

impl From<SetScoreInput> for score::SetScore {
    fn from(s: SetScoreInput) -> Self {
        score::SetScore { team_a: s.team_a, team_b: s.team_b }
    }
}

#[derive(SimpleObject, Clone)]
pub struct SetScoreView {
    pub team_a: u32,
    pub team_b: u32,
}

#[derive(SimpleObject, Clone)]
pub struct MatchStats {
    pub sets: Vec<SetScoreView>,
    pub a_sets: u32,
    pub b_sets: u32,
    pub a_games: u32,
    pub b_games: u32,
    pub winner: Side,
    pub result_type: ResultType,
}

impl From<score::MatchStats> for MatchStats {
    fn from(s: score::MatchStats) -> Self {
        Self {
            sets: s
                .sets
                .iter()
                .map(|set| SetScoreView { team_a: set.team_a, team_b: set.team_b })
                .collect(),
            a_sets: s.a_sets,
            b_sets: s.b_sets,
            a_games: s.a_games,
            b_games: s.b_games,
            winner: s.winner.into(),
            result_type: s.result_type.into(),
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct StructureMatch {
    pub id: ID,
    pub group_label: Option<String>,
    pub round: i32,
    pub pairing_a: Option<ID>,
    pub pairing_b: Option<ID>,
    pub status: String,
}

#[derive(SimpleObject, Clone)]
pub struct Stage {
    pub id: ID,
    pub name: String,
    pub stage_type: String,
    pub position: i32,
    pub matches: Vec<StructureMatch>,
}

#[derive(SimpleObject, Clone)]
pub struct GenerationAudit {
    pub format: String,
    pub seed: String,
    pub participants: i32,
    pub forced: bool,
    pub created_at: DateTime<Utc>,
}
