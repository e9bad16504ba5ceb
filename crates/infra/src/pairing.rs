//! The doubles-pairing state machine.
//!
//! All transitions here are pure: they mutate an in-memory [`Pairing`] loaded
//! under a row lock and return typed failures, leaving persistence and side
//! effects to the transactional shell in the `api` crate. Time is always an
//! explicit parameter so deadline expiry is deterministic under test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::deadlines;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Full,
    Split,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinMode {
    InvitePartner,
    LookingForPartner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingStatus {
    Incomplete,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotRole {
    Captain,
    Partner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Pending,
    Filled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotPayment {
    Unpaid,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuaranteeStatus {
    None,
    Armed,
    Consumed,
}

/// Who sits in a slot. Replaces the original schema's trio of nullable
/// columns (profile id / invited user id / invited contact) with one tagged
/// union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupant {
    Empty,
    Profile(Uuid),
    Invited {
        user: Option<Uuid>,
        contact: Option<String>,
    },
}

impl Occupant {
    pub fn profile_id(&self) -> Option<Uuid> {
        match self {
            Occupant::Profile(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub role: SlotRole,
    pub status: SlotStatus,
    pub payment: SlotPayment,
    pub occupant: Occupant,
}

/// Who is asking for a mutation. Staff membership is established upstream
/// (identity is an external collaborator).
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub staff: bool,
}

/// One doubles team attempt for one event and category. Owns exactly two
/// slots: captain first, partner second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub id: Uuid,
    pub event_id: Uuid,
    /// `None` means the open (uncategorized) draw.
    pub category_id: Option<Uuid>,
    pub created_by: Uuid,
    pub payment_mode: PaymentMode,
    pub join_mode: JoinMode,
    pub is_public_open: bool,
    pub status: PairingStatus,
    pub deadline_at: Option<DateTime<Utc>>,
    pub grace_until: Option<DateTime<Utc>>,
    pub guarantee: GuaranteeStatus,
    pub invite_token: Option<Uuid>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub invite_used_at: Option<DateTime<Utc>>,
    pub partner_accepted_at: Option<DateTime<Utc>>,
    pub partner_paid_at: Option<DateTime<Utc>>,
    slots: [Slot; 2],
}

/// Inputs for creating a pairing; everything the captain's request carries
/// plus the event/category configuration the shell already loaded.
#[derive(Debug, Clone)]
pub struct NewPairing {
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    pub creator: Uuid,
    pub payment_mode: PaymentMode,
    pub join_mode: JoinMode,
    /// Captain's share already captured (e.g. paid at checkout before the
    /// pairing is created).
    pub captain_paid: bool,
    pub invited_user: Option<Uuid>,
    pub invited_contact: Option<String>,
    pub event_start: Option<DateTime<Utc>>,
    pub deadline_hours: Option<i64>,
    pub invite_expiry_minutes: Option<i64>,
}

impl Pairing {
    /// Create a pairing with its two slots. The captain slot is filled by the
    /// creator; the partner slot is pending (pre-marked paid under FULL mode
    /// once the captain has paid, since one payment covers both seats).
    pub fn create(input: NewPairing, now: DateTime<Utc>) -> Result<Self, EngineError> {
        if input.invited_user == Some(input.creator) {
            return Err(EngineError::Invalid("captain cannot invite themselves".into()));
        }

        let deadline_at = match input.payment_mode {
            PaymentMode::Split => Some(deadlines::compute_split_deadline(
                now,
                input.event_start,
                input.deadline_hours,
            )?),
            PaymentMode::Full => None,
        };

        let (invite_token, invite_expires_at) = match input.join_mode {
            JoinMode::InvitePartner => (
                Some(Uuid::new_v4()),
                Some(deadlines::compute_partner_link_expiry(
                    now,
                    input.invite_expiry_minutes,
                )),
            ),
            JoinMode::LookingForPartner => (None, None),
        };

        let captain_payment = if input.captain_paid { SlotPayment::Paid } else { SlotPayment::Unpaid };
        let partner_payment = if input.payment_mode == PaymentMode::Full && input.captain_paid {
            SlotPayment::Paid
        } else {
            SlotPayment::Unpaid
        };
        let partner_occupant = match input.join_mode {
            JoinMode::InvitePartner => Occupant::Invited {
                user: input.invited_user,
                contact: input.invited_contact,
            },
            JoinMode::LookingForPartner => Occupant::Empty,
        };

        let mut pairing = Pairing {
            id: Uuid::new_v4(),
            event_id: input.event_id,
            category_id: input.category_id,
            created_by: input.creator,
            payment_mode: input.payment_mode,
            join_mode: input.join_mode,
            is_public_open: input.join_mode == JoinMode::LookingForPartner,
            status: PairingStatus::Incomplete,
            deadline_at,
            grace_until: None,
            guarantee: match input.payment_mode {
                PaymentMode::Split => GuaranteeStatus::Armed,
                PaymentMode::Full => GuaranteeStatus::None,
            },
            invite_token,
            invite_expires_at,
            invite_used_at: None,
            partner_accepted_at: None,
            partner_paid_at: None,
            slots: [
                Slot {
                    role: SlotRole::Captain,
                    status: SlotStatus::Filled,
                    payment: captain_payment,
                    occupant: Occupant::Profile(input.creator),
                },
                Slot {
                    role: SlotRole::Partner,
                    status: SlotStatus::Pending,
                    payment: partner_payment,
                    occupant: partner_occupant,
                },
            ],
        };
        pairing.refresh_status();
        Ok(pairing)
    }

    /// Rebuild from persisted slots. Fatal when the slot set does not hold
    /// exactly one captain and one partner.
    pub fn from_parts(pairing: Pairing0, slots: Vec<Slot>) -> Result<Self, EngineError> {
        let mut captain = None;
        let mut partner = None;
        let count = slots.len();
        for slot in slots {
            match slot.role {
                SlotRole::Captain if captain.is_none() => captain = Some(slot),
                SlotRole::Partner if partner.is_none() => partner = Some(slot),
                _ => {
                    return Err(EngineError::Invariant(format!(
                        "pairing {} has a malformed slot set",
                        pairing.id
                    )))
                }
            }
        }
        let (Some(captain), Some(partner)) = (captain, partner) else {
            return Err(EngineError::Invariant(format!(
                "pairing {} has {count} slots, expected captain + partner",
                pairing.id
            )));
        };
        Ok(Pairing {
            id: pairing.id,
            event_id: pairing.event_id,
            category_id: pairing.category_id,
            created_by: pairing.created_by,
            payment_mode: pairing.payment_mode,
            join_mode: pairing.join_mode,
            is_public_open: pairing.is_public_open,
            status: pairing.status,
            deadline_at: pairing.deadline_at,
            grace_until: pairing.grace_until,
            guarantee: pairing.guarantee,
            invite_token: pairing.invite_token,
            invite_expires_at: pairing.invite_expires_at,
            invite_used_at: pairing.invite_used_at,
            partner_accepted_at: pairing.partner_accepted_at,
            partner_paid_at: pairing.partner_paid_at,
            slots: [captain, partner],
        })
    }

    pub fn captain(&self) -> &Slot {
        &self.slots[0]
    }

    pub fn partner(&self) -> &Slot {
        &self.slots[1]
    }

    pub fn slots(&self) -> &[Slot; 2] {
        &self.slots
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == PairingStatus::Confirmed
    }

    /// Both seats paid, as the SPLIT confirmation guard understands it.
    pub fn fully_paid(&self) -> bool {
        self.slots.iter().all(|s| s.payment == SlotPayment::Paid)
    }

    fn authorize(&self, actor: &Actor) -> Result<(), EngineError> {
        if actor.staff || actor.user_id == self.created_by {
            Ok(())
        } else {
            Err(EngineError::Forbidden)
        }
    }

    fn split_window_expired(&self, now: DateTime<Utc>) -> bool {
        if self.payment_mode != PaymentMode::Split {
            return false;
        }
        if self.partner().payment == SlotPayment::Paid {
            return false;
        }
        let deadline_passed = self.deadline_at.is_some_and(|d| d < now);
        let grace_passed = self.grace_until.is_some_and(|g| g < now);
        deadline_passed || grace_passed
    }

    /// Recompute the pairing status from slot state. CONFIRMED requires both
    /// slots filled and, for FULL, the captain paid; for SPLIT, both paid.
    fn refresh_status(&mut self) {
        if self.status == PairingStatus::Cancelled {
            return;
        }
        let both_filled = self.slots.iter().all(|s| s.status == SlotStatus::Filled);
        let paid = match self.payment_mode {
            PaymentMode::Full => self.captain().payment == SlotPayment::Paid,
            PaymentMode::Split => self.fully_paid(),
        };
        self.status = if both_filled && paid {
            PairingStatus::Confirmed
        } else {
            PairingStatus::Incomplete
        };
    }

    /// Partner joins through an invite token.
    pub fn accept_invite(
        &mut self,
        token: Uuid,
        joining_user: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if self.status == PairingStatus::Cancelled {
            return Err(EngineError::PairingCancelled);
        }
        if self.invite_used_at.is_some() {
            return Err(EngineError::InviteAlreadyUsed);
        }
        let Some(expected) = self.invite_token else {
            return Err(EngineError::InviteAlreadyUsed);
        };
        if expected != token {
            // A rotated token means this link was superseded by a reopen.
            return Err(EngineError::InviteAlreadyUsed);
        }
        if self.invite_expires_at.is_some_and(|e| e < now) {
            return Err(EngineError::InviteExpired);
        }
        self.fill_partner(joining_user, now)
    }

    /// Partner joins a publicly discoverable pairing (matchmaking).
    pub fn join_open(&mut self, joining_user: Uuid, now: DateTime<Utc>) -> Result<(), EngineError> {
        if self.status == PairingStatus::Cancelled {
            return Err(EngineError::PairingCancelled);
        }
        if !self.is_public_open {
            return Err(EngineError::Forbidden);
        }
        self.fill_partner(joining_user, now)
    }

    fn fill_partner(&mut self, joining_user: Uuid, now: DateTime<Utc>) -> Result<(), EngineError> {
        if joining_user == self.created_by {
            return Err(EngineError::Invalid("captain cannot take the partner seat".into()));
        }
        if self.partner().status == SlotStatus::Filled {
            return Err(EngineError::SlotTaken);
        }
        if self.split_window_expired(now) {
            return Err(EngineError::PairingExpired);
        }

        let partner_prepaid = self.partner().payment == SlotPayment::Paid;
        {
            let partner = &mut self.slots[1];
            partner.status = SlotStatus::Filled;
            partner.occupant = Occupant::Profile(joining_user);
        }
        self.invite_token = None;
        self.invite_expires_at = None;
        self.invite_used_at = Some(now);
        self.partner_accepted_at = Some(now);
        if partner_prepaid {
            self.partner_paid_at = Some(now);
            self.release_guarantee();
        }
        self.refresh_status();
        Ok(())
    }

    /// Record a captured payment for one seat. Idempotent: capturing an
    /// already-paid seat is a no-op, so gateway callback retries are safe.
    pub fn capture_payment(&mut self, role: SlotRole, now: DateTime<Utc>) -> Result<(), EngineError> {
        if self.status == PairingStatus::Cancelled {
            return Err(EngineError::PairingCancelled);
        }
        let idx = match role {
            SlotRole::Captain => 0,
            SlotRole::Partner => 1,
        };
        if self.slots[idx].payment == SlotPayment::Paid {
            return Ok(());
        }
        if self.payment_mode == PaymentMode::Split && self.split_window_expired(now) {
            return Err(EngineError::SplitDeadlinePassed);
        }

        self.slots[idx].payment = SlotPayment::Paid;
        match role {
            SlotRole::Captain => {
                // Under FULL mode one capture covers both seats.
                if self.payment_mode == PaymentMode::Full {
                    self.slots[1].payment = SlotPayment::Paid;
                    if self.slots[1].status == SlotStatus::Filled {
                        self.partner_paid_at = Some(now);
                    }
                }
            }
            SlotRole::Partner => {
                self.partner_paid_at = Some(now);
                self.release_guarantee();
            }
        }
        self.refresh_status();
        Ok(())
    }

    fn release_guarantee(&mut self) {
        if self.guarantee == GuaranteeStatus::Armed {
            self.guarantee = GuaranteeStatus::None;
        }
    }

    /// Reopen a cancelled (or expired, per its registration) pairing so the
    /// captain can look for a new partner. The captain keeps their seat and
    /// payment; the partner seat is wiped.
    pub fn reopen(
        &mut self,
        mode: JoinMode,
        actor: &Actor,
        registration_inactive: bool,
        event_start: Option<DateTime<Utc>>,
        deadline_hours: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.authorize(actor)?;
        if self.status != PairingStatus::Cancelled && !registration_inactive {
            return Err(EngineError::PairingNotCancelled);
        }
        if self.payment_mode == PaymentMode::Split && self.partner().payment == SlotPayment::Paid {
            // A paid partner cannot be silently evicted.
            return Err(EngineError::PartnerLocked);
        }

        self.deadline_at = match self.payment_mode {
            PaymentMode::Split => {
                Some(deadlines::compute_split_deadline(now, event_start, deadline_hours)?)
            }
            PaymentMode::Full => None,
        };
        self.grace_until = None;
        self.join_mode = mode;
        self.is_public_open = mode == JoinMode::LookingForPartner;
        self.status = PairingStatus::Incomplete;
        self.guarantee = match self.payment_mode {
            PaymentMode::Split => GuaranteeStatus::Armed,
            PaymentMode::Full => GuaranteeStatus::None,
        };

        let partner = &mut self.slots[1];
        partner.status = SlotStatus::Pending;
        partner.payment = SlotPayment::Unpaid;
        partner.occupant = Occupant::Empty;
        self.partner_accepted_at = None;
        self.partner_paid_at = None;
        self.invite_used_at = None;
        match mode {
            JoinMode::InvitePartner => {
                // Tokens are never reused across reopens.
                self.invite_token = Some(Uuid::new_v4());
                self.invite_expires_at = Some(deadlines::compute_partner_link_expiry(now, None));
            }
            JoinMode::LookingForPartner => {
                self.invite_token = None;
                self.invite_expires_at = None;
            }
        }
        self.refresh_status();
        // refresh_status would flip a FULL pairing with a paid captain back
        // to CONFIRMED only if the partner seat were filled; it is pending
        // here, so the pairing stays INCOMPLETE.
        Ok(())
    }

    /// Cancel the pairing. Terminal but re-openable.
    pub fn cancel(&mut self, actor: &Actor) -> Result<(), EngineError> {
        self.authorize(actor)?;
        if self.status == PairingStatus::Cancelled {
            return Err(EngineError::PairingCancelled);
        }
        self.status = PairingStatus::Cancelled;
        Ok(())
    }

    /// Sweep-side expiry of a stale SPLIT pairing: the armed guarantee is
    /// consumed (forfeited deposit); the registration moves to EXPIRED by the
    /// caller through the guarded transition.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if self.status == PairingStatus::Confirmed {
            return Err(EngineError::InvalidTransition("cannot expire a confirmed pairing".into()));
        }
        if !self.split_window_expired(now) {
            return Err(EngineError::InvalidTransition("deadline has not passed".into()));
        }
        if self.guarantee == GuaranteeStatus::Armed {
            self.guarantee = GuaranteeStatus::Consumed;
        }
        self.status = PairingStatus::Cancelled;
        Ok(())
    }
}

/// Scalar (slot-free) pairing fields as loaded from the store; combined with
/// slots through [`Pairing::from_parts`].
#[derive(Debug, Clone)]
pub struct Pairing0 {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    pub created_by: Uuid,
    pub payment_mode: PaymentMode,
    pub join_mode: JoinMode,
    pub is_public_open: bool,
    pub status: PairingStatus,
    pub deadline_at: Option<DateTime<Utc>>,
    pub grace_until: Option<DateTime<Utc>>,
    pub guarantee: GuaranteeStatus,
    pub invite_token: Option<Uuid>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub invite_used_at: Option<DateTime<Utc>>,
    pub partner_accepted_at: Option<DateTime<Utc>>,
    pub partner_paid_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub struct SlotState {
        pub filled: bool,
        pub paid: bool,
    }

    pub fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    /// Build a pairing in an arbitrary slot state for table-driven tests.
    pub fn pairing_with(
        join_mode: JoinMode,
        payment_mode: PaymentMode,
        captain: SlotState,
        partner: SlotState,
    ) -> Pairing {
        let creator = Uuid::new_v4();
        let mut pairing = Pairing::create(
            NewPairing {
                event_id: Uuid::new_v4(),
                category_id: None,
                creator,
                payment_mode,
                join_mode,
                captain_paid: captain.paid,
                invited_user: None,
                invited_contact: None,
                event_start: None,
                deadline_hours: None,
                invite_expiry_minutes: None,
            },
            fixed_now(),
        )
        .unwrap();
        if partner.filled {
            pairing.slots[1].status = SlotStatus::Filled;
            pairing.slots[1].occupant = Occupant::Profile(Uuid::new_v4());
        }
        pairing.slots[1].payment = if partner.paid { SlotPayment::Paid } else { SlotPayment::Unpaid };
        pairing
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::fixed_now;
    use super::*;
    use chrono::Duration;

    fn new_split_invite(invited: Option<Uuid>) -> (Pairing, Uuid) {
        let creator = Uuid::new_v4();
        let pairing = Pairing::create(
            NewPairing {
                event_id: Uuid::new_v4(),
                category_id: Some(Uuid::new_v4()),
                creator,
                payment_mode: PaymentMode::Split,
                join_mode: JoinMode::InvitePartner,
                captain_paid: true,
                invited_user: invited,
                invited_contact: None,
                event_start: Some(fixed_now() + Duration::days(7)),
                deadline_hours: Some(48),
                invite_expiry_minutes: None,
            },
            fixed_now(),
        )
        .unwrap();
        (pairing, creator)
    }

    #[test]
    fn create_always_yields_two_slots() {
        let (pairing, creator) = new_split_invite(None);
        assert_eq!(pairing.slots().len(), 2);
        assert_eq!(pairing.captain().role, SlotRole::Captain);
        assert_eq!(pairing.partner().role, SlotRole::Partner);
        assert_eq!(pairing.captain().occupant, Occupant::Profile(creator));
        assert_eq!(pairing.partner().status, SlotStatus::Pending);
        assert_eq!(pairing.status, PairingStatus::Incomplete);
        assert_eq!(pairing.guarantee, GuaranteeStatus::Armed);
        assert!(pairing.invite_token.is_some());
        assert!(pairing.deadline_at.is_some());
    }

    #[test]
    fn create_full_mode_prepays_partner_seat() {
        let pairing = Pairing::create(
            NewPairing {
                event_id: Uuid::new_v4(),
                category_id: None,
                creator: Uuid::new_v4(),
                payment_mode: PaymentMode::Full,
                join_mode: JoinMode::LookingForPartner,
                captain_paid: true,
                invited_user: None,
                invited_contact: None,
                event_start: None,
                deadline_hours: None,
                invite_expiry_minutes: None,
            },
            fixed_now(),
        )
        .unwrap();
        assert_eq!(pairing.partner().payment, SlotPayment::Paid);
        assert!(pairing.is_public_open);
        assert!(pairing.invite_token.is_none());
        assert_eq!(pairing.deadline_at, None);
        assert_eq!(pairing.guarantee, GuaranteeStatus::None);
    }

    #[test]
    fn create_rejects_self_invite() {
        let creator = Uuid::new_v4();
        let err = Pairing::create(
            NewPairing {
                event_id: Uuid::new_v4(),
                category_id: None,
                creator,
                payment_mode: PaymentMode::Full,
                join_mode: JoinMode::InvitePartner,
                captain_paid: false,
                invited_user: Some(creator),
                invited_contact: None,
                event_start: None,
                deadline_hours: None,
                invite_expiry_minutes: None,
            },
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Invalid(_)));
    }

    #[test]
    fn from_parts_enforces_slot_cardinality() {
        let (pairing, _) = new_split_invite(None);
        let scalar = Pairing0 {
            id: pairing.id,
            event_id: pairing.event_id,
            category_id: pairing.category_id,
            created_by: pairing.created_by,
            payment_mode: pairing.payment_mode,
            join_mode: pairing.join_mode,
            is_public_open: pairing.is_public_open,
            status: pairing.status,
            deadline_at: pairing.deadline_at,
            grace_until: pairing.grace_until,
            guarantee: pairing.guarantee,
            invite_token: pairing.invite_token,
            invite_expires_at: pairing.invite_expires_at,
            invite_used_at: pairing.invite_used_at,
            partner_accepted_at: pairing.partner_accepted_at,
            partner_paid_at: pairing.partner_paid_at,
        };
        let one_slot = vec![pairing.captain().clone()];
        assert!(matches!(
            Pairing::from_parts(scalar.clone(), one_slot),
            Err(EngineError::Invariant(_))
        ));
        let two_captains = vec![pairing.captain().clone(), pairing.captain().clone()];
        assert!(matches!(
            Pairing::from_parts(scalar.clone(), two_captains),
            Err(EngineError::Invariant(_))
        ));
        let good = vec![pairing.captain().clone(), pairing.partner().clone()];
        let rebuilt = Pairing::from_parts(scalar, good).unwrap();
        assert_eq!(rebuilt, pairing);
    }

    #[test]
    fn accept_invite_happy_path() {
        let (mut pairing, _) = new_split_invite(None);
        let token = pairing.invite_token.unwrap();
        let partner = Uuid::new_v4();
        pairing.accept_invite(token, partner, fixed_now()).unwrap();
        assert_eq!(pairing.partner().status, SlotStatus::Filled);
        assert_eq!(pairing.partner().occupant, Occupant::Profile(partner));
        assert!(pairing.invite_token.is_none());
        assert!(pairing.invite_used_at.is_some());
        // Split partner has not paid yet: not confirmed.
        assert_eq!(pairing.status, PairingStatus::Incomplete);
    }

    #[test]
    fn accept_expired_invite_fails_without_state_change() {
        let (mut pairing, _) = new_split_invite(None);
        let token = pairing.invite_token.unwrap();
        let before = pairing.clone();
        let late = fixed_now() + Duration::hours(49);
        let err = pairing.accept_invite(token, Uuid::new_v4(), late).unwrap_err();
        assert_eq!(err, EngineError::InviteExpired);
        assert_eq!(pairing, before);
    }

    #[test]
    fn accept_consumed_or_rotated_token_fails() {
        let (mut pairing, _) = new_split_invite(None);
        let token = pairing.invite_token.unwrap();
        pairing.accept_invite(token, Uuid::new_v4(), fixed_now()).unwrap();
        assert_eq!(
            pairing.accept_invite(token, Uuid::new_v4(), fixed_now()),
            Err(EngineError::InviteAlreadyUsed)
        );

        let (mut other, _) = new_split_invite(None);
        let wrong = Uuid::new_v4();
        assert_eq!(
            other.accept_invite(wrong, Uuid::new_v4(), fixed_now()),
            Err(EngineError::InviteAlreadyUsed)
        );
    }

    #[test]
    fn second_joiner_loses_with_slot_taken() {
        let creator = Uuid::new_v4();
        let mut pairing = Pairing::create(
            NewPairing {
                event_id: Uuid::new_v4(),
                category_id: None,
                creator,
                payment_mode: PaymentMode::Split,
                join_mode: JoinMode::LookingForPartner,
                captain_paid: true,
                invited_user: None,
                invited_contact: None,
                event_start: None,
                deadline_hours: None,
                invite_expiry_minutes: None,
            },
            fixed_now(),
        )
        .unwrap();
        pairing.join_open(Uuid::new_v4(), fixed_now()).unwrap();
        assert_eq!(
            pairing.join_open(Uuid::new_v4(), fixed_now()),
            Err(EngineError::SlotTaken)
        );
    }

    #[test]
    fn captain_cannot_join_own_pairing() {
        let (mut pairing, creator) = new_split_invite(None);
        let token = pairing.invite_token.unwrap();
        assert!(matches!(
            pairing.accept_invite(token, creator, fixed_now()),
            Err(EngineError::Invalid(_))
        ));
    }

    #[test]
    fn split_capture_confirms_only_when_both_paid() {
        let (mut pairing, _) = new_split_invite(None);
        let token = pairing.invite_token.unwrap();
        pairing.accept_invite(token, Uuid::new_v4(), fixed_now()).unwrap();

        pairing.capture_payment(SlotRole::Captain, fixed_now()).unwrap();
        assert_eq!(pairing.status, PairingStatus::Incomplete);

        pairing.capture_payment(SlotRole::Partner, fixed_now()).unwrap();
        assert_eq!(pairing.status, PairingStatus::Confirmed);
        assert!(pairing.partner_paid_at.is_some());
        // Guarantee is released once the partner actually pays.
        assert_eq!(pairing.guarantee, GuaranteeStatus::None);
    }

    #[test]
    fn full_capture_covers_partner_and_confirms_when_filled() {
        let creator = Uuid::new_v4();
        let mut pairing = Pairing::create(
            NewPairing {
                event_id: Uuid::new_v4(),
                category_id: None,
                creator,
                payment_mode: PaymentMode::Full,
                join_mode: JoinMode::LookingForPartner,
                captain_paid: false,
                invited_user: None,
                invited_contact: None,
                event_start: None,
                deadline_hours: None,
                invite_expiry_minutes: None,
            },
            fixed_now(),
        )
        .unwrap();
        pairing.join_open(Uuid::new_v4(), fixed_now()).unwrap();
        assert_eq!(pairing.status, PairingStatus::Incomplete);

        pairing.capture_payment(SlotRole::Captain, fixed_now()).unwrap();
        assert_eq!(pairing.partner().payment, SlotPayment::Paid);
        assert_eq!(pairing.status, PairingStatus::Confirmed);
    }

    #[test]
    fn capture_is_idempotent() {
        let (mut pairing, _) = new_split_invite(None);
        pairing.capture_payment(SlotRole::Captain, fixed_now()).unwrap();
        let snapshot = pairing.clone();
        pairing.capture_payment(SlotRole::Captain, fixed_now()).unwrap();
        assert_eq!(pairing, snapshot);
    }

    #[test]
    fn split_capture_after_deadline_fails_closed() {
        let (mut pairing, _) = new_split_invite(None);
        let token = pairing.invite_token.unwrap();
        pairing.accept_invite(token, Uuid::new_v4(), fixed_now()).unwrap();
        let late = pairing.deadline_at.unwrap() + Duration::minutes(1);
        assert_eq!(
            pairing.capture_payment(SlotRole::Partner, late),
            Err(EngineError::SplitDeadlinePassed)
        );
    }

    #[test]
    fn reopen_requires_cancelled_or_inactive() {
        let (mut pairing, creator) = new_split_invite(None);
        let actor = Actor { user_id: creator, staff: false };
        assert_eq!(
            pairing.reopen(JoinMode::InvitePartner, &actor, false, None, None, fixed_now()),
            Err(EngineError::PairingNotCancelled)
        );
    }

    #[test]
    fn reopen_rejects_strangers() {
        let (mut pairing, creator) = new_split_invite(None);
        let captain = Actor { user_id: creator, staff: false };
        pairing.cancel(&captain).unwrap();
        let stranger = Actor { user_id: Uuid::new_v4(), staff: false };
        assert_eq!(
            pairing.reopen(JoinMode::InvitePartner, &stranger, false, None, None, fixed_now()),
            Err(EngineError::Forbidden)
        );
    }

    #[test]
    fn reopen_with_paid_split_partner_is_locked() {
        let (mut pairing, creator) = new_split_invite(None);
        let token = pairing.invite_token.unwrap();
        pairing.accept_invite(token, Uuid::new_v4(), fixed_now()).unwrap();
        pairing.capture_payment(SlotRole::Partner, fixed_now()).unwrap();
        let captain = Actor { user_id: creator, staff: false };
        pairing.status = PairingStatus::Cancelled;
        assert_eq!(
            pairing.reopen(JoinMode::LookingForPartner, &captain, false, None, None, fixed_now()),
            Err(EngineError::PartnerLocked)
        );
    }

    #[test]
    fn reopen_resets_partner_and_mints_fresh_token() {
        let (mut pairing, creator) = new_split_invite(None);
        let first_token = pairing.invite_token.unwrap();
        pairing.accept_invite(first_token, Uuid::new_v4(), fixed_now()).unwrap();
        pairing.capture_payment(SlotRole::Captain, fixed_now()).unwrap();
        let captain = Actor { user_id: creator, staff: false };
        pairing.cancel(&captain).unwrap();

        let start = fixed_now() + Duration::days(7);
        pairing
            .reopen(JoinMode::InvitePartner, &captain, false, Some(start), Some(24), fixed_now())
            .unwrap();

        assert_eq!(pairing.status, PairingStatus::Incomplete);
        assert_eq!(pairing.partner().status, SlotStatus::Pending);
        assert_eq!(pairing.partner().payment, SlotPayment::Unpaid);
        assert_eq!(pairing.partner().occupant, Occupant::Empty);
        // Captain keeps seat and payment.
        assert_eq!(pairing.captain().payment, SlotPayment::Paid);
        assert_eq!(pairing.guarantee, GuaranteeStatus::Armed);
        let new_token = pairing.invite_token.unwrap();
        assert_ne!(new_token, first_token);
        assert!(pairing.invite_used_at.is_none());
        assert_eq!(pairing.deadline_at, Some(fixed_now() + Duration::hours(24)));
    }

    #[test]
    fn reopen_fails_when_window_no_longer_fits() {
        let (mut pairing, creator) = new_split_invite(None);
        let captain = Actor { user_id: creator, staff: false };
        pairing.cancel(&captain).unwrap();
        let started = fixed_now() - Duration::hours(1);
        assert_eq!(
            pairing.reopen(
                JoinMode::LookingForPartner,
                &captain,
                false,
                Some(started),
                None,
                fixed_now()
            ),
            Err(EngineError::SplitDeadlinePassed)
        );
    }

    #[test]
    fn staff_can_reopen_via_inactive_registration() {
        let (mut pairing, _) = new_split_invite(None);
        let staff = Actor { user_id: Uuid::new_v4(), staff: true };
        pairing
            .reopen(JoinMode::LookingForPartner, &staff, true, None, None, fixed_now())
            .unwrap();
        assert!(pairing.is_public_open);
        assert!(pairing.invite_token.is_none());
    }

    #[test]
    fn cancel_then_expire_semantics() {
        let (mut pairing, creator) = new_split_invite(None);
        let captain = Actor { user_id: creator, staff: false };
        pairing.cancel(&captain).unwrap();
        assert_eq!(pairing.status, PairingStatus::Cancelled);
        assert_eq!(pairing.cancel(&captain), Err(EngineError::PairingCancelled));
    }

    #[test]
    fn expire_consumes_armed_guarantee() {
        let (mut pairing, _) = new_split_invite(None);
        let late = pairing.deadline_at.unwrap() + Duration::minutes(1);
        assert!(pairing.expire(fixed_now()).is_err());
        pairing.expire(late).unwrap();
        assert_eq!(pairing.guarantee, GuaranteeStatus::Consumed);
        assert_eq!(pairing.status, PairingStatus::Cancelled);
    }
}
