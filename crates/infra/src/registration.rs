//! Registration status derivation and transition guards.
//!
//! The registration status is never stored truth on its own: it is a pure
//! function of the pairing's join mode, payment mode and slot state, and is
//! recomputed inside the same transaction as every pairing mutation.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::pairing::{JoinMode, Pairing, PairingStatus, PaymentMode, SlotPayment, SlotStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    PendingPartner,
    PendingPayment,
    Matchmaking,
    Confirmed,
    Cancelled,
    Expired,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::PendingPartner => "PENDING_PARTNER",
            RegistrationStatus::PendingPayment => "PENDING_PAYMENT",
            RegistrationStatus::Matchmaking => "MATCHMAKING",
            RegistrationStatus::Confirmed => "CONFIRMED",
            RegistrationStatus::Cancelled => "CANCELLED",
            RegistrationStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw {
            "PENDING_PARTNER" => Ok(RegistrationStatus::PendingPartner),
            "PENDING_PAYMENT" => Ok(RegistrationStatus::PendingPayment),
            "MATCHMAKING" => Ok(RegistrationStatus::Matchmaking),
            "CONFIRMED" => Ok(RegistrationStatus::Confirmed),
            "CANCELLED" => Ok(RegistrationStatus::Cancelled),
            "EXPIRED" => Ok(RegistrationStatus::Expired),
            other => Err(EngineError::Invariant(format!(
                "unknown registration status {other}"
            ))),
        }
    }

    /// Terminal statuses are sticky: nothing transitions out of them through
    /// normal mutation (reopen goes through the pairing, not the registration).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationStatus::Cancelled | RegistrationStatus::Expired)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// Public lifecycle label consumed by clients; a projection, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingLifecycle {
    PendingOnePaid,
    PendingPartnerPayment,
    ConfirmedBothPaid,
    ConfirmedCaptainFull,
    CancelledIncomplete,
}

/// The status table of the state machine. Expiry is not derived here; only
/// the sweep moves a registration to `Expired`.
pub fn derive_status(pairing: &Pairing) -> RegistrationStatus {
    if pairing.status == PairingStatus::Cancelled {
        return RegistrationStatus::Cancelled;
    }

    let captain_paid = pairing.captain().payment == SlotPayment::Paid;
    let partner_filled = pairing.partner().status == SlotStatus::Filled;
    let partner_paid = pairing.partner().payment == SlotPayment::Paid;
    let awaiting_partner = match pairing.join_mode {
        JoinMode::LookingForPartner => RegistrationStatus::Matchmaking,
        JoinMode::InvitePartner => RegistrationStatus::PendingPartner,
    };

    match pairing.payment_mode {
        PaymentMode::Full => {
            if !captain_paid {
                RegistrationStatus::PendingPayment
            } else if !partner_filled {
                awaiting_partner
            } else {
                RegistrationStatus::Confirmed
            }
        }
        PaymentMode::Split => {
            if !partner_filled {
                awaiting_partner
            } else if captain_paid && partner_paid {
                RegistrationStatus::Confirmed
            } else {
                RegistrationStatus::PendingPayment
            }
        }
    }
}

/// Project the stored status into the public lifecycle label.
pub fn lifecycle(status: RegistrationStatus, payment_mode: PaymentMode) -> PairingLifecycle {
    match status {
        RegistrationStatus::Confirmed => match payment_mode {
            PaymentMode::Full => PairingLifecycle::ConfirmedCaptainFull,
            PaymentMode::Split => PairingLifecycle::ConfirmedBothPaid,
        },
        RegistrationStatus::PendingPayment => PairingLifecycle::PendingPartnerPayment,
        RegistrationStatus::PendingPartner | RegistrationStatus::Matchmaking => {
            PairingLifecycle::PendingOnePaid
        }
        RegistrationStatus::Cancelled | RegistrationStatus::Expired => {
            PairingLifecycle::CancelledIncomplete
        }
    }
}

/// Guard a persisted transition `from -> to`.
///
/// Terminal statuses never change (reopen replaces the registration through
/// the pairing path), `Expired` is only reachable from the pending statuses,
/// and a SPLIT pairing cannot confirm unless both seats are paid.
pub fn check_transition(
    from: Option<RegistrationStatus>,
    to: RegistrationStatus,
    payment_mode: PaymentMode,
    fully_paid: bool,
) -> Result<(), EngineError> {
    if let Some(from) = from {
        if from == to {
            return Ok(());
        }
        if from.is_terminal() {
            return Err(EngineError::TerminalStatus);
        }
    }
    if to == RegistrationStatus::Expired {
        let allowed = matches!(
            from,
            Some(
                RegistrationStatus::PendingPartner
                    | RegistrationStatus::PendingPayment
                    | RegistrationStatus::Matchmaking
            )
        );
        if !allowed {
            return Err(EngineError::InvalidTransition(format!(
                "cannot expire from {from:?}"
            )));
        }
    }
    if to == RegistrationStatus::Confirmed && payment_mode == PaymentMode::Split && !fully_paid {
        return Err(EngineError::InvalidTransition(
            "split confirmation requires both seats paid".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::test_support::{pairing_with, SlotState};

    fn derived(
        join: JoinMode,
        pay: PaymentMode,
        captain_paid: bool,
        partner_filled: bool,
        partner_paid: bool,
    ) -> RegistrationStatus {
        let pairing = pairing_with(
            join,
            pay,
            SlotState { filled: true, paid: captain_paid },
            SlotState { filled: partner_filled, paid: partner_paid },
        );
        derive_status(&pairing)
    }

    #[test]
    fn full_mode_rows_of_the_status_table() {
        use JoinMode::*;
        use PaymentMode::Full;
        assert_eq!(derived(InvitePartner, Full, false, false, false), RegistrationStatus::PendingPayment);
        assert_eq!(derived(InvitePartner, Full, true, false, false), RegistrationStatus::PendingPartner);
        assert_eq!(derived(LookingForPartner, Full, true, false, false), RegistrationStatus::Matchmaking);
        assert_eq!(derived(InvitePartner, Full, true, true, true), RegistrationStatus::Confirmed);
        // FULL mode treats the partner seat as covered by the captain.
        assert_eq!(derived(InvitePartner, Full, true, true, false), RegistrationStatus::Confirmed);
    }

    #[test]
    fn split_mode_rows_of_the_status_table() {
        use JoinMode::*;
        use PaymentMode::Split;
        assert_eq!(derived(InvitePartner, Split, true, false, false), RegistrationStatus::PendingPartner);
        assert_eq!(derived(LookingForPartner, Split, false, false, false), RegistrationStatus::Matchmaking);
        assert_eq!(derived(InvitePartner, Split, true, true, false), RegistrationStatus::PendingPayment);
        assert_eq!(derived(InvitePartner, Split, false, true, false), RegistrationStatus::PendingPayment);
        assert_eq!(derived(InvitePartner, Split, true, true, true), RegistrationStatus::Confirmed);
    }

    #[test]
    fn cancelled_pairing_always_projects_cancelled() {
        let mut pairing = pairing_with(
            JoinMode::InvitePartner,
            PaymentMode::Split,
            SlotState { filled: true, paid: true },
            SlotState { filled: true, paid: true },
        );
        pairing.status = PairingStatus::Cancelled;
        assert_eq!(derive_status(&pairing), RegistrationStatus::Cancelled);
    }

    #[test]
    fn lifecycle_projection() {
        assert_eq!(
            lifecycle(RegistrationStatus::Confirmed, PaymentMode::Full),
            PairingLifecycle::ConfirmedCaptainFull
        );
        assert_eq!(
            lifecycle(RegistrationStatus::Confirmed, PaymentMode::Split),
            PairingLifecycle::ConfirmedBothPaid
        );
        assert_eq!(
            lifecycle(RegistrationStatus::Matchmaking, PaymentMode::Split),
            PairingLifecycle::PendingOnePaid
        );
        assert_eq!(
            lifecycle(RegistrationStatus::Expired, PaymentMode::Split),
            PairingLifecycle::CancelledIncomplete
        );
    }

    #[test]
    fn terminal_statuses_are_sticky() {
        let err = check_transition(
            Some(RegistrationStatus::Cancelled),
            RegistrationStatus::Confirmed,
            PaymentMode::Full,
            true,
        )
        .unwrap_err();
        assert_eq!(err, EngineError::TerminalStatus);
        // Same-status writes are allowed (idempotent upsert).
        assert!(check_transition(
            Some(RegistrationStatus::Expired),
            RegistrationStatus::Expired,
            PaymentMode::Split,
            false,
        )
        .is_ok());
    }

    #[test]
    fn expiry_only_from_pending_statuses() {
        assert!(check_transition(
            Some(RegistrationStatus::PendingPayment),
            RegistrationStatus::Expired,
            PaymentMode::Split,
            false,
        )
        .is_ok());
        assert!(check_transition(
            Some(RegistrationStatus::Confirmed),
            RegistrationStatus::Expired,
            PaymentMode::Split,
            true,
        )
        .is_err());
        assert!(check_transition(None, RegistrationStatus::Expired, PaymentMode::Split, false).is_err());
    }

    #[test]
    fn split_confirmation_requires_full_payment() {
        assert!(check_transition(
            Some(RegistrationStatus::PendingPayment),
            RegistrationStatus::Confirmed,
            PaymentMode::Split,
            false,
        )
        .is_err());
        assert!(check_transition(
            Some(RegistrationStatus::PendingPayment),
            RegistrationStatus::Confirmed,
            PaymentMode::Split,
            true,
        )
        .is_ok());
    }
}
