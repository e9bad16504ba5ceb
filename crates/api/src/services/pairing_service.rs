use chrono::{DateTime, Utc};
use infra::models::{EventRow, PairingRow, PairingSlotRow};
use infra::pairing::{
    Actor, GuaranteeStatus, JoinMode, NewPairing, Pairing, PaymentMode, SlotRole,
};
use infra::registration::{self, RegistrationStatus};
use infra::repos::{events, holds, pairings, registrations};
use infra::EngineError;
use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::entry_service;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct CreatePairing {
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    pub creator: Uuid,
    pub payment_mode: PaymentMode,
    pub join_mode: JoinMode,
    pub captain_paid: bool,
    pub invited_user: Option<Uuid>,
    pub invited_contact: Option<String>,
}

/// Orchestrates every pairing mutation: row lock, pure transition, persist,
/// registration recompute and entry sync all in one transaction. Payment
/// provider side effects happen after commit.
#[derive(Clone)]
pub struct PairingService {
    state: AppState,
}

impl PairingService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn create(&self, input: CreatePairing) -> Result<Pairing, AppError> {
        let now = Utc::now();
        let mut tx = self.state.db.begin().await?;

        let event = events::get_tx(&mut *tx, input.event_id)
            .await?
            .ok_or(EngineError::NotFound)?;
        check_registration_window(&event, now)?;
        let config = events::get_config_tx(&mut *tx, input.event_id, input.category_id).await?;
        let deadline_hours = config
            .as_ref()
            .and_then(|c| c.split_deadline_hours)
            .map(i64::from);

        let pairing = Pairing::create(
            NewPairing {
                event_id: input.event_id,
                category_id: input.category_id,
                creator: input.creator,
                payment_mode: input.payment_mode,
                join_mode: input.join_mode,
                captain_paid: input.captain_paid,
                invited_user: input.invited_user,
                invited_contact: input.invited_contact,
                event_start: event.starts_at,
                deadline_hours,
                invite_expiry_minutes: None,
            },
            now,
        )?;
        pairings::insert(&mut *tx, &pairing, now).await?;
        if pairing.payment_mode == PaymentMode::Split {
            holds::place(&mut *tx, pairing.id, pairing.event_id, now).await?;
        }
        project(&mut *tx, &pairing, None, now).await?;

        tx.commit().await?;
        info!(pairing_id = %pairing.id, event_id = %pairing.event_id, "pairing created");
        Ok(pairing)
    }

    pub async fn accept_invite(&self, token: Uuid, user: Uuid) -> Result<Pairing, AppError> {
        let now = Utc::now();
        // Resolve the token outside the transaction, then mutate under the
        // row lock; a raced consume fails inside `accept_invite`.
        let (row, _) = infra::repos::PairingRepo::new(self.state.db.clone())
            .get_by_invite_token(token)
            .await?
            .ok_or(EngineError::InviteAlreadyUsed)?;
        self.mutate(row.id, now, true, |pairing| pairing.accept_invite(token, user, now))
            .await
    }

    pub async fn join_open(&self, pairing_id: Uuid, user: Uuid) -> Result<Pairing, AppError> {
        let now = Utc::now();
        self.mutate(pairing_id, now, true, |pairing| pairing.join_open(user, now))
            .await
    }

    pub async fn capture_payment(
        &self,
        pairing_id: Uuid,
        role: SlotRole,
    ) -> Result<Pairing, AppError> {
        let now = Utc::now();
        let pairing = self
            .mutate(pairing_id, now, false, |pairing| pairing.capture_payment(role, now))
            .await?;
        if pairing.is_confirmed() {
            let mut tx = self.state.db.begin().await?;
            holds::release(&mut *tx, pairing_id).await?;
            tx.commit().await?;
        }
        Ok(pairing)
    }

    pub async fn cancel(&self, pairing_id: Uuid, actor: Actor) -> Result<Pairing, AppError> {
        let now = Utc::now();
        let pairing = self
            .mutate(pairing_id, now, false, |pairing| pairing.cancel(&actor))
            .await?;
        let mut tx = self.state.db.begin().await?;
        holds::release(&mut *tx, pairing_id).await?;
        tx.commit().await?;
        for slot in pairing.slots() {
            if slot.payment == infra::pairing::SlotPayment::Paid {
                if let Err(e) = self.state.payments().refund_seat(pairing_id, slot.role).await {
                    warn!(%pairing_id, role = slot.role.as_str(), error = %e, "refund request failed");
                }
            }
        }
        Ok(pairing)
    }

    pub async fn reopen(
        &self,
        pairing_id: Uuid,
        mode: JoinMode,
        actor: Actor,
    ) -> Result<Pairing, AppError> {
        let now = Utc::now();
        let mut tx = self.state.db.begin().await?;

        let mut pairing = load_locked(&mut *tx, pairing_id).await?;
        let stored = stored_status(&mut *tx, pairing_id).await?;
        let registration_inactive = stored.is_some_and(|s| s.is_terminal());

        let event = events::get_tx(&mut *tx, pairing.event_id)
            .await?
            .ok_or(EngineError::NotFound)?;
        let config = events::get_config_tx(&mut *tx, pairing.event_id, pairing.category_id).await?;
        let deadline_hours = config
            .as_ref()
            .and_then(|c| c.split_deadline_hours)
            .map(i64::from);

        pairing.reopen(mode, &actor, registration_inactive, event.starts_at, deadline_hours, now)?;
        pairings::update(&mut *tx, &pairing, now).await?;
        if pairing.payment_mode == PaymentMode::Split {
            holds::place(&mut *tx, pairing.id, pairing.event_id, now).await?;
        }

        // Reopen is the one path that leaves a terminal registration, so the
        // derived status is written without the transition guard.
        let next = registration::derive_status(&pairing);
        registrations::upsert(&mut *tx, pairing.id, pairing.event_id, pairing.category_id, next, now)
            .await?;
        entry_service::sync(&mut *tx, &pairing, next, now).await?;

        tx.commit().await?;
        info!(%pairing_id, status = next.as_str(), "pairing reopened");
        Ok(pairing)
    }

    /// Sweep-side expiry. Returns false when the pairing no longer qualifies
    /// (someone paid or cancelled between the scan and the lock).
    pub async fn expire_one(&self, pairing_id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tx = self.state.db.begin().await?;

        let mut pairing = load_locked(&mut *tx, pairing_id).await?;
        let stored = stored_status(&mut *tx, pairing_id).await?;
        if pairing.expire(now).is_err() {
            return Ok(false);
        }
        if registration::check_transition(
            stored,
            RegistrationStatus::Expired,
            pairing.payment_mode,
            pairing.fully_paid(),
        )
        .is_err()
        {
            return Ok(false);
        }

        pairings::update(&mut *tx, &pairing, now).await?;
        registrations::upsert(
            &mut *tx,
            pairing.id,
            pairing.event_id,
            pairing.category_id,
            RegistrationStatus::Expired,
            now,
        )
        .await?;
        entry_service::sync(&mut *tx, &pairing, RegistrationStatus::Expired, now).await?;
        holds::release(&mut *tx, pairing_id).await?;
        tx.commit().await?;

        if pairing.guarantee == GuaranteeStatus::Consumed {
            if let Err(e) = self.state.payments().forfeit_guarantee(pairing_id).await {
                warn!(%pairing_id, error = %e, "guarantee forfeit notification failed");
            }
        }
        info!(%pairing_id, "pairing expired by sweep");
        Ok(true)
    }

    /// Lock, apply one pure transition, persist and reproject. Seat-filling
    /// transitions additionally pass through the registration window gate;
    /// payment capture and cancellation stay valid after it closes.
    async fn mutate<F>(
        &self,
        pairing_id: Uuid,
        now: DateTime<Utc>,
        gate_window: bool,
        transition: F,
    ) -> Result<Pairing, AppError>
    where
        F: FnOnce(&mut Pairing) -> Result<(), EngineError>,
    {
        let mut tx = self.state.db.begin().await?;
        let mut pairing = load_locked(&mut *tx, pairing_id).await?;
        if gate_window {
            let event = events::get_tx(&mut *tx, pairing.event_id)
                .await?
                .ok_or(EngineError::NotFound)?;
            check_registration_window(&event, now)?;
        }
        let stored = stored_status(&mut *tx, pairing_id).await?;
        transition(&mut pairing)?;
        pairings::update(&mut *tx, &pairing, now).await?;
        project(&mut *tx, &pairing, stored, now).await?;
        tx.commit().await?;

        // A freshly confirmed pairing may complete the field; the generator
        // no-ops until the event is actually ready for a draw.
        if pairing.is_confirmed() {
            let generator = crate::services::GenerationService::new(self.state.clone());
            if let Err(e) = generator
                .generate(pairing.event_id, pairing.category_id, false)
                .await
            {
                warn!(pairing_id = %pairing.id, error = %e, "post-confirmation generation failed");
            }
        }
        Ok(pairing)
    }
}

async fn load_locked(conn: &mut PgConnection, pairing_id: Uuid) -> Result<Pairing, AppError> {
    let (row, slots): (PairingRow, Vec<PairingSlotRow>) = pairings::lock(conn, pairing_id)
        .await?
        .ok_or(EngineError::NotFound)?;
    Ok(row.to_domain(&slots)?)
}

async fn stored_status(
    conn: &mut PgConnection,
    pairing_id: Uuid,
) -> Result<Option<RegistrationStatus>, AppError> {
    let row = registrations::get_by_pairing_tx(conn, pairing_id).await?;
    match row {
        Some(row) => Ok(Some(RegistrationStatus::parse(&row.status)?)),
        None => Ok(None),
    }
}

/// Recompute the registration projection and entries after a mutation.
async fn project(
    conn: &mut PgConnection,
    pairing: &Pairing,
    stored: Option<RegistrationStatus>,
    now: DateTime<Utc>,
) -> Result<RegistrationStatus, AppError> {
    let next = registration::derive_status(pairing);
    registration::check_transition(stored, next, pairing.payment_mode, pairing.fully_paid())?;
    registrations::upsert(conn, pairing.id, pairing.event_id, pairing.category_id, next, now)
        .await?;
    entry_service::sync(conn, pairing, next, now).await?;
    Ok(next)
}

fn check_registration_window(event: &EventRow, now: DateTime<Utc>) -> Result<(), EngineError> {
    if event.status != "PUBLISHED" {
        return Err(EngineError::EventNotPublished);
    }
    if event.starts_at.is_some_and(|t| now >= t) {
        return Err(EngineError::TournamentStarted);
    }
    if event.registration_starts_at.is_some_and(|t| now < t) {
        return Err(EngineError::InscriptionsNotOpen);
    }
    if event.registration_ends_at.is_some_and(|t| now >= t) {
        return Err(EngineError::InscriptionsClosed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn event(status: &str) -> EventRow {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        EventRow {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            title: "Open de Lisboa".into(),
            status: status.into(),
            starts_at: Some(now + Duration::days(7)),
            registration_starts_at: Some(now - Duration::days(7)),
            registration_ends_at: Some(now + Duration::days(5)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn window_check_covers_status_and_bounds() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        assert!(check_registration_window(&event("PUBLISHED"), now).is_ok());
        assert_eq!(
            check_registration_window(&event("DRAFT"), now),
            Err(EngineError::EventNotPublished)
        );
        assert_eq!(
            check_registration_window(&event("CANCELLED"), now),
            Err(EngineError::EventNotPublished)
        );

        let late = now + Duration::days(6);
        assert_eq!(
            check_registration_window(&event("PUBLISHED"), late),
            Err(EngineError::InscriptionsClosed)
        );

        let mut started = event("PUBLISHED");
        started.starts_at = Some(now - Duration::hours(1));
        assert_eq!(
            check_registration_window(&started, now),
            Err(EngineError::TournamentStarted)
        );

        let early = now - Duration::days(8);
        assert_eq!(
            check_registration_window(&event("PUBLISHED"), early),
            Err(EngineError::InscriptionsNotOpen)
        );
    }

    #[test]
    fn window_violations_surface_distinct_codes() {
        assert_eq!(EngineError::EventNotPublished.code(), "EVENT_NOT_PUBLISHED");
        assert_eq!(EngineError::InscriptionsNotOpen.code(), "INSCRIPTIONS_NOT_OPEN");
        assert_eq!(EngineError::InscriptionsClosed.code(), "INSCRIPTIONS_CLOSED");
        assert_eq!(EngineError::TournamentStarted.code(), "TOURNAMENT_STARTED");
    }
}
