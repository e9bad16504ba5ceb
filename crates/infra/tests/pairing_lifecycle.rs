//! End-to-end lifecycle runs through the public engine API, no database.

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use infra::pairing::{
    Actor, GuaranteeStatus, JoinMode, NewPairing, Pairing, PairingStatus, PaymentMode, SlotRole,
};
use infra::registration::{self, PairingLifecycle, RegistrationStatus};
use infra::score::{resolve_match_stats, ResultType, ScoreRules, SetScore, Side};

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

fn split_invite_pairing() -> (Pairing, Uuid) {
    let captain = Uuid::new_v4();
    let pairing = Pairing::create(
        NewPairing {
            event_id: Uuid::new_v4(),
            category_id: Some(Uuid::new_v4()),
            creator: captain,
            payment_mode: PaymentMode::Split,
            join_mode: JoinMode::InvitePartner,
            captain_paid: true,
            invited_user: None,
            invited_contact: Some("partner@example.pt".into()),
            event_start: Some(now() + Duration::days(10)),
            deadline_hours: Some(48),
            invite_expiry_minutes: None,
        },
        now(),
    )
    .unwrap();
    (pairing, captain)
}

fn recompute(
    pairing: &Pairing,
    stored: Option<RegistrationStatus>,
) -> Result<RegistrationStatus, infra::EngineError> {
    let next = registration::derive_status(pairing);
    registration::check_transition(stored, next, pairing.payment_mode, pairing.fully_paid())?;
    Ok(next)
}

#[test]
fn split_invite_happy_path_to_confirmed() {
    let (mut pairing, _) = split_invite_pairing();
    let mut status = recompute(&pairing, None).unwrap();
    assert_eq!(status, RegistrationStatus::PendingPartner);
    assert_eq!(
        registration::lifecycle(status, pairing.payment_mode),
        PairingLifecycle::PendingOnePaid
    );

    let token = pairing.invite_token.unwrap();
    let partner = Uuid::new_v4();
    pairing.accept_invite(token, partner, now() + Duration::hours(1)).unwrap();
    status = recompute(&pairing, Some(status)).unwrap();
    assert_eq!(status, RegistrationStatus::PendingPayment);

    pairing
        .capture_payment(SlotRole::Partner, now() + Duration::hours(2))
        .unwrap();
    status = recompute(&pairing, Some(status)).unwrap();
    assert_eq!(status, RegistrationStatus::Confirmed);
    assert!(pairing.is_confirmed());
    assert_eq!(pairing.guarantee, GuaranteeStatus::None);
    assert_eq!(
        registration::lifecycle(status, pairing.payment_mode),
        PairingLifecycle::ConfirmedBothPaid
    );
}

#[test]
fn split_confirmation_is_blocked_until_both_seats_paid() {
    let (mut pairing, _) = split_invite_pairing();
    let token = pairing.invite_token.unwrap();
    pairing.accept_invite(token, Uuid::new_v4(), now()).unwrap();

    // Deriving a confirmed status out of a half-paid pairing is impossible,
    // and the guard also rejects it if an off-path write ever tried.
    assert_eq!(registration::derive_status(&pairing), RegistrationStatus::PendingPayment);
    assert!(registration::check_transition(
        Some(RegistrationStatus::PendingPayment),
        RegistrationStatus::Confirmed,
        PaymentMode::Split,
        false,
    )
    .is_err());
}

#[test]
fn sweep_expiry_consumes_guarantee_and_is_sticky() {
    let (mut pairing, _) = split_invite_pairing();
    let stored = recompute(&pairing, None).unwrap();

    let late = pairing.deadline_at.unwrap() + Duration::minutes(5);
    pairing.expire(late).unwrap();
    assert_eq!(pairing.guarantee, GuaranteeStatus::Consumed);

    registration::check_transition(
        Some(stored),
        RegistrationStatus::Expired,
        pairing.payment_mode,
        pairing.fully_paid(),
    )
    .unwrap();

    // Once expired, nothing moves it again.
    assert!(registration::check_transition(
        Some(RegistrationStatus::Expired),
        RegistrationStatus::PendingPartner,
        pairing.payment_mode,
        false,
    )
    .is_err());
}

#[test]
fn reopen_after_expiry_restarts_the_lifecycle() {
    let (mut pairing, captain) = split_invite_pairing();
    let late = pairing.deadline_at.unwrap() + Duration::minutes(5);
    pairing.expire(late).unwrap();

    let actor = Actor { user_id: captain, staff: false };
    pairing
        .reopen(
            JoinMode::LookingForPartner,
            &actor,
            true,
            Some(late + Duration::days(5)),
            Some(24),
            late,
        )
        .unwrap();
    assert_eq!(pairing.status, PairingStatus::Incomplete);
    assert!(pairing.is_public_open);
    // The forfeited guarantee is re-armed for the fresh window.
    assert_eq!(pairing.guarantee, GuaranteeStatus::Armed);
    assert_eq!(registration::derive_status(&pairing), RegistrationStatus::Matchmaking);

    let joiner = Uuid::new_v4();
    pairing.join_open(joiner, late + Duration::hours(1)).unwrap();
    pairing
        .capture_payment(SlotRole::Partner, late + Duration::hours(2))
        .unwrap();
    assert_eq!(registration::derive_status(&pairing), RegistrationStatus::Confirmed);
}

#[test]
fn walkover_result_synthesizes_a_clean_scoreline() {
    let rules = ScoreRules::default();
    let stats = resolve_match_stats(&[], ResultType::Walkover, Some(Side::B), &rules).unwrap();
    assert_eq!(stats.winner, Side::B);
    assert_eq!(stats.result_type, ResultType::Walkover);
    assert_eq!(stats.b_sets, 2);
    assert_eq!(stats.a_sets, 0);
}

#[test]
fn completed_match_resolves_from_recorded_sets() {
    let rules = ScoreRules::default();
    let sets = vec![
        SetScore { team_a: 6, team_b: 4 },
        SetScore { team_a: 3, team_b: 6 },
        SetScore { team_a: 7, team_b: 6 },
    ];
    let stats = resolve_match_stats(&sets, ResultType::Normal, None, &rules).unwrap();
    assert_eq!(stats.winner, Side::A);
    assert_eq!(stats.a_sets, 2);
    assert_eq!(stats.a_games, 16);
    assert_eq!(stats.b_games, 16);
}
