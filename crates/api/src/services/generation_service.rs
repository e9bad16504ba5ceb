use chrono::{DateTime, Utc};
use infra::draw;
use infra::models::{EventRow, StageRow, StructureMatchRow};
use infra::repos::{events, pairings, structures};
use infra::EngineError;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

const SCHEDULED: &str = "SCHEDULED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    RoundRobin,
    SingleElimination,
    GroupsKnockout,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::RoundRobin => "ROUND_ROBIN",
            Format::SingleElimination => "SINGLE_ELIMINATION",
            Format::GroupsKnockout => "GROUPS_KNOCKOUT",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        match raw {
            "ROUND_ROBIN" => Ok(Format::RoundRobin),
            "SINGLE_ELIMINATION" => Ok(Format::SingleElimination),
            "GROUPS_KNOCKOUT" => Ok(Format::GroupsKnockout),
            other => Err(EngineError::Invariant(format!("unknown format {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated,
    /// Another transaction already claimed generation.
    AlreadyGenerated,
    /// Fewer than two confirmed pairings; nothing to schedule.
    NotEnoughParticipants,
    /// Registration is still open or the event is cancelled.
    NotReady,
}

/// Builds stages and matches from the confirmed pairings of one
/// event+category. Exactly-once per config: the first transaction to stamp
/// `generated_at` wins; `force` wipes and rebuilds with a fresh audit line.
#[derive(Clone)]
pub struct GenerationService {
    state: AppState,
}

impl GenerationService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn generate(
        &self,
        event_id: Uuid,
        category_id: Option<Uuid>,
        force: bool,
    ) -> Result<GenerationOutcome, AppError> {
        let now = Utc::now();
        let mut tx = self.state.db.begin().await?;

        let config = events::get_config_tx(&mut *tx, event_id, category_id)
            .await?
            .ok_or(EngineError::NotFound)?;
        let format = Format::parse(&config.format)?;

        let event = events::get_tx(&mut *tx, event_id)
            .await?
            .ok_or(EngineError::NotFound)?;
        if !force && !draw_ready(&event, now) {
            return Ok(GenerationOutcome::NotReady);
        }

        let participants = pairings::confirmed_ids(&mut *tx, event_id, category_id).await?;
        if let Some(outcome) = preflight(config.generated_at, participants.len(), force) {
            // Transaction dropped unwritten: an under-subscribed category
            // stays generatable once more pairings confirm.
            return Ok(outcome);
        }

        if force {
            structures::delete_structure(&mut *tx, event_id, category_id).await?;
            events::restamp_generation(&mut *tx, config.id, now).await?;
        } else if !events::claim_generation(&mut *tx, config.id, now).await? {
            return Ok(GenerationOutcome::AlreadyGenerated);
        }

        let seed = draw::draw_seed(event_id, category_id, &participants);
        match format {
            Format::RoundRobin => {
                write_round_robin(&mut tx, event_id, category_id, &participants).await?;
            }
            Format::SingleElimination => {
                write_single_elimination(&mut tx, event_id, category_id, &participants, seed)
                    .await?;
            }
            Format::GroupsKnockout => {
                write_groups_knockout(&mut tx, event_id, category_id, &participants, seed).await?;
            }
        }

        structures::insert_audit(
            &mut *tx,
            event_id,
            category_id,
            format.as_str(),
            seed as i64,
            &json!(participants),
            force,
            now,
        )
        .await?;
        tx.commit().await?;
        info!(%event_id, ?category_id, format = format.as_str(), participants = participants.len(), force, "structure generated");
        Ok(GenerationOutcome::Generated)
    }

    /// Generation pass of the deadline sweep: every config whose registration
    /// window has closed without a structure gets one.
    pub async fn generate_due(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let due = infra::repos::EventRepo::new(self.state.db.clone())
            .list_generation_due(now)
            .await?;
        let mut generated = 0;
        for config in due {
            match self.generate(config.event_id, config.category_id, false).await {
                Ok(GenerationOutcome::Generated) => generated += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(event_id = %config.event_id, error = %e, "scheduled generation failed");
                }
            }
        }
        Ok(generated)
    }
}

/// A draw is ready once the event's registration window is closed (by end
/// timestamp or because the event has started) and the event is not
/// cancelled. `force` bypasses this gate, nothing else does.
fn draw_ready(event: &EventRow, now: DateTime<Utc>) -> bool {
    if event.status == "CANCELLED" {
        return false;
    }
    event.registration_ends_at.is_some_and(|t| t <= now)
        || event.starts_at.is_some_and(|t| t <= now)
}

/// Decide, from the locked config row, whether this run proceeds to write a
/// structure. Both checks run before anything is stamped, so a run that
/// produces no draw leaves `generated_at` unset.
fn preflight(
    generated_at: Option<DateTime<Utc>>,
    participants: usize,
    force: bool,
) -> Option<GenerationOutcome> {
    if !force && generated_at.is_some() {
        return Some(GenerationOutcome::AlreadyGenerated);
    }
    if participants < 2 {
        return Some(GenerationOutcome::NotEnoughParticipants);
    }
    None
}

async fn write_round_robin(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: Uuid,
    category_id: Option<Uuid>,
    participants: &[Uuid],
) -> Result<(), AppError> {
    let stage = StageRow {
        id: Uuid::new_v4(),
        event_id,
        category_id,
        name: "Round robin".into(),
        stage_type: "ROUND_ROBIN".into(),
        position: 0,
    };
    structures::insert_stage(&mut **tx, &stage).await?;
    for (round, matches) in draw::round_robin(participants).iter().enumerate() {
        for &(a, b) in matches {
            let m = StructureMatchRow {
                id: Uuid::new_v4(),
                stage_id: stage.id,
                group_label: None,
                round: round as i32 + 1,
                pairing_a: Some(a),
                pairing_b: Some(b),
                status: SCHEDULED.into(),
            };
            structures::insert_match(&mut **tx, &m).await?;
        }
    }
    Ok(())
}

async fn write_single_elimination(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: Uuid,
    category_id: Option<Uuid>,
    participants: &[Uuid],
    seed: u64,
) -> Result<(), AppError> {
    let stage = StageRow {
        id: Uuid::new_v4(),
        event_id,
        category_id,
        name: "Knockout".into(),
        stage_type: "ELIMINATION".into(),
        position: 0,
    };
    structures::insert_stage(&mut **tx, &stage).await?;
    for (round, matches) in draw::single_elimination(participants, seed).iter().enumerate() {
        for m in matches {
            let row = StructureMatchRow {
                id: Uuid::new_v4(),
                stage_id: stage.id,
                group_label: None,
                round: round as i32 + 1,
                pairing_a: m.a,
                pairing_b: m.b,
                status: SCHEDULED.into(),
            };
            structures::insert_match(&mut **tx, &row).await?;
        }
    }
    Ok(())
}

async fn write_groups_knockout(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: Uuid,
    category_id: Option<Uuid>,
    participants: &[Uuid],
    seed: u64,
) -> Result<(), AppError> {
    let shuffled = draw::seeded_shuffle(participants, seed);
    let group_count = draw::default_group_count(shuffled.len());
    let groups = draw::snake_groups(&shuffled, group_count);

    let group_stage = StageRow {
        id: Uuid::new_v4(),
        event_id,
        category_id,
        name: "Groups".into(),
        stage_type: "GROUPS".into(),
        position: 0,
    };
    structures::insert_stage(&mut **tx, &group_stage).await?;
    for (idx, group) in groups.iter().enumerate() {
        let label = group_label(idx);
        for (round, matches) in draw::round_robin(group).iter().enumerate() {
            for &(a, b) in matches {
                let row = StructureMatchRow {
                    id: Uuid::new_v4(),
                    stage_id: group_stage.id,
                    group_label: Some(label.clone()),
                    round: round as i32 + 1,
                    pairing_a: Some(a),
                    pairing_b: Some(b),
                    status: SCHEDULED.into(),
                };
                structures::insert_match(&mut **tx, &row).await?;
            }
        }
    }

    // Knockout bracket sized for the group winners and runners-up; slots are
    // placeholders until group play resolves.
    let qualifiers = (groups.len() * 2).max(2);
    let ko_stage = StageRow {
        id: Uuid::new_v4(),
        event_id,
        category_id,
        name: "Knockout".into(),
        stage_type: "ELIMINATION".into(),
        position: 1,
    };
    structures::insert_stage(&mut **tx, &ko_stage).await?;
    let mut slots = draw::bracket_size(qualifiers) / 2;
    let mut round = 1;
    while slots >= 1 {
        for _ in 0..slots {
            let row = StructureMatchRow {
                id: Uuid::new_v4(),
                stage_id: ko_stage.id,
                group_label: None,
                round,
                pairing_a: None,
                pairing_b: None,
                status: SCHEDULED.into(),
            };
            structures::insert_match(&mut **tx, &row).await?;
        }
        slots /= 2;
        round += 1;
    }
    Ok(())
}

fn group_label(idx: usize) -> String {
    // A, B, ... Z, AA, AB...
    let mut idx = idx;
    let mut label = String::new();
    loop {
        label.insert(0, (b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn format_text_round_trips() {
        for f in [Format::RoundRobin, Format::SingleElimination, Format::GroupsKnockout] {
            assert_eq!(Format::parse(f.as_str()).unwrap(), f);
        }
        assert!(Format::parse("SWISS").is_err());
    }

    #[test]
    fn group_labels_extend_past_z() {
        assert_eq!(group_label(0), "A");
        assert_eq!(group_label(25), "Z");
        assert_eq!(group_label(26), "AA");
        assert_eq!(group_label(27), "AB");
    }

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
    fn draw_waits_for_the_registration_window() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        assert!(!draw_ready(&event("PUBLISHED"), now));
        assert!(draw_ready(&event("PUBLISHED"), now + Duration::days(5)));
        assert!(!draw_ready(&event("CANCELLED"), now + Duration::days(5)));

        // No explicit window end: the event start closes registration.
        let mut open_ended = event("PUBLISHED");
        open_ended.registration_ends_at = None;
        assert!(!draw_ready(&open_ended, now));
        assert!(draw_ready(&open_ended, now + Duration::days(7)));
    }

    #[test]
    fn under_subscribed_run_stops_before_any_stamp() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        // One confirmed pairing: no draw, and the config stays claimable.
        assert_eq!(
            preflight(None, 1, false),
            Some(GenerationOutcome::NotEnoughParticipants)
        );
        assert_eq!(preflight(None, 0, false), Some(GenerationOutcome::NotEnoughParticipants));
        // A second invocation after the field fills proceeds to the claim.
        assert_eq!(preflight(None, 2, false), None);
        // An already-stamped config reports as such unless forced.
        assert_eq!(
            preflight(Some(now), 4, false),
            Some(GenerationOutcome::AlreadyGenerated)
        );
        assert_eq!(preflight(Some(now), 4, true), None);
        // Forced regeneration still refuses an under-subscribed field.
        assert_eq!(
            preflight(Some(now), 1, true),
            Some(GenerationOutcome::NotEnoughParticipants)
        );
    }
}
