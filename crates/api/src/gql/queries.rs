use async_graphql::{Context, ErrorExtensions, Object, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use infra::pagination::LimitOffset;
use infra::registration::{self, RegistrationStatus};
use infra::repos::{EntryRepo, EventRepo, PairingRepo, RegistrationRepo, StructureRepo};
use infra::score::{self, ScoreRules};

use super::types;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Current server time (UTC).
    async fn server_time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn pairing(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<types::Pairing>> {
        let state = ctx.data::<AppState>()?;
        let repo = PairingRepo::new(state.db.clone());
        let Some((row, slots)) = repo.get(id).await.map_err(|e| AppError::from(e).extend())? else {
            return Ok(None);
        };
        let pairing = row.to_domain(&slots).map_err(|e| AppError::from(e).extend())?;
        Ok(Some((&pairing).into()))
    }

    /// Resolve an invite link without consuming it, so the invitee can see
    /// what they are joining.
    async fn pairing_by_invite(
        &self,
        ctx: &Context<'_>,
        token: Uuid,
    ) -> Result<Option<types::Pairing>> {
        let state = ctx.data::<AppState>()?;
        let repo = PairingRepo::new(state.db.clone());
        let Some((row, slots)) = repo.get_by_invite_token(token).await.map_err(|e| AppError::from(e).extend())?
        else {
            return Ok(None);
        };
        let pairing = row.to_domain(&slots).map_err(|e| AppError::from(e).extend())?;
        Ok(Some((&pairing).into()))
    }

    async fn open_pairings(
        &self,
        ctx: &Context<'_>,
        event_id: Uuid,
        category_id: Option<Uuid>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<types::OpenPairing>> {
        let state = ctx.data::<AppState>()?;
        let repo = PairingRepo::new(state.db.clone());
        let page = Some(LimitOffset::clamped(limit, offset));
        let rows = repo
            .list_open(event_id, category_id, page)
            .await
            .map_err(|e| AppError::from(e).extend())?;
        rows.into_iter()
            .map(|r| {
                let payment_mode =
                    infra::pairing::PaymentMode::parse(&r.payment_mode).map_err(|e| AppError::from(e).extend())?;
                Ok(types::OpenPairing {
                    id: r.id.into(),
                    event_id: r.event_id.into(),
                    category_id: r.category_id.map(Into::into),
                    created_by: r.created_by.into(),
                    payment_mode: payment_mode.into(),
                    deadline_at: r.deadline_at,
                    created_at: r.created_at,
                })
            })
            .collect()
    }

    async fn registration(
        &self,
        ctx: &Context<'_>,
        pairing_id: Uuid,
    ) -> Result<Option<types::Registration>> {
        let state = ctx.data::<AppState>()?;
        let repo = RegistrationRepo::new(state.db.clone());
        let Some(row) = repo.get_by_pairing(pairing_id).await.map_err(|e| AppError::from(e).extend())? else {
            return Ok(None);
        };
        registration_view(row).map(Some)
    }

    async fn registrations(
        &self,
        ctx: &Context<'_>,
        event_id: Uuid,
        status: Option<types::RegistrationStatusGql>,
    ) -> Result<Vec<types::Registration>> {
        let state = ctx.data::<AppState>()?;
        let repo = RegistrationRepo::new(state.db.clone());
        let filter = status.map(registration_status_from_gql);
        let rows = repo
            .list_for_event(event_id, filter)
            .await
            .map_err(|e| AppError::from(e).extend())?;
        rows.into_iter().map(registration_view).collect()
    }

    async fn entries(&self, ctx: &Context<'_>, event_id: Uuid) -> Result<Vec<types::Entry>> {
        let state = ctx.data::<AppState>()?;
        let repo = EntryRepo::new(state.db.clone());
        let rows = repo.list_for_event(event_id).await.map_err(|e| AppError::from(e).extend())?;
        Ok(rows
            .into_iter()
            .map(|r| types::Entry {
                id: r.id.into(),
                event_id: r.event_id.into(),
                category_id: r.category_id.map(Into::into),
                user_id: r.user_id.into(),
                pairing_id: r.pairing_id.into(),
            })
            .collect())
    }

    /// The generated stages and matches for one event+category.
    async fn structure(
        &self,
        ctx: &Context<'_>,
        event_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<Vec<types::Stage>> {
        let state = ctx.data::<AppState>()?;
        let repo = StructureRepo::new(state.db.clone());
        let stages = repo
            .list_stages(event_id, category_id)
            .await
            .map_err(|e| AppError::from(e).extend())?;
        let mut out = Vec::with_capacity(stages.len());
        for stage in stages {
            let matches = repo.list_matches(stage.id).await.map_err(|e| AppError::from(e).extend())?;
            out.push(types::Stage {
                id: stage.id.into(),
                name: stage.name,
                stage_type: stage.stage_type,
                position: stage.position,
                matches: matches
                    .into_iter()
                    .map(|m| types::StructureMatch {
                        id: m.id.into(),
                        group_label: m.group_label,
                        round: m.round,
                        pairing_a: m.pairing_a.map(Into::into),
                        pairing_b: m.pairing_b.map(Into::into),
                        status: m.status,
                    })
                    .collect(),
            });
        }
        Ok(out)
    }

    async fn generation_audit(
        &self,
        ctx: &Context<'_>,
        event_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<Option<types::GenerationAudit>> {
        let state = ctx.data::<AppState>()?;
        let repo = StructureRepo::new(state.db.clone());
        let Some(row) = repo
            .last_audit(event_id, category_id)
            .await
            .map_err(|e| AppError::from(e).extend())?
        else {
            return Ok(None);
        };
        let participants = row
            .participants
            .as_array()
            .map(|a| a.len() as i32)
            .unwrap_or(0);
        Ok(Some(types::GenerationAudit {
            format: row.format,
            seed: row.seed.to_string(),
            participants,
            forced: row.forced,
            created_at: row.created_at,
        }))
    }

    /// Score a recorded set list under the event's configured rules. Returns
    /// null while the scoreline is still undecided.
    async fn match_stats(
        &self,
        ctx: &Context<'_>,
        event_id: Uuid,
        category_id: Option<Uuid>,
        sets: Vec<types::SetScoreInput>,
        result_type: Option<types::ResultType>,
        declared_winner: Option<types::Side>,
    ) -> Result<Option<types::MatchStats>> {
        let state = ctx.data::<AppState>()?;
        let config = EventRepo::new(state.db.clone())
            .get_config(event_id, category_id)
            .await
            .map_err(|e| AppError::from(e).extend())?;
        let rules = ScoreRules::from_json(config.as_ref().and_then(|c| c.score_rules.as_ref()));
        let sets: Vec<score::SetScore> = sets.into_iter().map(Into::into).collect();
        let result_type = result_type.map(Into::into).unwrap_or(score::ResultType::Normal);
        let stats =
            score::resolve_match_stats(&sets, result_type, declared_winner.map(Into::into), &rules);
        Ok(stats.map(Into::into))
    }
}

fn registration_view(row: infra::models::RegistrationRow) -> Result<types::Registration> {
    let status = RegistrationStatus::parse(&row.status).map_err(|e| AppError::from(e).extend())?;
    let payment_mode =
        infra::pairing::PaymentMode::parse(&row.payment_mode).map_err(|e| AppError::from(e).extend())?;
    let lifecycle = registration::lifecycle(status, payment_mode);
    Ok(types::Registration {
        pairing_id: row.pairing_id.into(),
        event_id: row.event_id.into(),
        category_id: row.category_id.map(Into::into),
        status: status.into(),
        lifecycle: lifecycle.into(),
        updated_at: row.updated_at,
    })
}

fn registration_status_from_gql(status: types::RegistrationStatusGql) -> RegistrationStatus {
    match status {
        types::RegistrationStatusGql::PendingPartner => RegistrationStatus::PendingPartner,
        types::RegistrationStatusGql::PendingPayment => RegistrationStatus::PendingPayment,
        types::RegistrationStatusGql::Matchmaking => RegistrationStatus::Matchmaking,
        types::RegistrationStatusGql::Confirmed => RegistrationStatus::Confirmed,
        types::RegistrationStatusGql::Cancelled => RegistrationStatus::Cancelled,
        types::RegistrationStatusGql::Expired => RegistrationStatus::Expired,
    }
}
