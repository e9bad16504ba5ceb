use async_graphql::{Context, Enum, ErrorExtensions, InputObject, Object, Result};
use uuid::Uuid;

use crate::services::generation_service::{GenerationOutcome, GenerationService};
use crate::services::pairing_service::{CreatePairing, PairingService};
use crate::state::AppState;
use infra::pairing::Actor;

use super::types;

pub struct MutationRoot;

#[derive(InputObject)]
pub struct CreatePairingInput {
    pub event_id: Uuid,
    pub category_id: Option<Uuid>,
    /// The captain. Identity is established upstream of this API.
    pub actor_id: Uuid,
    pub payment_mode: types::PaymentMode,
    pub join_mode: types::JoinMode,
    /// Whether the captain's share was already captured at checkout.
    #[graphql(default = false)]
    pub captain_paid: bool,
    pub invited_user_id: Option<Uuid>,
    pub invited_contact: Option<String>,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GenerationResult {
    Generated,
    AlreadyGenerated,
    NotEnoughParticipants,
    NotReady,
}

impl From<GenerationOutcome> for GenerationResult {
    fn from(o: GenerationOutcome) -> Self {
        match o {
            GenerationOutcome::Generated => GenerationResult::Generated,
            GenerationOutcome::AlreadyGenerated => GenerationResult::AlreadyGenerated,
            GenerationOutcome::NotEnoughParticipants => GenerationResult::NotEnoughParticipants,
            GenerationOutcome::NotReady => GenerationResult::NotReady,
        }
    }
}

#[Object]
impl MutationRoot {
    async fn create_pairing(
        &self,
        ctx: &Context<'_>,
        input: CreatePairingInput,
    ) -> Result<types::Pairing> {
        let state = ctx.data::<AppState>()?;
        let pairing = PairingService::new(state.clone())
            .create(CreatePairing {
                event_id: input.event_id,
                category_id: input.category_id,
                creator: input.actor_id,
                payment_mode: input.payment_mode.into(),
                join_mode: input.join_mode.into(),
                captain_paid: input.captain_paid,
                invited_user: input.invited_user_id,
                invited_contact: input.invited_contact,
            })
            .await
            .map_err(|e| e.extend())?;
        Ok((&pairing).into())
    }

    async fn accept_invite(
        &self,
        ctx: &Context<'_>,
        token: Uuid,
        actor_id: Uuid,
    ) -> Result<types::Pairing> {
        let state = ctx.data::<AppState>()?;
        let pairing = PairingService::new(state.clone())
            .accept_invite(token, actor_id)
            .await
            .map_err(|e| e.extend())?;
        Ok((&pairing).into())
    }

    async fn join_open_pairing(
        &self,
        ctx: &Context<'_>,
        pairing_id: Uuid,
        actor_id: Uuid,
    ) -> Result<types::Pairing> {
        let state = ctx.data::<AppState>()?;
        let pairing = PairingService::new(state.clone())
            .join_open(pairing_id, actor_id)
            .await
            .map_err(|e| e.extend())?;
        Ok((&pairing).into())
    }

    /// Record a captured payment for one seat. Safe to retry.
    async fn capture_payment(
        &self,
        ctx: &Context<'_>,
        pairing_id: Uuid,
        role: types::SlotRole,
    ) -> Result<types::Pairing> {
        let state = ctx.data::<AppState>()?;
        let pairing = PairingService::new(state.clone())
            .capture_payment(pairing_id, role.into())
            .await
            .map_err(|e| e.extend())?;
        Ok((&pairing).into())
    }

    async fn reopen_pairing(
        &self,
        ctx: &Context<'_>,
        pairing_id: Uuid,
        mode: types::JoinMode,
        actor_id: Uuid,
        #[graphql(default = false)] as_staff: bool,
    ) -> Result<types::Pairing> {
        let state = ctx.data::<AppState>()?;
        let actor = Actor { user_id: actor_id, staff: as_staff };
        let pairing = PairingService::new(state.clone())
            .reopen(pairing_id, mode.into(), actor)
            .await
            .map_err(|e| e.extend())?;
        Ok((&pairing).into())
    }

    async fn cancel_pairing(
        &self,
        ctx: &Context<'_>,
        pairing_id: Uuid,
        actor_id: Uuid,
        #[graphql(default = false)] as_staff: bool,
    ) -> Result<types::Pairing> {
        let state = ctx.data::<AppState>()?;
        let actor = Actor { user_id: actor_id, staff: as_staff };
        let pairing = PairingService::new(state.clone())
            .cancel(pairing_id, actor)
            .await
            .map_err(|e| e.extend())?;
        Ok((&pairing).into())
    }

    /// Build the tournament structure for one event+category. First caller
    /// wins; `force` wipes and regenerates.
    async fn generate_structure(
        &self,
        ctx: &Context<'_>,
        event_id: Uuid,
        category_id: Option<Uuid>,
        #[graphql(default = false)] force: bool,
    ) -> Result<GenerationResult> {
        let state = ctx.data::<AppState>()?;
        let outcome = GenerationService::new(state.clone())
            .generate(event_id, category_id, force)
            .await
            .map_err(|e| e.extend())?;
        Ok(outcome.into())
    }
}
