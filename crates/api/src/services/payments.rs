use async_trait::async_trait;
use infra::pairing::SlotRole;
use tracing::info;
use uuid::Uuid;

/// Seam to the payment provider. Capture confirmations arrive through this
/// trait; the engine only records their outcome. Refunds are fire-and-forget
/// from the engine's point of view: a failed refund is logged and retried by
/// the provider-side reconciliation, never by rolling back pairing state.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn refund_seat(&self, pairing_id: Uuid, role: SlotRole) -> anyhow::Result<()>;

    /// Forfeit a consumed split guarantee (the deposit is kept).
    async fn forfeit_guarantee(&self, pairing_id: Uuid) -> anyhow::Result<()>;
}

/// Default gateway for environments without a provider wired up.
pub struct LogOnlyGateway;

#[async_trait]
impl PaymentGateway for LogOnlyGateway {
    async fn refund_seat(&self, pairing_id: Uuid, role: SlotRole) -> anyhow::Result<()> {
        info!(%pairing_id, role = role.as_str(), "refund requested");
        Ok(())
    }

    async fn forfeit_guarantee(&self, pairing_id: Uuid) -> anyhow::Result<()> {
        info!(%pairing_id, "split guarantee forfeited");
        Ok(())
    }
}
