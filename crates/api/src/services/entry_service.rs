use chrono::{DateTime, Utc};
use infra::pairing::Pairing;
use infra::registration::RegistrationStatus;
use infra::repos::entries;
use sqlx::PgConnection;
use tracing::debug;

/// Keep the per-player entry table in step with the registration projection,
/// inside the same transaction that moved it. A confirmed pairing owns one
/// entry per occupied seat; any other status owns none.
pub async fn sync(
    conn: &mut PgConnection,
    pairing: &Pairing,
    status: RegistrationStatus,
    now: DateTime<Utc>,
) -> sqlx::Result<()> {
    if status == RegistrationStatus::Confirmed {
        entries::upsert_for_pairing(conn, pairing, now).await?;
        debug!(pairing_id = %pairing.id, "entries materialized");
    } else {
        let removed = entries::delete_for_pairing(conn, pairing.id).await?;
        if removed > 0 {
            debug!(pairing_id = %pairing.id, removed, "entries withdrawn");
        }
    }
    Ok(())
}
