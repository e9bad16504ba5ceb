use crate::{
    db::Db,
    models::{PairingRow, PairingSlotRow},
    pagination::LimitOffset,
    pairing::Pairing,
};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Result as SqlxResult};
use uuid::Uuid;

const PAIRING_COLUMNS: &str = r#"
    id, event_id, category_id, created_by, payment_mode, join_mode, status,
    is_public_open, deadline_at, grace_until, guarantee_status,
    invite_token, invite_expires_at, invite_used_at,
    partner_accepted_at, partner_paid_at, created_at, updated_at
"#;

const SLOT_COLUMNS: &str = r#"
    id, pairing_id, slot_role, slot_status, payment_status,
    profile_id, invited_user_id, invited_contact, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PairingRepo {
    pool: Db,
}

impl PairingRepo {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> SqlxResult<Option<(PairingRow, Vec<PairingSlotRow>)>> {
        let row = sqlx::query_as::<_, PairingRow>(&format!(
            "SELECT {PAIRING_COLUMNS} FROM padel_pairings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };
        let slots = sqlx::query_as::<_, PairingSlotRow>(&format!(
            "SELECT {SLOT_COLUMNS} FROM padel_pairing_slots WHERE pairing_id = $1 ORDER BY slot_role"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some((row, slots)))
    }

    pub async fn get_by_invite_token(
        &self,
        token: Uuid,
    ) -> SqlxResult<Option<(PairingRow, Vec<PairingSlotRow>)>> {
        let row = sqlx::query_as::<_, PairingRow>(&format!(
            "SELECT {PAIRING_COLUMNS} FROM padel_pairings WHERE invite_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };
        let slots = sqlx::query_as::<_, PairingSlotRow>(&format!(
            "SELECT {SLOT_COLUMNS} FROM padel_pairing_slots WHERE pairing_id = $1 ORDER BY slot_role"
        ))
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some((row, slots)))
    }

    /// Publicly discoverable pairings still looking for a partner.
    pub async fn list_open(
        &self,
        event_id: Uuid,
        category_id: Option<Uuid>,
        page: Option<LimitOffset>,
    ) -> SqlxResult<Vec<PairingRow>> {
        let p = page.unwrap_or_default();
        sqlx::query_as::<_, PairingRow>(&format!(
            r#"
            SELECT {PAIRING_COLUMNS}
            FROM padel_pairings
            WHERE event_id = $1
              AND ($2::uuid IS NULL OR category_id = $2)
              AND is_public_open
              AND status = 'INCOMPLETE'
            ORDER BY created_at ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(event_id)
        .bind(category_id)
        .bind(p.limit)
        .bind(p.offset)
        .fetch_all(&self.pool)
        .await
    }
}

/// Load and row-lock a pairing with its slots inside an open transaction.
/// Every pairing mutation goes through this lock so concurrent joins and
/// captures serialize on the row.
pub async fn lock(
    conn: &mut PgConnection,
    id: Uuid,
) -> SqlxResult<Option<(PairingRow, Vec<PairingSlotRow>)>> {
    let row = sqlx::query_as::<_, PairingRow>(&format!(
        "SELECT {PAIRING_COLUMNS} FROM padel_pairings WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else { return Ok(None) };
    let slots = sqlx::query_as::<_, PairingSlotRow>(&format!(
        "SELECT {SLOT_COLUMNS} FROM padel_pairing_slots WHERE pairing_id = $1 ORDER BY slot_role FOR UPDATE"
    ))
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(Some((row, slots)))
}

pub async fn insert(
    conn: &mut PgConnection,
    pairing: &Pairing,
    now: DateTime<Utc>,
) -> SqlxResult<()> {
    sqlx::query(
        r#"
        INSERT INTO padel_pairings (
            id, event_id, category_id, created_by, payment_mode, join_mode,
            status, is_public_open, deadline_at, grace_until, guarantee_status,
            invite_token, invite_expires_at, invite_used_at,
            partner_accepted_at, partner_paid_at, created_at, updated_at
        )
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$17)
        "#,
    )
    .bind(pairing.id)
    .bind(pairing.event_id)
    .bind(pairing.category_id)
    .bind(pairing.created_by)
    .bind(pairing.payment_mode.as_str())
    .bind(pairing.join_mode.as_str())
    .bind(pairing.status.as_str())
    .bind(pairing.is_public_open)
    .bind(pairing.deadline_at)
    .bind(pairing.grace_until)
    .bind(pairing.guarantee.as_str())
    .bind(pairing.invite_token)
    .bind(pairing.invite_expires_at)
    .bind(pairing.invite_used_at)
    .bind(pairing.partner_accepted_at)
    .bind(pairing.partner_paid_at)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    for slot in pairing.slots() {
        let (profile_id, invited_user_id, invited_contact) =
            PairingSlotRow::occupant_columns(slot);
        sqlx::query(
            r#"
            INSERT INTO padel_pairing_slots (
                id, pairing_id, slot_role, slot_status, payment_status,
                profile_id, invited_user_id, invited_contact, created_at, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(pairing.id)
        .bind(slot.role.as_str())
        .bind(slot.status.as_str())
        .bind(slot.payment.as_str())
        .bind(profile_id)
        .bind(invited_user_id)
        .bind(invited_contact)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Persist a mutated pairing back over the locked rows.
pub async fn update(
    conn: &mut PgConnection,
    pairing: &Pairing,
    now: DateTime<Utc>,
) -> SqlxResult<()> {
    sqlx::query(
        r#"
        UPDATE padel_pairings
        SET payment_mode = $2, join_mode = $3, status = $4, is_public_open = $5,
            deadline_at = $6, grace_until = $7, guarantee_status = $8,
            invite_token = $9, invite_expires_at = $10, invite_used_at = $11,
            partner_accepted_at = $12, partner_paid_at = $13, updated_at = $14
        WHERE id = $1
        "#,
    )
    .bind(pairing.id)
    .bind(pairing.payment_mode.as_str())
    .bind(pairing.join_mode.as_str())
    .bind(pairing.status.as_str())
    .bind(pairing.is_public_open)
    .bind(pairing.deadline_at)
    .bind(pairing.grace_until)
    .bind(pairing.guarantee.as_str())
    .bind(pairing.invite_token)
    .bind(pairing.invite_expires_at)
    .bind(pairing.invite_used_at)
    .bind(pairing.partner_accepted_at)
    .bind(pairing.partner_paid_at)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    for slot in pairing.slots() {
        let (profile_id, invited_user_id, invited_contact) =
            PairingSlotRow::occupant_columns(slot);
        sqlx::query(
            r#"
            UPDATE padel_pairing_slots
            SET slot_status = $3, payment_status = $4,
                profile_id = $5, invited_user_id = $6, invited_contact = $7,
                updated_at = $8
            WHERE pairing_id = $1 AND slot_role = $2
            "#,
        )
        .bind(pairing.id)
        .bind(slot.role.as_str())
        .bind(slot.status.as_str())
        .bind(slot.payment.as_str())
        .bind(profile_id)
        .bind(invited_user_id)
        .bind(invited_contact)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Confirmed pairing ids for one event+category, in creation order; the
/// participant set handed to structure generation.
pub async fn confirmed_ids(
    conn: &mut PgConnection,
    event_id: Uuid,
    category_id: Option<Uuid>,
) -> SqlxResult<Vec<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id FROM padel_pairings
        WHERE event_id = $1
          AND ($2::uuid IS NULL AND category_id IS NULL OR category_id = $2)
          AND status = 'CONFIRMED'
        ORDER BY created_at ASC
        "#,
    )
    .bind(event_id)
    .bind(category_id)
    .fetch_all(&mut *conn)
    .await
}
