use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use motodesk_core::domain::motorcycle::MotorcycleId;
use motodesk_core::domain::repair::{NewRepair, Repair, RepairId, RepairPatch, RepairStatus};

use super::{decode_decimal, decode_timestamp, RepairStore, RepositoryError};
use crate::DbPool;

pub struct SqlRepairStore {
    pool: DbPool,
}

impl SqlRepairStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_repair(row: &sqlx::sqlite::SqliteRow) -> Result<Repair, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let motorcycle_id: String =
        row.try_get("motorcycle_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let cost: String = row.try_get("cost").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let details_registered: i64 =
        row.try_get("details_registered").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let completed_on: Option<String> =
        row.try_get("completed_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let status = RepairStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown repair status `{status_str}`")))?;

    Ok(Repair {
        id: RepairId(id),
        motorcycle_id: MotorcycleId(motorcycle_id),
        description,
        cost: decode_decimal(&cost)?,
        status,
        details_registered: details_registered != 0,
        completed_on: completed_on.as_deref().map(decode_timestamp).transpose()?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

pub(crate) async fn fetch_repair(
    conn: &mut SqliteConnection,
    id: &RepairId,
) -> Result<Option<Repair>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, motorcycle_id, description, cost, status, details_registered,
                completed_on, created_at, updated_at
         FROM repair WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(ref r) => Ok(Some(row_to_repair(r)?)),
        None => Ok(None),
    }
}

pub(crate) async fn insert_repair(
    conn: &mut SqliteConnection,
    id: &RepairId,
    new: &NewRepair,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO repair (id, motorcycle_id, description, cost, status, details_registered,
                             completed_on, created_at, updated_at)
         VALUES (?, ?, ?, ?, 'pending', 0, NULL, ?, ?)",
    )
    .bind(&id.0)
    .bind(&new.motorcycle_id.0)
    .bind(&new.description)
    .bind(new.cost.to_string())
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn apply_repair_patch(
    conn: &mut SqliteConnection,
    id: &RepairId,
    patch: &RepairPatch,
    now: DateTime<Utc>,
) -> Result<Option<Repair>, RepositoryError> {
    let Some(mut repair) = fetch_repair(conn, id).await? else {
        return Ok(None);
    };

    if let Some(description) = &patch.description {
        repair.description = description.clone();
    }
    if let Some(cost) = patch.cost {
        repair.cost = cost;
    }
    repair.updated_at = now;

    sqlx::query("UPDATE repair SET description = ?, cost = ?, updated_at = ? WHERE id = ?")
        .bind(&repair.description)
        .bind(repair.cost.to_string())
        .bind(now.to_rfc3339())
        .bind(&id.0)
        .execute(conn)
        .await?;

    Ok(Some(repair))
}

/// Patch plus the details-approved flip; the repair becomes ready for
/// completion but keeps its completion date unset.
pub(crate) async fn approve_repair_details(
    conn: &mut SqliteConnection,
    id: &RepairId,
    patch: &RepairPatch,
    now: DateTime<Utc>,
) -> Result<Option<Repair>, RepositoryError> {
    let Some(mut repair) = apply_repair_patch(conn, id, patch, now).await? else {
        return Ok(None);
    };

    sqlx::query(
        "UPDATE repair SET status = 'details_approved', details_registered = 1, updated_at = ?
         WHERE id = ?",
    )
    .bind(now.to_rfc3339())
    .bind(&id.0)
    .execute(conn)
    .await?;

    repair.status = RepairStatus::DetailsApproved;
    repair.details_registered = true;
    Ok(Some(repair))
}

pub(crate) async fn complete_repair(
    conn: &mut SqliteConnection,
    id: &RepairId,
    now: DateTime<Utc>,
) -> Result<Option<Repair>, RepositoryError> {
    let result = sqlx::query(
        "UPDATE repair SET status = 'completed', completed_on = ?, updated_at = ? WHERE id = ?",
    )
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(&id.0)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_repair(conn, id).await
}

pub(crate) fn new_repair_id() -> RepairId {
    RepairId(format!("rep-{}", Uuid::new_v4()))
}

#[async_trait]
impl RepairStore for SqlRepairStore {
    async fn create(&self, new: NewRepair) -> Result<Repair, RepositoryError> {
        let id = new_repair_id();
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;
        insert_repair(&mut conn, &id, &new, now).await?;

        Ok(Repair {
            id,
            motorcycle_id: new.motorcycle_id,
            description: new.description,
            cost: new.cost,
            status: RepairStatus::Pending,
            details_registered: false,
            completed_on: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(
        &self,
        id: &RepairId,
        patch: RepairPatch,
    ) -> Result<Option<Repair>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        apply_repair_patch(&mut conn, id, &patch, Utc::now()).await
    }

    async fn delete(&self, id: &RepairId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM repair WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: &RepairId) -> Result<Option<Repair>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_repair(&mut conn, id).await
    }
}
