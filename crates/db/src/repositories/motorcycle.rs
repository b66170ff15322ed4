use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use motodesk_core::domain::motorcycle::{
    Motorcycle, MotorcycleId, MotorcyclePatch, MotorcycleStatus, NewMotorcycle,
};

use super::{decode_decimal, decode_timestamp, MotorcycleStore, RepositoryError};
use crate::DbPool;

pub struct SqlMotorcycleStore {
    pool: DbPool,
}

impl SqlMotorcycleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_motorcycle(row: &sqlx::sqlite::SqliteRow) -> Result<Motorcycle, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let make: String = row.try_get("make").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let model: String =
        row.try_get("model").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let year: i64 = row.try_get("year").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let vin: String = row.try_get("vin").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let selling_price: String =
        row.try_get("selling_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let purchase_price: Option<String> =
        row.try_get("purchase_price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let status = MotorcycleStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown motorcycle status `{status_str}`")))?;

    Ok(Motorcycle {
        id: MotorcycleId(id),
        make,
        model,
        year: year as i32,
        vin,
        selling_price: decode_decimal(&selling_price)?,
        purchase_price: purchase_price.as_deref().map(decode_decimal).transpose()?,
        status,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

pub(crate) async fn fetch_motorcycle(
    conn: &mut SqliteConnection,
    id: &MotorcycleId,
) -> Result<Option<Motorcycle>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, make, model, year, vin, selling_price, purchase_price, status,
                created_at, updated_at
         FROM motorcycle WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(ref r) => Ok(Some(row_to_motorcycle(r)?)),
        None => Ok(None),
    }
}

pub(crate) async fn insert_motorcycle(
    conn: &mut SqliteConnection,
    id: &MotorcycleId,
    new: &NewMotorcycle,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO motorcycle (id, make, model, year, vin, selling_price, purchase_price,
                                 status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id.0)
    .bind(&new.make)
    .bind(&new.model)
    .bind(new.year)
    .bind(&new.vin)
    .bind(new.selling_price.to_string())
    .bind(new.purchase_price.map(|p| p.to_string()))
    .bind(new.status.as_str())
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Read-merge-write partial update. Returns the updated row, or None when the
/// motorcycle does not exist.
pub(crate) async fn apply_motorcycle_patch(
    conn: &mut SqliteConnection,
    id: &MotorcycleId,
    patch: &MotorcyclePatch,
    now: DateTime<Utc>,
) -> Result<Option<Motorcycle>, RepositoryError> {
    let Some(mut motorcycle) = fetch_motorcycle(conn, id).await? else {
        return Ok(None);
    };

    if let Some(make) = &patch.make {
        motorcycle.make = make.clone();
    }
    if let Some(model) = &patch.model {
        motorcycle.model = model.clone();
    }
    if let Some(year) = patch.year {
        motorcycle.year = year;
    }
    if let Some(vin) = &patch.vin {
        motorcycle.vin = vin.clone();
    }
    if let Some(selling_price) = patch.selling_price {
        motorcycle.selling_price = selling_price;
    }
    if let Some(purchase_price) = patch.purchase_price {
        motorcycle.purchase_price = Some(purchase_price);
    }
    motorcycle.updated_at = now;

    sqlx::query(
        "UPDATE motorcycle
         SET make = ?, model = ?, year = ?, vin = ?, selling_price = ?, purchase_price = ?,
             updated_at = ?
         WHERE id = ?",
    )
    .bind(&motorcycle.make)
    .bind(&motorcycle.model)
    .bind(motorcycle.year)
    .bind(&motorcycle.vin)
    .bind(motorcycle.selling_price.to_string())
    .bind(motorcycle.purchase_price.map(|p| p.to_string()))
    .bind(now.to_rfc3339())
    .bind(&id.0)
    .execute(conn)
    .await?;

    Ok(Some(motorcycle))
}

pub(crate) async fn set_motorcycle_status(
    conn: &mut SqliteConnection,
    id: &MotorcycleId,
    status: MotorcycleStatus,
    now: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE motorcycle SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now.to_rfc3339())
        .bind(&id.0)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl MotorcycleStore for SqlMotorcycleStore {
    async fn create(&self, new: NewMotorcycle) -> Result<Motorcycle, RepositoryError> {
        let id = MotorcycleId(format!("moto-{}", Uuid::new_v4()));
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;
        insert_motorcycle(&mut conn, &id, &new, now).await?;

        Ok(Motorcycle {
            id,
            make: new.make,
            model: new.model,
            year: new.year,
            vin: new.vin,
            selling_price: new.selling_price,
            purchase_price: new.purchase_price,
            status: new.status,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(
        &self,
        id: &MotorcycleId,
        patch: MotorcyclePatch,
    ) -> Result<Option<Motorcycle>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        apply_motorcycle_patch(&mut conn, id, &patch, Utc::now()).await
    }

    async fn delete(&self, id: &MotorcycleId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM motorcycle WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: &MotorcycleId) -> Result<Option<Motorcycle>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_motorcycle(&mut conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use motodesk_core::domain::motorcycle::{
        MotorcycleId, MotorcyclePatch, MotorcycleStatus, NewMotorcycle,
    };

    use super::SqlMotorcycleStore;
    use crate::repositories::MotorcycleStore;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_new() -> NewMotorcycle {
        NewMotorcycle {
            make: "Honda".to_string(),
            model: "CB500F".to_string(),
            year: 2023,
            vin: "MLHPC4660P5200001".to_string(),
            selling_price: Decimal::new(6_499_00, 2),
            purchase_price: Some(Decimal::new(5_100_00, 2)),
            status: MotorcycleStatus::InStock,
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trips_prices() {
        let store = SqlMotorcycleStore::new(setup().await);

        let created = store.create(sample_new()).await.expect("create");
        let found = store.find_by_id(&created.id).await.expect("find").expect("exists");

        assert_eq!(found.selling_price, Decimal::new(6_499_00, 2));
        assert_eq!(found.purchase_price, Some(Decimal::new(5_100_00, 2)));
        assert_eq!(found.status, MotorcycleStatus::InStock);
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields_alone() {
        let store = SqlMotorcycleStore::new(setup().await);
        let created = store.create(sample_new()).await.expect("create");

        let updated = store
            .update(&created.id, MotorcyclePatch::price_only(Decimal::new(5_999_00, 2)))
            .await
            .expect("update")
            .expect("exists");

        assert_eq!(updated.selling_price, Decimal::new(5_999_00, 2));
        assert_eq!(updated.make, "Honda");
        assert_eq!(updated.vin, created.vin);
    }

    #[tokio::test]
    async fn update_of_missing_row_returns_none() {
        let store = SqlMotorcycleStore::new(setup().await);

        let missing = store
            .update(
                &MotorcycleId("moto-missing".to_string()),
                MotorcyclePatch::price_only(Decimal::ONE),
            )
            .await
            .expect("update");

        assert!(missing.is_none());
    }
}
