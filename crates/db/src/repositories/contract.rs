use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use motodesk_core::domain::contract::{
    Contract, ContractId, ContractKind, ContractPatch, NewContract,
};
use motodesk_core::domain::motorcycle::MotorcycleId;

use super::{decode_date, decode_decimal, decode_timestamp, ContractStore, RepositoryError};
use crate::DbPool;

pub struct SqlContractStore {
    pool: DbPool,
}

impl SqlContractStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_contract(row: &sqlx::sqlite::SqliteRow) -> Result<Contract, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind_str: String =
        row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let motorcycle_id: String =
        row.try_get("motorcycle_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let party: String =
        row.try_get("party").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let signed_on: Option<String> =
        row.try_get("signed_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let kind = ContractKind::parse(&kind_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown contract kind `{kind_str}`")))?;

    Ok(Contract {
        id: ContractId(id),
        kind,
        motorcycle_id: MotorcycleId(motorcycle_id),
        party,
        amount: decode_decimal(&amount)?,
        signed_on: signed_on.as_deref().map(decode_date).transpose()?,
        notes,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

pub(crate) async fn fetch_contract(
    conn: &mut SqliteConnection,
    id: &ContractId,
) -> Result<Option<Contract>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, kind, motorcycle_id, party, amount, signed_on, notes,
                created_at, updated_at
         FROM contract WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(ref r) => Ok(Some(row_to_contract(r)?)),
        None => Ok(None),
    }
}

pub(crate) async fn insert_contract(
    conn: &mut SqliteConnection,
    id: &ContractId,
    kind: ContractKind,
    new: &NewContract,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO contract (id, kind, motorcycle_id, party, amount, signed_on, notes,
                               created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id.0)
    .bind(kind.as_str())
    .bind(&new.motorcycle_id.0)
    .bind(&new.party)
    .bind(new.amount.to_string())
    .bind(new.signed_on.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&new.notes)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn apply_contract_patch(
    conn: &mut SqliteConnection,
    id: &ContractId,
    patch: &ContractPatch,
    now: DateTime<Utc>,
) -> Result<Option<Contract>, RepositoryError> {
    let Some(mut contract) = fetch_contract(conn, id).await? else {
        return Ok(None);
    };

    if let Some(party) = &patch.party {
        contract.party = party.clone();
    }
    if let Some(amount) = patch.amount {
        contract.amount = amount;
    }
    if let Some(signed_on) = patch.signed_on {
        contract.signed_on = Some(signed_on);
    }
    if let Some(notes) = &patch.notes {
        contract.notes = Some(notes.clone());
    }
    contract.updated_at = now;

    sqlx::query(
        "UPDATE contract
         SET party = ?, amount = ?, signed_on = ?, notes = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&contract.party)
    .bind(contract.amount.to_string())
    .bind(contract.signed_on.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&contract.notes)
    .bind(now.to_rfc3339())
    .bind(&id.0)
    .execute(conn)
    .await?;

    Ok(Some(contract))
}

pub(crate) async fn delete_contract(
    conn: &mut SqliteConnection,
    id: &ContractId,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM contract WHERE id = ?").bind(&id.0).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) fn new_contract_id() -> ContractId {
    ContractId(format!("con-{}", Uuid::new_v4()))
}

#[async_trait]
impl ContractStore for SqlContractStore {
    async fn create(
        &self,
        kind: ContractKind,
        new: NewContract,
    ) -> Result<Contract, RepositoryError> {
        let id = new_contract_id();
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;
        insert_contract(&mut conn, &id, kind, &new, now).await?;

        Ok(Contract {
            id,
            kind,
            motorcycle_id: new.motorcycle_id,
            party: new.party,
            amount: new.amount,
            signed_on: new.signed_on,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(
        &self,
        id: &ContractId,
        patch: ContractPatch,
    ) -> Result<Option<Contract>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        apply_contract_patch(&mut conn, id, &patch, Utc::now()).await
    }

    async fn delete(&self, id: &ContractId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        delete_contract(&mut conn, id).await
    }

    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_contract(&mut conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use motodesk_core::domain::contract::{ContractKind, ContractPatch, NewContract};
    use motodesk_core::domain::motorcycle::{MotorcycleStatus, NewMotorcycle};

    use super::SqlContractStore;
    use crate::repositories::{ContractStore, MotorcycleStore, SqlMotorcycleStore};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    /// Insert a parent motorcycle so that FK constraints are satisfied.
    async fn insert_motorcycle(pool: &sqlx::SqlitePool) -> String {
        let store = SqlMotorcycleStore::new(pool.clone());
        let created = store
            .create(NewMotorcycle {
                make: "Yamaha".to_string(),
                model: "MT-07".to_string(),
                year: 2022,
                vin: "JYARM06E8NA000001".to_string(),
                selling_price: Decimal::new(7_899_00, 2),
                purchase_price: None,
                status: MotorcycleStatus::InStock,
            })
            .await
            .expect("insert parent motorcycle");
        created.id.0
    }

    #[tokio::test]
    async fn create_and_find_round_trips_signed_date() {
        let pool = setup().await;
        let motorcycle_id = insert_motorcycle(&pool).await;
        let store = SqlContractStore::new(pool);

        let created = store
            .create(
                ContractKind::Sales,
                NewContract {
                    motorcycle_id: motodesk_core::domain::motorcycle::MotorcycleId(motorcycle_id),
                    party: "cust-42".to_string(),
                    amount: Decimal::new(7_500_00, 2),
                    signed_on: NaiveDate::from_ymd_opt(2026, 3, 14),
                    notes: Some("cash sale".to_string()),
                },
            )
            .await
            .expect("create");

        let found = store.find_by_id(&created.id).await.expect("find").expect("exists");
        assert_eq!(found.kind, ContractKind::Sales);
        assert_eq!(found.signed_on, NaiveDate::from_ymd_opt(2026, 3, 14));
        assert_eq!(found.amount, Decimal::new(7_500_00, 2));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let pool = setup().await;
        let motorcycle_id = insert_motorcycle(&pool).await;
        let store = SqlContractStore::new(pool);

        let created = store
            .create(
                ContractKind::Purchase,
                NewContract {
                    motorcycle_id: motodesk_core::domain::motorcycle::MotorcycleId(motorcycle_id),
                    party: "supplier-9".to_string(),
                    amount: Decimal::new(5_000_00, 2),
                    signed_on: None,
                    notes: None,
                },
            )
            .await
            .expect("create");

        assert!(store.delete(&created.id).await.expect("delete"));
        assert!(!store.delete(&created.id).await.expect("second delete"));
        assert!(store.find_by_id(&created.id).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn patch_updates_only_named_fields() {
        let pool = setup().await;
        let motorcycle_id = insert_motorcycle(&pool).await;
        let store = SqlContractStore::new(pool);

        let created = store
            .create(
                ContractKind::Sales,
                NewContract {
                    motorcycle_id: motodesk_core::domain::motorcycle::MotorcycleId(motorcycle_id),
                    party: "cust-42".to_string(),
                    amount: Decimal::new(7_500_00, 2),
                    signed_on: None,
                    notes: None,
                },
            )
            .await
            .expect("create");

        let updated = store
            .update(
                &created.id,
                ContractPatch { amount: Some(Decimal::new(7_200_00, 2)), ..Default::default() },
            )
            .await
            .expect("update")
            .expect("exists");

        assert_eq!(updated.amount, Decimal::new(7_200_00, 2));
        assert_eq!(updated.party, "cust-42");
    }
}
