use serde_json::Value;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo seeds: one approval request at each workflow stage, plus
/// the aggregates they reference.
const SEED_REQUESTS: &[SeedRequestContract] = &[
    SeedRequestContract {
        request_id: "apr-demo-001",
        approval_type: "motorcycle_price_change",
        entity_type: "motorcycle",
        entity_id: Some("moto-demo-001"),
        status: "pending_sales",
        requested_by: "rep-julia",
        has_original_snapshot: true,
        description: "price change awaiting sales review",
    },
    SeedRequestContract {
        request_id: "apr-demo-002",
        approval_type: "sales_contract",
        entity_type: "contract",
        entity_id: None,
        status: "pending_admin",
        requested_by: "rep-marco",
        has_original_snapshot: false,
        description: "sales contract awaiting final approval",
    },
    SeedRequestContract {
        request_id: "apr-demo-003",
        approval_type: "repair_edit",
        entity_type: "repair",
        entity_id: Some("rep-demo-001"),
        status: "rejected",
        requested_by: "rep-julia",
        has_original_snapshot: true,
        description: "repair scope change rejected at sales review",
    },
];

const SEED_MOTORCYCLE_IDS: &[&str] = &["moto-demo-001", "moto-demo-002", "moto-demo-003"];
const SEED_CONTRACT_IDS: &[&str] = &["con-demo-001"];
const SEED_REPAIR_IDS: &[&str] = &["rep-demo-001"];

/// Demo dataset for local runs and end-to-end checks.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo dataset.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let requests_seeded = SEED_REQUESTS
            .iter()
            .map(|request| RequestSeedInfo {
                request_id: request.request_id,
                status: request.status,
                description: request.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { requests_seeded })
    }

    /// Verify that the seeded rows exist and match the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_motorcycles = sql_array_from_ids(SEED_MOTORCYCLE_IDS);
        let motorcycle_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM motorcycle WHERE id IN {quoted_motorcycles}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("motorcycles", motorcycle_count == SEED_MOTORCYCLE_IDS.len() as i64));

        let contract_exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM contract WHERE id = 'con-demo-001' AND kind = 'purchase')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("purchase-contract", contract_exists == 1));

        let repair_exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM repair WHERE id = 'rep-demo-001' AND status = 'pending')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("pending-repair", repair_exists == 1));

        for request in SEED_REQUESTS {
            let request_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM approval_request
                 WHERE id = ?1 AND approval_type = ?2 AND entity_type = ?3
                   AND status = ?4 AND requested_by = ?5)",
            )
            .bind(request.request_id)
            .bind(request.approval_type)
            .bind(request.entity_type)
            .bind(request.status)
            .bind(request.requested_by)
            .fetch_one(pool)
            .await?;
            checks.push((request.request_id, request_ok == 1));

            checks.push((
                request.snapshot_label(),
                Self::verify_original_snapshot(pool, request).await?,
            ));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// The pending requests carry a snapshot of the aggregate as it was when
    /// filed; execution later compares it against the live row.
    async fn verify_original_snapshot(
        pool: &DbPool,
        request: &SeedRequestContract,
    ) -> Result<bool, RepositoryError> {
        let original_json: Option<String> =
            sqlx::query_scalar("SELECT original_data FROM approval_request WHERE id = ?1")
                .bind(request.request_id)
                .fetch_one(pool)
                .await?;

        let Some(original_json) = original_json else {
            return Ok(!request.has_original_snapshot);
        };
        if !request.has_original_snapshot {
            return Ok(false);
        }

        let original: Value = serde_json::from_str(&original_json)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        Ok(original.get("id").and_then(Value::as_str) == request.entity_id)
    }

    /// Clean up seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_requests = sql_array_from_ids(
            &SEED_REQUESTS.iter().map(|request| request.request_id).collect::<Vec<_>>(),
        );
        let quoted_repairs = sql_array_from_ids(SEED_REPAIR_IDS);
        let quoted_contracts = sql_array_from_ids(SEED_CONTRACT_IDS);
        let quoted_motorcycles = sql_array_from_ids(SEED_MOTORCYCLE_IDS);

        sqlx::query(&format!("DELETE FROM approval_request WHERE id IN {quoted_requests}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM repair WHERE id IN {quoted_repairs}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM contract WHERE id IN {quoted_contracts}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM motorcycle WHERE id IN {quoted_motorcycles}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedRequestContract {
    request_id: &'static str,
    approval_type: &'static str,
    entity_type: &'static str,
    entity_id: Option<&'static str>,
    status: &'static str,
    requested_by: &'static str,
    has_original_snapshot: bool,
    description: &'static str,
}

impl SeedRequestContract {
    fn snapshot_label(&self) -> &'static str {
        match self.approval_type {
            "motorcycle_price_change" => "price-change-snapshot",
            "sales_contract" => "sales-contract-snapshot",
            _ => "repair-edit-snapshot",
        }
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub requests_seeded: Vec<RequestSeedInfo>,
}

#[derive(Debug)]
pub struct RequestSeedInfo {
    pub request_id: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!DemoSeedDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoSeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = DemoSeedDataset::verify(&pool).await.expect("verify fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.requests_seeded.len(), 3);

        let second = DemoSeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            DemoSeedDataset::verify(&pool).await.expect("re-verify fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.requests_seeded.len(), 3);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn seeded_rows_decode_through_the_repositories() {
        use motodesk_core::domain::approval::{ApprovalStatus, RequestId};
        use crate::repositories::{ApprovalStore, SqlApprovalStore};

        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        DemoSeedDataset::load(&pool).await.expect("load seed fixtures");

        let store = SqlApprovalStore::new(pool.clone());
        let pending_sales = store
            .find_by_id(&RequestId("apr-demo-001".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(pending_sales.status, ApprovalStatus::PendingSales);
        assert!(pending_sales.original_data.is_some());

        let rejected = store
            .find_by_id(&RequestId("apr-demo-003".to_string()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(rejected.status, ApprovalStatus::Rejected);
        assert_eq!(rejected.rejected_by.as_deref(), Some("reviewer-dana"));

        DemoSeedDataset::clean(&pool).await.expect("clean");
        let gone = store
            .find_by_id(&RequestId("apr-demo-001".to_string()))
            .await
            .expect("find after clean");
        assert!(gone.is_none());
    }
}
