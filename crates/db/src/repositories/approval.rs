use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

use motodesk_core::domain::approval::{
    ApprovalRequest, ApprovalStatus, ApprovalType, Priority, RequestId,
};
use motodesk_core::domain::change::ProposedChange;

use super::{decode_timestamp, ApprovalFilter, ApprovalStore, RepositoryError};
use crate::DbPool;

const REQUEST_COLUMNS: &str = "id, approval_type, entity_id, proposed_data, original_data, status,
        requested_by, priority, description, notes,
        sales_approved_by, sales_approved_at, sales_comments,
        admin_approved_by, admin_approved_at, admin_comments,
        rejected_by, rejected_at, rejection_reason,
        last_error, execution_attempts, created_at, updated_at";

pub struct SqlApprovalStore {
    pool: DbPool,
}

impl SqlApprovalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn get_text(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn get_opt_text(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Option<String>, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalRequest, RepositoryError> {
    let approval_type_str = get_text(row, "approval_type")?;
    let approval_type = ApprovalType::parse(&approval_type_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown approval type `{approval_type_str}`"))
    })?;

    let status_str = get_text(row, "status")?;
    let status = ApprovalStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{status_str}`")))?;

    let priority_str = get_text(row, "priority")?;
    let priority = Priority::parse(&priority_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown priority `{priority_str}`")))?;

    let proposed_json = get_text(row, "proposed_data")?;
    let proposed: ProposedChange = serde_json::from_str(&proposed_json)
        .map_err(|e| RepositoryError::Decode(format!("bad proposed_data: {e}")))?;

    let original_data = get_opt_text(row, "original_data")?
        .map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| RepositoryError::Decode(format!("bad original_data: {e}")))
        })
        .transpose()?;

    let execution_attempts: i64 =
        row.try_get("execution_attempts").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let parse_opt_ts = |column: &str| -> Result<Option<DateTime<Utc>>, RepositoryError> {
        get_opt_text(row, column)?.as_deref().map(decode_timestamp).transpose()
    };

    Ok(ApprovalRequest {
        id: RequestId(get_text(row, "id")?),
        approval_type,
        entity_id: get_opt_text(row, "entity_id")?,
        proposed,
        original_data,
        status,
        requested_by: get_text(row, "requested_by")?,
        priority,
        description: get_text(row, "description")?,
        notes: get_opt_text(row, "notes")?,
        sales_approved_by: get_opt_text(row, "sales_approved_by")?,
        sales_approved_at: parse_opt_ts("sales_approved_at")?,
        sales_comments: get_opt_text(row, "sales_comments")?,
        admin_approved_by: get_opt_text(row, "admin_approved_by")?,
        admin_approved_at: parse_opt_ts("admin_approved_at")?,
        admin_comments: get_opt_text(row, "admin_comments")?,
        rejected_by: get_opt_text(row, "rejected_by")?,
        rejected_at: parse_opt_ts("rejected_at")?,
        rejection_reason: get_opt_text(row, "rejection_reason")?,
        last_error: get_opt_text(row, "last_error")?,
        execution_attempts: execution_attempts as u32,
        created_at: decode_timestamp(&get_text(row, "created_at")?)?,
        updated_at: decode_timestamp(&get_text(row, "updated_at")?)?,
    })
}

pub(crate) async fn fetch_request(
    conn: &mut SqliteConnection,
    id: &RequestId,
) -> Result<Option<ApprovalRequest>, RepositoryError> {
    let row =
        sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM approval_request WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(conn)
            .await?;

    match row {
        Some(ref r) => Ok(Some(row_to_request(r)?)),
        None => Ok(None),
    }
}

pub(crate) async fn insert_request(
    conn: &mut SqliteConnection,
    request: &ApprovalRequest,
) -> Result<(), RepositoryError> {
    let proposed_json = serde_json::to_string(&request.proposed)
        .map_err(|e| RepositoryError::Decode(format!("encode proposed_data: {e}")))?;
    let original_json = request
        .original_data
        .as_ref()
        .map(|value| {
            serde_json::to_string(value)
                .map_err(|e| RepositoryError::Decode(format!("encode original_data: {e}")))
        })
        .transpose()?;

    sqlx::query(
        "INSERT INTO approval_request (id, approval_type, entity_type, entity_id, proposed_data,
                original_data, status, requested_by, priority, description, notes,
                execution_attempts, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&request.id.0)
    .bind(request.approval_type.as_str())
    .bind(request.entity_type().as_str())
    .bind(&request.entity_id)
    .bind(proposed_json)
    .bind(original_json)
    .bind(request.status.as_str())
    .bind(&request.requested_by)
    .bind(request.priority.as_str())
    .bind(&request.description)
    .bind(&request.notes)
    .bind(request.execution_attempts as i64)
    .bind(request.created_at.to_rfc3339())
    .bind(request.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Conditional transition to `pending_admin`. Returns false when the row was
/// not in `pending_sales`, which is how a racing caller loses.
pub(crate) async fn mark_sales_approved(
    conn: &mut SqliteConnection,
    id: &RequestId,
    reviewer: &str,
    comments: Option<&str>,
    now: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE approval_request
         SET status = 'pending_admin', sales_approved_by = ?, sales_approved_at = ?,
             sales_comments = ?, updated_at = ?
         WHERE id = ? AND status = 'pending_sales'",
    )
    .bind(reviewer)
    .bind(now.to_rfc3339())
    .bind(comments)
    .bind(now.to_rfc3339())
    .bind(&id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Conditional transition to `approved`, guarded on `pending_admin`. Run
/// inside the same transaction as the change execution so the two commit or
/// roll back together.
pub(crate) async fn mark_admin_approved(
    conn: &mut SqliteConnection,
    id: &RequestId,
    reviewer: &str,
    comments: Option<&str>,
    now: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE approval_request
         SET status = 'approved', admin_approved_by = ?, admin_approved_at = ?,
             admin_comments = ?, last_error = NULL,
             execution_attempts = execution_attempts + 1, updated_at = ?
         WHERE id = ? AND status = 'pending_admin'",
    )
    .bind(reviewer)
    .bind(now.to_rfc3339())
    .bind(comments)
    .bind(now.to_rfc3339())
    .bind(&id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Conditional transition to `rejected` from the expected current status.
pub(crate) async fn mark_rejected(
    conn: &mut SqliteConnection,
    id: &RequestId,
    expected: ApprovalStatus,
    reviewer: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE approval_request
         SET status = 'rejected', rejected_by = ?, rejected_at = ?, rejection_reason = ?,
             updated_at = ?
         WHERE id = ? AND status = ?",
    )
    .bind(reviewer)
    .bind(now.to_rfc3339())
    .bind(reason)
    .bind(now.to_rfc3339())
    .bind(&id.0)
    .bind(expected.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Bookkeeping after a rolled-back execution: the request stays in
/// `pending_admin` with the error attached for operator inspection.
pub(crate) async fn record_execution_failure(
    pool: &DbPool,
    id: &RequestId,
    error: &str,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE approval_request
         SET last_error = ?, execution_attempts = execution_attempts + 1, updated_at = ?
         WHERE id = ?",
    )
    .bind(error)
    .bind(now.to_rfc3339())
    .bind(&id.0)
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait]
impl ApprovalStore for SqlApprovalStore {
    async fn insert(&self, request: ApprovalRequest) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_request(&mut conn, &request).await
    }

    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_request(&mut conn, id).await
    }

    async fn list(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let mut sql = format!("SELECT {REQUEST_COLUMNS} FROM approval_request WHERE 1 = 1");
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.approval_type.is_some() {
            sql.push_str(" AND approval_type = ?");
        }
        if filter.requested_by.is_some() {
            sql.push_str(" AND requested_by = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(approval_type) = filter.approval_type {
            query = query.bind(approval_type.as_str());
        }
        if let Some(requested_by) = &filter.requested_by {
            query = query.bind(requested_by.clone());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_request).collect()
    }

    async fn count_with_status(&self, status: ApprovalStatus) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM approval_request WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use motodesk_core::domain::approval::{ApprovalStatus, ApprovalType, RequestId};
    use motodesk_core::domain::change::ProposedChange;
    use motodesk_core::intake::{NewApprovalRequest, RequestIntake};

    use super::{fetch_request, mark_admin_approved, mark_sales_approved, SqlApprovalStore};
    use crate::repositories::{ApprovalFilter, ApprovalStore};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_request(requested_by: &str) -> motodesk_core::domain::approval::ApprovalRequest {
        RequestIntake::create(
            NewApprovalRequest {
                proposed: ProposedChange::MotorcyclePriceChange {
                    selling_price: Decimal::new(13_999_00, 2),
                },
                entity_id: Some("moto-1".to_string()),
                requested_by: requested_by.to_string(),
                priority: Default::default(),
                description: "markdown".to_string(),
                notes: None,
                original_data: None,
            },
            Utc::now(),
        )
        .expect("build request")
    }

    #[tokio::test]
    async fn insert_and_find_round_trips_the_proposal() {
        let pool = setup().await;
        let store = SqlApprovalStore::new(pool);
        let request = sample_request("rep-julia");

        store.insert(request.clone()).await.expect("insert");
        let found = store.find_by_id(&request.id).await.expect("find").expect("exists");

        assert_eq!(found.id, request.id);
        assert_eq!(found.approval_type, ApprovalType::MotorcyclePriceChange);
        assert_eq!(found.proposed, request.proposed);
        assert_eq!(found.status, ApprovalStatus::PendingSales);
        assert_eq!(found.execution_attempts, 0);
    }

    #[tokio::test]
    async fn list_filters_by_status_and_requester() {
        let pool = setup().await;
        let store = SqlApprovalStore::new(pool.clone());

        let first = sample_request("rep-julia");
        let second = sample_request("rep-marco");
        store.insert(first.clone()).await.expect("insert first");
        store.insert(second.clone()).await.expect("insert second");

        let mut conn = pool.acquire().await.expect("acquire");
        assert!(mark_sales_approved(&mut conn, &second.id, "reviewer-1", None, Utc::now())
            .await
            .expect("sales approve"));
        drop(conn);

        let pending_sales = store
            .list(ApprovalFilter {
                status: Some(ApprovalStatus::PendingSales),
                ..Default::default()
            })
            .await
            .expect("list pending sales");
        assert_eq!(pending_sales.len(), 1);
        assert_eq!(pending_sales[0].id, first.id);

        let by_requester = store
            .list(ApprovalFilter {
                requested_by: Some("rep-marco".to_string()),
                ..Default::default()
            })
            .await
            .expect("list by requester");
        assert_eq!(by_requester.len(), 1);
        assert_eq!(by_requester[0].id, second.id);

        assert_eq!(
            store.count_with_status(ApprovalStatus::PendingAdmin).await.expect("count"),
            1
        );
    }

    #[tokio::test]
    async fn conditional_updates_fire_at_most_once() {
        let pool = setup().await;
        let store = SqlApprovalStore::new(pool.clone());
        let request = sample_request("rep-julia");
        store.insert(request.clone()).await.expect("insert");

        let mut conn = pool.acquire().await.expect("acquire");

        assert!(mark_sales_approved(&mut conn, &request.id, "reviewer-1", None, Utc::now())
            .await
            .expect("first sales approve"));
        assert!(!mark_sales_approved(&mut conn, &request.id, "reviewer-2", None, Utc::now())
            .await
            .expect("second sales approve"));

        assert!(mark_admin_approved(&mut conn, &request.id, "boss", Some("ok"), Utc::now())
            .await
            .expect("first admin approve"));
        assert!(!mark_admin_approved(&mut conn, &request.id, "boss", None, Utc::now())
            .await
            .expect("second admin approve"));

        let stored =
            fetch_request(&mut conn, &request.id).await.expect("fetch").expect("exists");
        assert_eq!(stored.status, ApprovalStatus::Approved);
        assert_eq!(stored.sales_approved_by.as_deref(), Some("reviewer-1"));
        assert_eq!(stored.admin_approved_by.as_deref(), Some("boss"));
        assert_eq!(stored.execution_attempts, 1);
    }

    #[tokio::test]
    async fn missing_request_is_none() {
        let pool = setup().await;
        let store = SqlApprovalStore::new(pool);

        let found =
            store.find_by_id(&RequestId("apr-missing".to_string())).await.expect("find");
        assert!(found.is_none());
    }
}
