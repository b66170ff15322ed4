//! Approval workflow engine: intake, two-stage review, and exactly-once
//! execution of approved changes. Every transition is a conditional update on
//! the request's status, and admin approval wraps the status write and all
//! aggregate writes in one transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::{info, warn};

use motodesk_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink};
use motodesk_core::domain::approval::{
    Actor, ActorRole, ApprovalRequest, ApprovalStatus, RequestId, TargetAggregate,
};
use motodesk_core::errors::{ApprovalError, ExecutionFailure};
use motodesk_core::executor::{AggregateWrite, ExecutionPlan};
use motodesk_core::gate::{self, ReviewAction};
use motodesk_core::intake::{NewApprovalRequest, RequestIntake};

use crate::repositories::approval::{
    fetch_request, insert_request, mark_admin_approved, mark_rejected, mark_sales_approved,
    record_execution_failure,
};
use crate::repositories::contract::{
    apply_contract_patch, delete_contract, fetch_contract, insert_contract, new_contract_id,
};
use crate::repositories::motorcycle::{
    apply_motorcycle_patch, fetch_motorcycle, set_motorcycle_status,
};
use crate::repositories::repair::{
    approve_repair_details, complete_repair, fetch_repair, insert_repair, new_repair_id,
};
use crate::repositories::{ApprovalFilter, RepositoryError};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Failure while applying a plan inside the admin-approve transaction.
/// Repository errors propagate; execution failures are recorded on the
/// request after rollback.
enum ApplyError {
    Repository(RepositoryError),
    Execution(ExecutionFailure),
}

impl From<RepositoryError> for ApplyError {
    fn from(error: RepositoryError) -> Self {
        Self::Repository(error)
    }
}

impl From<ExecutionFailure> for ApplyError {
    fn from(failure: ExecutionFailure) -> Self {
        Self::Execution(failure)
    }
}

#[derive(Clone)]
pub struct ApprovalEngine {
    pool: DbPool,
    audit: Arc<dyn AuditSink>,
}

impl ApprovalEngine {
    pub fn new(pool: DbPool) -> Self {
        Self::with_audit_sink(pool, Arc::new(TracingAuditSink))
    }

    pub fn with_audit_sink(pool: DbPool, audit: Arc<dyn AuditSink>) -> Self {
        Self { pool, audit }
    }

    /// Validates and persists a new request in `pending_sales`. When the
    /// caller supplies no aggregate snapshot, one is captured here so later
    /// execution can detect concurrent edits.
    pub async fn create(&self, new: NewApprovalRequest) -> Result<ApprovalRequest, EngineError> {
        let mut request = RequestIntake::create(new, Utc::now())?;

        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        if request.original_data.is_none() {
            if let Some(entity_id) = request.entity_id.clone() {
                let snapshot =
                    aggregate_snapshot(&mut conn, request.entity_type(), &entity_id).await?;
                match snapshot {
                    Some(value) => request.original_data = Some(value),
                    None => {
                        return Err(ApprovalError::Validation(format!(
                            "{} {} does not exist",
                            request.entity_type(),
                            entity_id
                        ))
                        .into());
                    }
                }
            }
        }

        insert_request(&mut conn, &request).await?;
        drop(conn);

        info!(request_id = %request.id.0, approval_type = request.approval_type.as_str(), "approval request created");
        self.audit.emit(
            AuditEvent::new(
                Some(request.id.clone()),
                "intake.request_created",
                AuditCategory::Intake,
                &request.requested_by,
                AuditOutcome::Success,
            )
            .with_metadata("approval_type", request.approval_type.as_str()),
        );

        Ok(request)
    }

    pub async fn get(&self, id: &RequestId) -> Result<Option<ApprovalRequest>, EngineError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_request(&mut conn, id).await?)
    }

    pub async fn list(
        &self,
        filter: ApprovalFilter,
    ) -> Result<Vec<ApprovalRequest>, EngineError> {
        use crate::repositories::{ApprovalStore, SqlApprovalStore};
        let store = SqlApprovalStore::new(self.pool.clone());
        Ok(store.list(filter).await?)
    }

    /// The "my requests" view: everything filed by one requester.
    pub async fn my_requests(
        &self,
        requested_by: &str,
    ) -> Result<Vec<ApprovalRequest>, EngineError> {
        self.list(ApprovalFilter {
            requested_by: Some(requested_by.to_string()),
            ..Default::default()
        })
        .await
    }

    /// Pending count for a role's work queue: sales reviewers see the first
    /// stage, admins the second.
    pub async fn count_pending(&self, role: ActorRole) -> Result<i64, EngineError> {
        use crate::repositories::{ApprovalStore, SqlApprovalStore};
        let status = match role {
            ActorRole::Sales => ApprovalStatus::PendingSales,
            ActorRole::Admin => ApprovalStatus::PendingAdmin,
        };
        let store = SqlApprovalStore::new(self.pool.clone());
        Ok(store.count_with_status(status).await?)
    }

    pub async fn sales_approve(
        &self,
        id: &RequestId,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<ApprovalRequest, EngineError> {
        let request = self.require_request(id).await?;
        gate::evaluate(request.status, ReviewAction::SalesApprove, actor)?;

        let now = Utc::now();
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let advanced =
            mark_sales_approved(&mut conn, id, &actor.id, comments.as_deref(), now).await?;
        if !advanced {
            // A racing call won; report the transition as seen now.
            let current = fetch_request(&mut conn, id)
                .await?
                .ok_or_else(|| ApprovalError::RequestNotFound(id.0.clone()))?;
            return Err(ApprovalError::IllegalTransition {
                from: current.status,
                action: ReviewAction::SalesApprove,
            }
            .into());
        }

        let updated = fetch_request(&mut conn, id)
            .await?
            .ok_or_else(|| ApprovalError::RequestNotFound(id.0.clone()))?;
        drop(conn);

        self.audit.emit(
            AuditEvent::new(
                Some(id.clone()),
                "review.sales_approved",
                AuditCategory::Review,
                &actor.id,
                AuditOutcome::Success,
            )
            .with_metadata("from", ApprovalStatus::PendingSales.as_str())
            .with_metadata("to", ApprovalStatus::PendingAdmin.as_str()),
        );

        Ok(updated)
    }

    pub async fn reject(
        &self,
        id: &RequestId,
        actor: &Actor,
        reason: &str,
    ) -> Result<ApprovalRequest, EngineError> {
        gate::validate_reason(reason)?;
        let request = self.require_request(id).await?;
        let outcome = gate::evaluate(request.status, ReviewAction::Reject, actor)?;

        let now = Utc::now();
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let rejected = mark_rejected(&mut conn, id, outcome.from, &actor.id, reason, now).await?;
        if !rejected {
            let current = fetch_request(&mut conn, id)
                .await?
                .ok_or_else(|| ApprovalError::RequestNotFound(id.0.clone()))?;
            return Err(ApprovalError::IllegalTransition {
                from: current.status,
                action: ReviewAction::Reject,
            }
            .into());
        }

        let updated = fetch_request(&mut conn, id)
            .await?
            .ok_or_else(|| ApprovalError::RequestNotFound(id.0.clone()))?;
        drop(conn);

        self.audit.emit(
            AuditEvent::new(
                Some(id.clone()),
                "review.rejected",
                AuditCategory::Review,
                &actor.id,
                AuditOutcome::Rejected,
            )
            .with_metadata("from", outcome.from.as_str())
            .with_metadata("reason", reason),
        );

        Ok(updated)
    }

    /// Final approval. The status flip to `approved` and every aggregate
    /// write of the proposed change commit in one transaction, so racing
    /// callers get exactly one execution and a failed execution leaves the
    /// request in `pending_admin` with the error attached.
    pub async fn admin_approve(
        &self,
        id: &RequestId,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<ApprovalRequest, EngineError> {
        let request = self.require_request(id).await?;
        gate::evaluate(request.status, ReviewAction::AdminApprove, actor)?;

        let plan = match ExecutionPlan::for_change(&request.proposed, request.entity_id.as_deref())
        {
            Ok(plan) => plan,
            Err(failure) => {
                return self.fail_execution(id, failure).await;
            }
        };

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let approved =
            mark_admin_approved(&mut tx, id, &actor.id, comments.as_deref(), now).await?;
        if !approved {
            drop(tx);
            let current = self.require_request(id).await?;
            return Err(ApprovalError::IllegalTransition {
                from: current.status,
                action: ReviewAction::AdminApprove,
            }
            .into());
        }

        if let Err(error) = verify_not_stale(&mut tx, &request).await {
            return self.unwind_execution(tx, id, error).await;
        }
        for write in &plan.writes {
            if let Err(error) = apply_write(&mut tx, write, now).await {
                return self.unwind_execution(tx, id, error).await;
            }
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        let updated = self.require_request(id).await?;
        info!(request_id = %id.0, approval_type = request.approval_type.as_str(), "approved change executed");
        self.audit.emit(
            AuditEvent::new(
                Some(id.clone()),
                "execution.change_applied",
                AuditCategory::Execution,
                &actor.id,
                AuditOutcome::Success,
            )
            .with_metadata("approval_type", request.approval_type.as_str())
            .with_metadata("writes", plan.writes.len().to_string()),
        );

        Ok(updated)
    }

    async fn require_request(&self, id: &RequestId) -> Result<ApprovalRequest, EngineError> {
        self.get(id)
            .await?
            .ok_or_else(|| EngineError::from(ApprovalError::RequestNotFound(id.0.clone())))
    }

    /// Rolls back the transaction and converts the apply failure. Execution
    /// failures are recorded on the request for operator retry.
    async fn unwind_execution(
        &self,
        tx: sqlx::Transaction<'_, sqlx::Sqlite>,
        id: &RequestId,
        error: ApplyError,
    ) -> Result<ApprovalRequest, EngineError> {
        tx.rollback().await.map_err(RepositoryError::from)?;
        match error {
            ApplyError::Repository(error) => Err(error.into()),
            ApplyError::Execution(failure) => self.fail_execution(id, failure).await,
        }
    }

    async fn fail_execution(
        &self,
        id: &RequestId,
        failure: ExecutionFailure,
    ) -> Result<ApprovalRequest, EngineError> {
        warn!(request_id = %id.0, error = %failure, "change execution failed");
        record_execution_failure(&self.pool, id, &failure.to_string(), Utc::now()).await?;
        self.audit.emit(
            AuditEvent::new(
                Some(id.clone()),
                "execution.failed",
                AuditCategory::Execution,
                "engine",
                AuditOutcome::Failed,
            )
            .with_metadata("error", failure.to_string()),
        );
        Err(ApprovalError::Execution(failure).into())
    }
}

/// Serializes the target aggregate for snapshot comparison. Decimal fields
/// serialize as strings, so equality is exact.
pub(crate) async fn aggregate_snapshot(
    conn: &mut SqliteConnection,
    target: TargetAggregate,
    entity_id: &str,
) -> Result<Option<serde_json::Value>, RepositoryError> {
    use motodesk_core::domain::contract::ContractId;
    use motodesk_core::domain::motorcycle::MotorcycleId;
    use motodesk_core::domain::repair::RepairId;

    let encode = |value: Result<serde_json::Value, serde_json::Error>| {
        value.map_err(|e| RepositoryError::Decode(format!("encode snapshot: {e}")))
    };

    match target {
        TargetAggregate::Motorcycle => {
            match fetch_motorcycle(conn, &MotorcycleId(entity_id.to_string())).await? {
                Some(motorcycle) => Ok(Some(encode(serde_json::to_value(&motorcycle))?)),
                None => Ok(None),
            }
        }
        TargetAggregate::Contract => {
            match fetch_contract(conn, &ContractId(entity_id.to_string())).await? {
                Some(contract) => Ok(Some(encode(serde_json::to_value(&contract))?)),
                None => Ok(None),
            }
        }
        TargetAggregate::Repair => {
            match fetch_repair(conn, &RepairId(entity_id.to_string())).await? {
                Some(repair) => Ok(Some(encode(serde_json::to_value(&repair))?)),
                None => Ok(None),
            }
        }
    }
}

/// Stale-approval guard: if the target aggregate changed since the request
/// was filed, flag it instead of silently overwriting the concurrent edit.
async fn verify_not_stale(
    conn: &mut SqliteConnection,
    request: &ApprovalRequest,
) -> Result<(), ApplyError> {
    let (Some(original), Some(entity_id)) = (&request.original_data, &request.entity_id) else {
        return Ok(());
    };

    let current = aggregate_snapshot(conn, request.entity_type(), entity_id).await?;
    match current {
        Some(snapshot) if snapshot == *original => Ok(()),
        Some(_) => Err(ExecutionFailure::StaleAggregate {
            entity: request.entity_type(),
            entity_id: entity_id.clone(),
        }
        .into()),
        None => Err(ExecutionFailure::AggregateNotFound {
            entity: request.entity_type(),
            entity_id: entity_id.clone(),
        }
        .into()),
    }
}

async fn apply_write(
    conn: &mut SqliteConnection,
    write: &AggregateWrite,
    now: DateTime<Utc>,
) -> Result<(), ApplyError> {
    match write {
        AggregateWrite::InsertContract { kind, contract } => {
            if fetch_motorcycle(conn, &contract.motorcycle_id).await?.is_none() {
                return Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Motorcycle,
                    entity_id: contract.motorcycle_id.0.clone(),
                }
                .into());
            }
            insert_contract(conn, &new_contract_id(), *kind, contract, now).await?;
            Ok(())
        }
        AggregateWrite::UpdateContract { id, patch } => {
            match apply_contract_patch(conn, id, patch, now).await? {
                Some(_) => Ok(()),
                None => Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Contract,
                    entity_id: id.0.clone(),
                }
                .into()),
            }
        }
        AggregateWrite::DeleteContract { id } => {
            if delete_contract(conn, id).await? {
                Ok(())
            } else {
                Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Contract,
                    entity_id: id.0.clone(),
                }
                .into())
            }
        }
        AggregateWrite::UpdateMotorcycle { id, patch } => {
            match apply_motorcycle_patch(conn, id, patch, now).await? {
                Some(_) => Ok(()),
                None => Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Motorcycle,
                    entity_id: id.0.clone(),
                }
                .into()),
            }
        }
        AggregateWrite::SetMotorcycleStatus { id, status } => {
            if set_motorcycle_status(conn, id, *status, now).await? {
                Ok(())
            } else {
                Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Motorcycle,
                    entity_id: id.0.clone(),
                }
                .into())
            }
        }
        AggregateWrite::InsertRepair { repair } => {
            if fetch_motorcycle(conn, &repair.motorcycle_id).await?.is_none() {
                return Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Motorcycle,
                    entity_id: repair.motorcycle_id.0.clone(),
                }
                .into());
            }
            insert_repair(conn, &new_repair_id(), repair, now).await?;
            Ok(())
        }
        AggregateWrite::ApproveRepairDetails { id, patch } => {
            match approve_repair_details(conn, id, patch, now).await? {
                Some(_) => Ok(()),
                None => Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Repair,
                    entity_id: id.0.clone(),
                }
                .into()),
            }
        }
        AggregateWrite::CompleteRepair { id } => {
            match complete_repair(conn, id, now).await? {
                Some(_) => Ok(()),
                None => Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Repair,
                    entity_id: id.0.clone(),
                }
                .into()),
            }
        }
        AggregateWrite::SetLinkedMotorcycleStatus { repair_id, status } => {
            let Some(repair) = fetch_repair(conn, repair_id).await? else {
                return Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Repair,
                    entity_id: repair_id.0.clone(),
                }
                .into());
            };
            if set_motorcycle_status(conn, &repair.motorcycle_id, *status, now).await? {
                Ok(())
            } else {
                Err(ExecutionFailure::AggregateNotFound {
                    entity: TargetAggregate::Motorcycle,
                    entity_id: repair.motorcycle_id.0.clone(),
                }
                .into())
            }
        }
    }
}
