//! Request intake: every proposal is fully validated here so nothing
//! malformed can stall later at the admin stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::approval::{ApprovalRequest, ApprovalStatus, Priority, RequestId};
use crate::domain::change::ProposedChange;
use crate::errors::ApprovalError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewApprovalRequest {
    pub proposed: ProposedChange,
    /// Target of update-style proposals; must be absent for create-style ones.
    pub entity_id: Option<String>,
    pub requested_by: String,
    #[serde(default)]
    pub priority: Priority,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Snapshot of the target aggregate as the requester saw it. When absent
    /// the engine captures one from the store at creation time.
    #[serde(default)]
    pub original_data: Option<serde_json::Value>,
}

pub struct RequestIntake;

impl RequestIntake {
    /// Validates and shapes a new request. The result always starts in
    /// `pending_sales`; persistence is the caller's job.
    pub fn create(
        new: NewApprovalRequest,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest, ApprovalError> {
        new.proposed.validate()?;

        if new.requested_by.trim().is_empty() {
            return Err(ApprovalError::Validation("requested_by is required".to_string()));
        }
        if new.description.trim().is_empty() {
            return Err(ApprovalError::Validation("description is required".to_string()));
        }

        let entity_id = match (&new.entity_id, new.proposed.requires_entity_id()) {
            (Some(id), true) if !id.trim().is_empty() => Some(id.clone()),
            (_, true) => {
                return Err(ApprovalError::Validation(format!(
                    "{} requires an entity_id",
                    new.proposed.approval_type().as_str()
                )));
            }
            (Some(_), false) => {
                return Err(ApprovalError::Validation(format!(
                    "{} creates a new entity and must not carry an entity_id",
                    new.proposed.approval_type().as_str()
                )));
            }
            (None, false) => None,
        };

        Ok(ApprovalRequest {
            id: RequestId(format!("apr-{}", Uuid::new_v4())),
            approval_type: new.proposed.approval_type(),
            entity_id,
            proposed: new.proposed,
            original_data: new.original_data,
            status: ApprovalStatus::PendingSales,
            requested_by: new.requested_by,
            priority: new.priority,
            description: new.description,
            notes: new.notes,
            sales_approved_by: None,
            sales_approved_at: None,
            sales_comments: None,
            admin_approved_by: None,
            admin_approved_at: None,
            admin_comments: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            last_error: None,
            execution_attempts: 0,
            created_at: now,
            updated_at: now,
        })
    }
}
