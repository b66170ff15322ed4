//! Two-stage review gate: sales review first, admin final approval second.
//! The gate is a pure function over (status, action, actor); persistence and
//! execution happen elsewhere.

use serde::{Deserialize, Serialize};

use crate::domain::approval::{ActorRole, Actor, ApprovalStatus};
use crate::errors::ApprovalError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    SalesApprove,
    AdminApprove,
    Reject,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalesApprove => "sales_approve",
            Self::AdminApprove => "admin_approve",
            Self::Reject => "reject",
        }
    }
}

/// Where the gate sends a request, and whether the transition carries the
/// obligation to execute the proposed change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateOutcome {
    pub from: ApprovalStatus,
    pub to: ApprovalStatus,
    pub triggers_execution: bool,
}

/// Full gate check. Authorization is decided before transition legality so
/// an under-privileged caller learns nothing about the request's state.
pub fn evaluate(
    status: ApprovalStatus,
    action: ReviewAction,
    actor: &Actor,
) -> Result<GateOutcome, ApprovalError> {
    authorize(status, action, actor)?;
    check_transition(status, action)
}

pub fn authorize(
    status: ApprovalStatus,
    action: ReviewAction,
    actor: &Actor,
) -> Result<(), ApprovalError> {
    let allowed = match action {
        // Admins may stand in for sales reviewers.
        ReviewAction::SalesApprove => true,
        ReviewAction::AdminApprove => actor.role == ActorRole::Admin,
        // Once a request reaches the admin stage only an admin may kill it.
        ReviewAction::Reject => {
            actor.role == ActorRole::Admin || status != ApprovalStatus::PendingAdmin
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(ApprovalError::Authorization(format!(
            "{} role cannot perform {}",
            actor.role.as_str(),
            action.as_str()
        )))
    }
}

pub fn check_transition(
    status: ApprovalStatus,
    action: ReviewAction,
) -> Result<GateOutcome, ApprovalError> {
    let outcome = match (status, action) {
        (ApprovalStatus::PendingSales, ReviewAction::SalesApprove) => GateOutcome {
            from: status,
            to: ApprovalStatus::PendingAdmin,
            triggers_execution: false,
        },
        (ApprovalStatus::PendingAdmin, ReviewAction::AdminApprove) => GateOutcome {
            from: status,
            to: ApprovalStatus::Approved,
            triggers_execution: true,
        },
        (ApprovalStatus::PendingSales | ApprovalStatus::PendingAdmin, ReviewAction::Reject) => {
            GateOutcome { from: status, to: ApprovalStatus::Rejected, triggers_execution: false }
        }
        (from, action) => return Err(ApprovalError::IllegalTransition { from, action }),
    };

    Ok(outcome)
}

/// Rejections must carry a substantive reason.
pub fn validate_reason(reason: &str) -> Result<(), ApprovalError> {
    if reason.trim().is_empty() {
        return Err(ApprovalError::Validation("rejection reason is required".to_string()));
    }
    Ok(())
}
