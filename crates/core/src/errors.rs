use thiserror::Error;

use crate::domain::approval::{ApprovalStatus, TargetAggregate};
use crate::gate::ReviewAction;

/// Domain-level failure while executing an approved change. These surface as
/// `ApprovalError::Execution` and leave the request in `pending_admin` so it
/// can be retried or rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExecutionFailure {
    #[error("{entity} {entity_id} no longer exists")]
    AggregateNotFound { entity: TargetAggregate, entity_id: String },
    #[error("{entity} {entity_id} changed after the request was filed")]
    StaleAggregate { entity: TargetAggregate, entity_id: String },
    #[error("execution precondition failed: {0}")]
    Precondition(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("cannot apply {action:?} to a request in {from:?}")]
    IllegalTransition { from: ApprovalStatus, action: ReviewAction },
    #[error("approval request {0} not found")]
    RequestNotFound(String),
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),
}

#[cfg(test)]
mod tests {
    use crate::domain::approval::TargetAggregate;

    use super::{ApprovalError, ExecutionFailure};

    #[test]
    fn execution_failure_wraps_into_approval_error() {
        let failure = ExecutionFailure::StaleAggregate {
            entity: TargetAggregate::Motorcycle,
            entity_id: "moto-1".to_string(),
        };
        let error = ApprovalError::from(failure.clone());
        assert_eq!(error, ApprovalError::Execution(failure));
    }

    #[test]
    fn messages_name_the_aggregate() {
        let failure = ExecutionFailure::AggregateNotFound {
            entity: TargetAggregate::Contract,
            entity_id: "con-7".to_string(),
        };
        assert_eq!(failure.to_string(), "contract con-7 no longer exists");
    }
}
