pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod executor;
pub mod gate;
pub mod intake;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::approval::{
    Actor, ActorRole, ApprovalRequest, ApprovalStatus, ApprovalType, Priority, RequestId,
    TargetAggregate,
};
pub use domain::change::ProposedChange;
pub use domain::contract::{Contract, ContractId, ContractKind};
pub use domain::motorcycle::{Motorcycle, MotorcycleId, MotorcycleStatus};
pub use domain::repair::{Repair, RepairId, RepairStatus};
pub use errors::{ApprovalError, ExecutionFailure};
pub use executor::{AggregateWrite, ExecutionPlan};
pub use gate::{GateOutcome, ReviewAction};
pub use intake::{NewApprovalRequest, RequestIntake};
