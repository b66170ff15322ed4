//! Change execution planning. Each approval type maps to a fixed list of
//! aggregate writes; the plan is pure data so the persistence layer can apply
//! it inside a single transaction.

use crate::domain::change::ProposedChange;
use crate::domain::contract::{ContractId, ContractKind, ContractPatch, NewContract};
use crate::domain::motorcycle::{MotorcycleId, MotorcyclePatch, MotorcycleStatus};
use crate::domain::repair::{NewRepair, RepairId, RepairPatch};
use crate::errors::ExecutionFailure;

/// One write against an external aggregate store. Applying a write can still
/// fail at the store (row gone, constraint broken); the whole plan rolls back
/// in that case.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregateWrite {
    InsertContract { kind: ContractKind, contract: NewContract },
    UpdateContract { id: ContractId, patch: ContractPatch },
    DeleteContract { id: ContractId },
    UpdateMotorcycle { id: MotorcycleId, patch: MotorcyclePatch },
    SetMotorcycleStatus { id: MotorcycleId, status: MotorcycleStatus },
    InsertRepair { repair: NewRepair },
    /// Patch plus the details-approved flip: details_registered=true and
    /// status=details_approved. Completion stays untouched.
    ApproveRepairDetails { id: RepairId, patch: RepairPatch },
    /// status=completed with completion stamped at apply time.
    CompleteRepair { id: RepairId },
    /// Resolves the repair's motorcycle at apply time; the link is not known
    /// when the plan is built.
    SetLinkedMotorcycleStatus { repair_id: RepairId, status: MotorcycleStatus },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionPlan {
    pub writes: Vec<AggregateWrite>,
}

impl ExecutionPlan {
    /// Builds the write list for a change. Exhaustive over the proposal sum
    /// type, so a new approval type cannot reach execution unplanned.
    pub fn for_change(
        change: &ProposedChange,
        entity_id: Option<&str>,
    ) -> Result<Self, ExecutionFailure> {
        let writes = match change {
            ProposedChange::SalesContract { contract } => vec![
                AggregateWrite::InsertContract {
                    kind: ContractKind::Sales,
                    contract: contract.clone(),
                },
                AggregateWrite::SetMotorcycleStatus {
                    id: contract.motorcycle_id.clone(),
                    status: MotorcycleStatus::Sold,
                },
            ],
            ProposedChange::PurchaseContract { contract } => vec![
                AggregateWrite::InsertContract {
                    kind: ContractKind::Purchase,
                    contract: contract.clone(),
                },
                AggregateWrite::SetMotorcycleStatus {
                    id: contract.motorcycle_id.clone(),
                    status: MotorcycleStatus::InStock,
                },
            ],
            ProposedChange::MotorcyclePriceChange { selling_price } => {
                let id = required_entity_id(change, entity_id)?;
                vec![AggregateWrite::UpdateMotorcycle {
                    id: MotorcycleId(id),
                    patch: MotorcyclePatch::price_only(*selling_price),
                }]
            }
            ProposedChange::MotorcycleEdit { patch } => {
                let id = required_entity_id(change, entity_id)?;
                vec![AggregateWrite::UpdateMotorcycle {
                    id: MotorcycleId(id),
                    patch: patch.clone(),
                }]
            }
            ProposedChange::ContractEdit { patch } => {
                let id = required_entity_id(change, entity_id)?;
                vec![AggregateWrite::UpdateContract { id: ContractId(id), patch: patch.clone() }]
            }
            ProposedChange::ContractDelete => {
                let id = required_entity_id(change, entity_id)?;
                vec![AggregateWrite::DeleteContract { id: ContractId(id) }]
            }
            ProposedChange::RepairCreate { repair } => vec![
                AggregateWrite::InsertRepair { repair: repair.clone() },
                AggregateWrite::SetMotorcycleStatus {
                    id: repair.motorcycle_id.clone(),
                    status: MotorcycleStatus::InRepair,
                },
            ],
            ProposedChange::RepairEdit { patch } => {
                let id = required_entity_id(change, entity_id)?;
                vec![AggregateWrite::ApproveRepairDetails {
                    id: RepairId(id),
                    patch: patch.clone(),
                }]
            }
            ProposedChange::RepairComplete => {
                let id = required_entity_id(change, entity_id)?;
                vec![
                    AggregateWrite::CompleteRepair { id: RepairId(id.clone()) },
                    AggregateWrite::SetLinkedMotorcycleStatus {
                        repair_id: RepairId(id),
                        status: MotorcycleStatus::InStock,
                    },
                ]
            }
        };

        Ok(Self { writes })
    }
}

fn required_entity_id(
    change: &ProposedChange,
    entity_id: Option<&str>,
) -> Result<String, ExecutionFailure> {
    entity_id.map(str::to_owned).ok_or_else(|| {
        ExecutionFailure::Precondition(format!(
            "{} requires an entity id",
            change.approval_type().as_str()
        ))
    })
}
