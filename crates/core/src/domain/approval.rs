use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::change::ProposedChange;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Closed set of change proposals the workflow can carry. Adding a variant
/// forces the executor's dispatch match to be extended at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    SalesContract,
    PurchaseContract,
    MotorcyclePriceChange,
    MotorcycleEdit,
    ContractEdit,
    ContractDelete,
    RepairCreate,
    RepairEdit,
    RepairComplete,
}

/// Aggregate kind an approval ultimately mutates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAggregate {
    Motorcycle,
    Contract,
    Repair,
}

impl TargetAggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Motorcycle => "motorcycle",
            Self::Contract => "contract",
            Self::Repair => "repair",
        }
    }
}

impl std::fmt::Display for TargetAggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ApprovalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalesContract => "sales_contract",
            Self::PurchaseContract => "purchase_contract",
            Self::MotorcyclePriceChange => "motorcycle_price_change",
            Self::MotorcycleEdit => "motorcycle_edit",
            Self::ContractEdit => "contract_edit",
            Self::ContractDelete => "contract_delete",
            Self::RepairCreate => "repair_create",
            Self::RepairEdit => "repair_edit",
            Self::RepairComplete => "repair_complete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sales_contract" => Some(Self::SalesContract),
            "purchase_contract" => Some(Self::PurchaseContract),
            "motorcycle_price_change" => Some(Self::MotorcyclePriceChange),
            "motorcycle_edit" => Some(Self::MotorcycleEdit),
            "contract_edit" => Some(Self::ContractEdit),
            "contract_delete" => Some(Self::ContractDelete),
            "repair_create" => Some(Self::RepairCreate),
            "repair_edit" => Some(Self::RepairEdit),
            "repair_complete" => Some(Self::RepairComplete),
            _ => None,
        }
    }

    pub fn target(&self) -> TargetAggregate {
        match self {
            Self::SalesContract | Self::PurchaseContract | Self::ContractEdit
            | Self::ContractDelete => TargetAggregate::Contract,
            Self::MotorcyclePriceChange | Self::MotorcycleEdit => TargetAggregate::Motorcycle,
            Self::RepairCreate | Self::RepairEdit | Self::RepairComplete => TargetAggregate::Repair,
        }
    }

    /// Create-style proposals target an entity that does not exist yet.
    pub fn requires_entity_id(&self) -> bool {
        !matches!(self, Self::SalesContract | Self::PurchaseContract | Self::RepairCreate)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    PendingSales,
    PendingAdmin,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingSales => "pending_sales",
            Self::PendingAdmin => "pending_admin",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending_sales" => Some(Self::PendingSales),
            "pending_admin" => Some(Self::PendingAdmin),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Sales,
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sales" => Some(Self::Sales),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Opaque identity plus role claim; transport and session handling are the
/// caller's concern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn sales(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: ActorRole::Sales }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: ActorRole::Admin }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: RequestId,
    pub approval_type: ApprovalType,
    pub entity_id: Option<String>,
    pub proposed: ProposedChange,
    /// Snapshot of the target aggregate taken at creation; write-once.
    pub original_data: Option<serde_json::Value>,
    pub status: ApprovalStatus,
    pub requested_by: String,
    pub priority: Priority,
    pub description: String,
    pub notes: Option<String>,
    pub sales_approved_by: Option<String>,
    pub sales_approved_at: Option<DateTime<Utc>>,
    pub sales_comments: Option<String>,
    pub admin_approved_by: Option<String>,
    pub admin_approved_at: Option<DateTime<Utc>>,
    pub admin_comments: Option<String>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub last_error: Option<String>,
    pub execution_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn entity_type(&self) -> TargetAggregate {
        self.approval_type.target()
    }
}

#[cfg(test)]
mod tests {
    use super::{ApprovalStatus, ApprovalType, TargetAggregate};

    #[test]
    fn approval_type_round_trips_from_storage_encoding() {
        let cases = [
            ApprovalType::SalesContract,
            ApprovalType::PurchaseContract,
            ApprovalType::MotorcyclePriceChange,
            ApprovalType::MotorcycleEdit,
            ApprovalType::ContractEdit,
            ApprovalType::ContractDelete,
            ApprovalType::RepairCreate,
            ApprovalType::RepairEdit,
            ApprovalType::RepairComplete,
        ];

        for approval_type in cases {
            assert_eq!(ApprovalType::parse(approval_type.as_str()), Some(approval_type));
        }
    }

    #[test]
    fn create_types_do_not_require_entity_id() {
        assert!(!ApprovalType::SalesContract.requires_entity_id());
        assert!(!ApprovalType::PurchaseContract.requires_entity_id());
        assert!(!ApprovalType::RepairCreate.requires_entity_id());
        assert!(ApprovalType::MotorcyclePriceChange.requires_entity_id());
        assert!(ApprovalType::ContractDelete.requires_entity_id());
        assert!(ApprovalType::RepairComplete.requires_entity_id());
    }

    #[test]
    fn target_aggregate_follows_approval_type() {
        assert_eq!(ApprovalType::SalesContract.target(), TargetAggregate::Contract);
        assert_eq!(ApprovalType::MotorcycleEdit.target(), TargetAggregate::Motorcycle);
        assert_eq!(ApprovalType::RepairComplete.target(), TargetAggregate::Repair);
    }

    #[test]
    fn only_approved_and_rejected_are_terminal() {
        assert!(!ApprovalStatus::PendingSales.is_terminal());
        assert!(!ApprovalStatus::PendingAdmin.is_terminal());
        assert!(ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Rejected.is_terminal());
    }
}
