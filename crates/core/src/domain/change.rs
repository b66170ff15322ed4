use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalType;
use crate::domain::contract::{ContractPatch, NewContract};
use crate::domain::motorcycle::MotorcyclePatch;
use crate::domain::repair::{NewRepair, RepairPatch};
use crate::errors::ApprovalError;

/// Typed proposal payload, one variant per approval type. Each variant
/// carries exactly what its executor branch needs; the serialized form is
/// retained only for audit storage and display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposedChange {
    SalesContract { contract: NewContract },
    PurchaseContract { contract: NewContract },
    MotorcyclePriceChange { selling_price: Decimal },
    MotorcycleEdit { patch: MotorcyclePatch },
    ContractEdit { patch: ContractPatch },
    ContractDelete,
    RepairCreate { repair: NewRepair },
    RepairEdit { patch: RepairPatch },
    RepairComplete,
}

impl ProposedChange {
    pub fn approval_type(&self) -> ApprovalType {
        match self {
            Self::SalesContract { .. } => ApprovalType::SalesContract,
            Self::PurchaseContract { .. } => ApprovalType::PurchaseContract,
            Self::MotorcyclePriceChange { .. } => ApprovalType::MotorcyclePriceChange,
            Self::MotorcycleEdit { .. } => ApprovalType::MotorcycleEdit,
            Self::ContractEdit { .. } => ApprovalType::ContractEdit,
            Self::ContractDelete => ApprovalType::ContractDelete,
            Self::RepairCreate { .. } => ApprovalType::RepairCreate,
            Self::RepairEdit { .. } => ApprovalType::RepairEdit,
            Self::RepairComplete => ApprovalType::RepairComplete,
        }
    }

    pub fn requires_entity_id(&self) -> bool {
        self.approval_type().requires_entity_id()
    }

    /// Required-field validation, run at intake so a malformed proposal
    /// fails fast instead of stalling at final approval.
    pub fn validate(&self) -> Result<(), ApprovalError> {
        match self {
            Self::SalesContract { contract } | Self::PurchaseContract { contract } => {
                validate_new_contract(contract)
            }
            Self::MotorcyclePriceChange { selling_price } => {
                if *selling_price <= Decimal::ZERO {
                    return Err(ApprovalError::Validation(
                        "selling_price must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
            Self::MotorcycleEdit { patch } => {
                if patch.is_empty() {
                    return Err(ApprovalError::Validation(
                        "motorcycle_edit requires at least one changed field".to_string(),
                    ));
                }
                if matches!(patch.selling_price, Some(price) if price <= Decimal::ZERO) {
                    return Err(ApprovalError::Validation(
                        "selling_price must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
            Self::ContractEdit { patch } => {
                if patch.is_empty() {
                    return Err(ApprovalError::Validation(
                        "contract_edit requires at least one changed field".to_string(),
                    ));
                }
                if matches!(patch.amount, Some(amount) if amount <= Decimal::ZERO) {
                    return Err(ApprovalError::Validation(
                        "amount must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
            Self::ContractDelete | Self::RepairComplete => Ok(()),
            Self::RepairCreate { repair } => validate_new_repair(repair),
            Self::RepairEdit { patch } => {
                if patch.is_empty() {
                    return Err(ApprovalError::Validation(
                        "repair_edit requires at least one changed field".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn validate_new_contract(contract: &NewContract) -> Result<(), ApprovalError> {
    if contract.motorcycle_id.0.trim().is_empty() {
        return Err(ApprovalError::Validation(
            "contract must reference a motorcycle".to_string(),
        ));
    }
    if contract.party.trim().is_empty() {
        return Err(ApprovalError::Validation("contract party is required".to_string()));
    }
    if contract.amount <= Decimal::ZERO {
        return Err(ApprovalError::Validation(
            "contract amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_new_repair(repair: &NewRepair) -> Result<(), ApprovalError> {
    if repair.motorcycle_id.0.trim().is_empty() {
        return Err(ApprovalError::Validation(
            "repair must reference a motorcycle".to_string(),
        ));
    }
    if repair.description.trim().is_empty() {
        return Err(ApprovalError::Validation("repair description is required".to_string()));
    }
    if repair.cost < Decimal::ZERO {
        return Err(ApprovalError::Validation("repair cost cannot be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::approval::ApprovalType;
    use crate::domain::contract::NewContract;
    use crate::domain::motorcycle::{MotorcycleId, MotorcyclePatch};
    use crate::domain::repair::RepairPatch;
    use crate::errors::ApprovalError;

    use super::ProposedChange;

    #[test]
    fn change_knows_its_approval_type() {
        let change = ProposedChange::MotorcyclePriceChange {
            selling_price: Decimal::new(2_500_000, 2),
        };
        assert_eq!(change.approval_type(), ApprovalType::MotorcyclePriceChange);
        assert!(change.requires_entity_id());

        assert_eq!(ProposedChange::ContractDelete.approval_type(), ApprovalType::ContractDelete);
    }

    #[test]
    fn contract_without_party_is_rejected() {
        let change = ProposedChange::SalesContract {
            contract: NewContract {
                motorcycle_id: MotorcycleId("moto-1".to_string()),
                party: "  ".to_string(),
                amount: Decimal::new(1_800_000, 2),
                signed_on: None,
                notes: None,
            },
        };

        assert!(matches!(change.validate(), Err(ApprovalError::Validation(_))));
    }

    #[test]
    fn zero_amount_contract_is_rejected() {
        let change = ProposedChange::PurchaseContract {
            contract: NewContract {
                motorcycle_id: MotorcycleId("moto-1".to_string()),
                party: "supplier-9".to_string(),
                amount: Decimal::ZERO,
                signed_on: None,
                notes: None,
            },
        };

        assert!(matches!(change.validate(), Err(ApprovalError::Validation(_))));
    }

    #[test]
    fn empty_patches_are_rejected() {
        let motorcycle = ProposedChange::MotorcycleEdit { patch: MotorcyclePatch::default() };
        assert!(matches!(motorcycle.validate(), Err(ApprovalError::Validation(_))));

        let repair = ProposedChange::RepairEdit { patch: RepairPatch::default() };
        assert!(matches!(repair.validate(), Err(ApprovalError::Validation(_))));
    }

    #[test]
    fn valid_price_change_passes_validation() {
        let change = ProposedChange::MotorcyclePriceChange {
            selling_price: Decimal::new(2_500_000, 2),
        };
        assert!(change.validate().is_ok());
    }
}
